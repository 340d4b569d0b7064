//! Headless scoring of one patient record.
//!
//! Reads a `RawPatientInput` as JSON, runs the same encode, score and classify
//! pass as the terminal form, and prints the encoded vector and the result.
//! Artifacts and verification follow the same environment as `ckd-risk`.
//!
//! # Usage
//!
//! ```bash
//! score_patient <input.json> [--model <name>] [--json]
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ckd_risk::adapters::artifacts::load_artifacts;
use ckd_risk::adapters::sanitize::SanitizingMakeWriter;
use ckd_risk::application::AssessmentService;
use ckd_risk::config::AppConfig;
use ckd_risk::{CkdError, RawPatientInput, RiskAssessment};

const USAGE: &str = "Usage: score_patient <input.json> [--model <name>] [--json]";

struct Args {
    input: PathBuf,
    model: Option<String>,
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    schema: String,
    features: Vec<(&'static str, f64)>,
    assessment: &'a RiskAssessment,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut input: Option<PathBuf> = None;
    let mut model: Option<String> = None;
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => model = Some(args.next().ok_or_else(|| anyhow!(USAGE))?),
            "--json" => json = true,
            "-h" | "--help" => bail!(USAGE),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => bail!(USAGE),
        }
    }

    Ok(Args {
        input: input.ok_or_else(|| anyhow!(USAGE))?,
        model,
        json,
    })
}

fn main() -> Result<()> {
    // Results go to stdout; logs stay on stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(SanitizingMakeWriter::new(std::io::stderr)),
        )
        .init();

    let args = parse_args()?;
    let config = AppConfig::from_env();

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    let input: RawPatientInput = serde_json::from_str(&text).map_err(CkdError::from)?;
    input
        .validate()
        .map_err(|errors| CkdError::Validation(errors.join(", ")))?;

    let verification = config.verification()?;
    let artifacts = load_artifacts(&config.model_path, &verification)
        .with_context(|| format!("Failed to load model artifacts from {:?}", config.model_path))?;
    let service = AssessmentService::from_artifacts(artifacts)?;

    let model = args
        .model
        .unwrap_or_else(|| service.default_model().to_string());
    // Score the vector that gets printed.
    let features = service.encode(&input)?;
    let assessment = service.assess_encoded(&model, &features)?;

    if args.json {
        let report = Report {
            schema: features.schema().to_string(),
            features: features.named().collect(),
            assessment: &assessment,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Encoded features ({} schema):", features.schema());
    for (column, value) in features.named() {
        println!("  {column:<24} {value}");
    }
    println!();
    println!("{}", assessment.headline());
    println!("{}", assessment.risk_level.advice());
    println!("{}", assessment.model_line());
    Ok(())
}
