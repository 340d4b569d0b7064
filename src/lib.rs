//! # ckd-risk
//!
//! Chronic kidney disease risk screening from self-reported health data.
//!
//! A patient's answers are encoded into the feature vector a pre-trained
//! classifier expects, scored, and classified against a fixed threshold.
//! The result is an indicative estimate, not a diagnosis.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient input, feature schemas, assessments)
//! - `ports`: Trait definitions for scoring models and scalers
//! - `adapters`: Portable model artifacts, integrity checks, log sanitizing
//! - `application`: The assessment use case
//! - `config`: Environment configuration
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{RawPatientInput, RiskAssessment, RiskLevel};

/// Main error type for ckd-risk
#[derive(Debug, thiserror::Error)]
pub enum CkdError {
    #[error("Invalid patient data: {0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ports::ScoringError),

    #[error("Model artifacts unusable: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Assessment failed: {0}")]
    Assessment(#[from] application::AssessmentError),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
