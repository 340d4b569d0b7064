//! Artifact adapter: loads portable scoring artifacts from a directory.
//!
//! Layout of an artifact directory:
//!
//! ```text
//! models/
//!   catalog.json          schema + model files + optional scaler
//!   random_forest.json    one file per model
//!   scaler.json           standardisation parameters (if any model needs it)
//!   manifest.json         SHA-256 of every file above
//!   model.sig             Ed25519 signature over manifest.json
//! ```
//!
//! Every artifact states the feature columns it was fit with. Loading fails
//! unless they match the catalog's schema exactly, since a scorer fed columns
//! in the wrong order would still return a probability.

mod estimators;
pub mod integrity;
mod scaler;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::FeatureSchema;
use crate::ports::{FeatureScaler, RiskModel, ScoringError};

pub use estimators::{
    sigmoid, DecisionTree, Estimator, GradientBoosting, LogisticRegression, RandomForest, TreeNode,
};
pub use integrity::{ModelManifest, Verification};
pub use scaler::StandardScaler;

pub const CATALOG_FILE: &str = "catalog.json";
pub const FORMAT_VERSION: u32 = 1;

/// Errors raised while loading artifacts. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("{0} is not bound by the signed manifest")]
    Unbound(String),

    #[error("{0} does not match its manifest digest")]
    Digest(String),

    #[error("{file}: unsupported format_version {version}")]
    UnsupportedVersion { file: String, version: u32 },

    #[error("{file}: feature columns do not match the {schema} schema ({detail})")]
    SchemaMismatch {
        file: String,
        schema: FeatureSchema,
        detail: String,
    },

    #[error("{file}: {reason}")]
    Invalid { file: String, reason: String },

    #[error("Catalog lists no models")]
    EmptyCatalog,

    #[error("Model name {0:?} appears more than once")]
    DuplicateModel(String),
}

/// Index of an artifact directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub format_version: u32,
    pub schema: FeatureSchema,
    /// Model files, in the order the picker lists them.
    pub models: Vec<String>,
    #[serde(default)]
    pub scaler: Option<String>,
}

impl Catalog {
    /// Every file a manifest must bind, the catalog itself first.
    #[must_use]
    pub fn bound_files(&self) -> Vec<&str> {
        std::iter::once(CATALOG_FILE)
            .chain(self.models.iter().map(String::as_str))
            .chain(self.scaler.as_deref())
            .collect()
    }

    /// Read the catalog without any integrity check.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the file is missing or malformed.
    pub fn read_unverified(dir: &Path) -> Result<Self, ArtifactError> {
        let catalog: Self = parse(CATALOG_FILE, &integrity::read_bound(dir, CATALOG_FILE, None)?)?;
        check_version(CATALOG_FILE, catalog.format_version)?;
        Ok(catalog)
    }
}

/// One scoring artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub name: String,
    #[serde(default)]
    pub auc: Option<f64>,
    pub feature_names: Vec<String>,
    pub estimator: Estimator,
}

impl RiskModel for ModelArtifact {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ScoringError> {
        self.estimator.predict_proba(self.n_features(), features)
    }
}

/// A model ready for the dispatcher.
#[derive(Clone)]
pub struct LoadedModel {
    pub name: String,
    pub auc: Option<f64>,
    pub kind: &'static str,
    pub model: Arc<dyn RiskModel>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("auc", &self.auc)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Everything loaded from one artifact directory.
#[derive(Clone)]
pub struct LoadedArtifacts {
    pub schema: FeatureSchema,
    pub models: Vec<LoadedModel>,
    pub scaler: Option<Arc<dyn FeatureScaler>>,
}

impl std::fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("schema", &self.schema)
            .field("models", &self.models)
            .field("scaler", &self.scaler.is_some())
            .finish_non_exhaustive()
    }
}

/// Load and validate every artifact in `dir`.
///
/// # Errors
/// Returns `ArtifactError` on any integrity, parse or schema failure.
pub fn load_artifacts(
    dir: &Path,
    verification: &Verification,
) -> Result<LoadedArtifacts, ArtifactError> {
    let manifest = integrity::verify_directory(dir, verification)?;
    let manifest = manifest.as_ref();

    let catalog: Catalog = parse(CATALOG_FILE, &integrity::read_bound(dir, CATALOG_FILE, manifest)?)?;
    check_version(CATALOG_FILE, catalog.format_version)?;
    if catalog.models.is_empty() {
        return Err(ArtifactError::EmptyCatalog);
    }

    let schema = catalog.schema;
    let mut models: Vec<LoadedModel> = Vec::with_capacity(catalog.models.len());

    for file in &catalog.models {
        let artifact: ModelArtifact = parse(file, &integrity::read_bound(dir, file, manifest)?)?;
        check_version(file, artifact.format_version)?;
        check_columns(file, schema, &artifact.feature_names)?;
        artifact
            .estimator
            .validate(artifact.feature_names.len())
            .map_err(|reason| ArtifactError::Invalid {
                file: file.clone(),
                reason,
            })?;

        if models.iter().any(|m| m.name == artifact.name) {
            return Err(ArtifactError::DuplicateModel(artifact.name));
        }

        tracing::info!(
            "Loaded model {:?} from {} (kind={}, n_features={})",
            artifact.name,
            file,
            artifact.estimator.kind(),
            artifact.feature_names.len()
        );

        models.push(LoadedModel {
            name: artifact.name.clone(),
            auc: artifact.auc,
            kind: artifact.estimator.kind(),
            model: Arc::new(artifact),
        });
    }

    let scaler = match &catalog.scaler {
        Some(file) => {
            let scaler: StandardScaler = parse(file, &integrity::read_bound(dir, file, manifest)?)?;
            check_version(file, scaler.format_version)?;
            check_columns(file, schema, &scaler.feature_names)?;
            scaler.validate().map_err(|reason| ArtifactError::Invalid {
                file: file.clone(),
                reason,
            })?;
            tracing::info!("Loaded feature scaler from {}", file);
            Some(Arc::new(scaler) as Arc<dyn FeatureScaler>)
        }
        None => None,
    };

    Ok(LoadedArtifacts {
        schema,
        models,
        scaler,
    })
}

fn parse<T: serde::de::DeserializeOwned>(file: &str, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Json {
        file: file.to_string(),
        source,
    })
}

fn check_version(file: &str, version: u32) -> Result<(), ArtifactError> {
    if version == FORMAT_VERSION {
        Ok(())
    } else {
        Err(ArtifactError::UnsupportedVersion {
            file: file.to_string(),
            version,
        })
    }
}

fn check_columns(
    file: &str,
    schema: FeatureSchema,
    feature_names: &[String],
) -> Result<(), ArtifactError> {
    let expected = schema.columns();
    let mismatch = |detail: String| ArtifactError::SchemaMismatch {
        file: file.to_string(),
        schema,
        detail,
    };

    if feature_names.len() != expected.len() {
        return Err(mismatch(format!(
            "{} columns, expected {}",
            feature_names.len(),
            expected.len()
        )));
    }
    if let Some((i, (found, want))) = feature_names
        .iter()
        .zip(expected)
        .enumerate()
        .find(|(_, (found, want))| found.as_str() != **want)
    {
        return Err(mismatch(format!("column {i} is {found:?}, expected {want:?}")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small artifact sets written to temporary directories for tests.

    use super::*;

    pub fn columns(schema: FeatureSchema) -> Vec<String> {
        schema.columns().iter().map(|c| (*c).to_string()).collect()
    }

    /// Logistic regression that only looks at `Hypertension`.
    pub fn logistic(schema: FeatureSchema, name: &str) -> ModelArtifact {
        let cols = columns(schema);
        let coefficients = cols
            .iter()
            .map(|c| if c == "Hypertension" { 2.0 } else { 0.0 })
            .collect();
        ModelArtifact {
            format_version: FORMAT_VERSION,
            name: name.to_string(),
            auc: Some(0.81),
            feature_names: cols,
            estimator: Estimator::LogisticRegression(LogisticRegression {
                coefficients,
                intercept: -1.0,
            }),
        }
    }

    /// One-stump forest splitting on `Age` at 60.
    pub fn forest(schema: FeatureSchema, name: &str) -> ModelArtifact {
        ModelArtifact {
            format_version: FORMAT_VERSION,
            name: name.to_string(),
            auc: Some(0.85),
            feature_names: columns(schema),
            estimator: Estimator::RandomForest(RandomForest {
                trees: vec![DecisionTree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 0,
                            threshold: 60.0,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf {
                            value: vec![3.0, 1.0],
                        },
                        TreeNode::Leaf {
                            value: vec![1.0, 3.0],
                        },
                    ],
                }],
            }),
        }
    }

    /// Boosted stump splitting on `SBP` at 140.
    pub fn boosting(schema: FeatureSchema, name: &str) -> ModelArtifact {
        let cols = columns(schema);
        let sbp = cols.iter().position(|c| c == "SBP").unwrap_or(0);
        ModelArtifact {
            format_version: FORMAT_VERSION,
            name: name.to_string(),
            auc: None,
            feature_names: cols,
            estimator: Estimator::GradientBoosting(GradientBoosting {
                trees: vec![DecisionTree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: sbp,
                            threshold: 140.0,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf { value: vec![-2.0] },
                        TreeNode::Leaf { value: vec![2.0] },
                    ],
                }],
                learning_rate: 1.0,
                init_score: 0.0,
            }),
        }
    }

    /// Scaler that shifts every column by 1 and leaves the scale alone.
    pub fn scaler(schema: FeatureSchema) -> StandardScaler {
        let cols = columns(schema);
        StandardScaler {
            format_version: FORMAT_VERSION,
            mean: vec![1.0; cols.len()],
            scale: vec![1.0; cols.len()],
            feature_names: cols,
        }
    }

    pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) {
        let bytes = serde_json::to_vec_pretty(value).expect("serialize artifact");
        std::fs::write(dir.join(name), bytes).expect("write artifact");
    }

    /// The three-model picker layout.
    pub fn write_picker_set(dir: &Path) {
        let schema = FeatureSchema::WithEducation;
        write_json(dir, "logistic.json", &logistic(schema, "Logistic Regression"));
        write_json(dir, "forest.json", &forest(schema, "Random Forest"));
        write_json(dir, "boosting.json", &boosting(schema, "XGBoost"));
        write_json(dir, "scaler.json", &scaler(schema));
        write_json(
            dir,
            CATALOG_FILE,
            &Catalog {
                format_version: FORMAT_VERSION,
                schema,
                models: vec![
                    "logistic.json".into(),
                    "forest.json".into(),
                    "boosting.json".into(),
                ],
                scaler: Some("scaler.json".into()),
            },
        );
    }

    /// The single-model layout.
    pub fn write_single_set(dir: &Path) {
        let schema = FeatureSchema::WithEthnicity;
        write_json(dir, "random_forest.json", &forest(schema, "Random Forest"));
        write_json(
            dir,
            CATALOG_FILE,
            &Catalog {
                format_version: FORMAT_VERSION,
                schema,
                models: vec!["random_forest.json".into()],
                scaler: None,
            },
        );
    }
}
