//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: portable model/scaler artifacts with signed-manifest verification
//! - `sanitize`: redaction of clinical values in log output

pub mod artifacts;
pub mod sanitize;

pub use artifacts::ArtifactError;
