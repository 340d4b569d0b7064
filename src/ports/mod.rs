//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary between
//! the assessment pipeline and the scoring artifacts it consumes.

mod model;

pub use model::{check_shape, FeatureScaler, RiskModel, ScoringError};
