//! Model port: Traits for scoring artifacts and feature scalers.
//!
//! The application only ever asks a model for class probabilities, whatever
//! algorithm sits behind it.

/// Errors raised while scoring a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Feature vector has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model produced a non-finite probability")]
    NonFinite,
}

/// A pre-trained binary classifier.
pub trait RiskModel: Send + Sync {
    /// Number of features the model was fit with.
    fn n_features(&self) -> usize;

    /// Class probabilities `[p(no CKD), p(CKD)]`.
    ///
    /// # Errors
    /// Returns `ScoringError::ShapeMismatch` if `features` has the wrong length.
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ScoringError>;

    /// Probability of the positive (CKD) class.
    ///
    /// # Errors
    /// Propagates `predict_proba` errors; `ScoringError::NonFinite` if the
    /// probability is NaN or infinite.
    fn positive_probability(&self, features: &[f64]) -> Result<f64, ScoringError> {
        let p = self.predict_proba(features)?[1];
        if p.is_finite() {
            Ok(p)
        } else {
            Err(ScoringError::NonFinite)
        }
    }
}

/// A deterministic feature transform applied before some models.
pub trait FeatureScaler: Send + Sync {
    /// Transform a vector into a new vector of the same length.
    ///
    /// # Errors
    /// Returns `ScoringError::ShapeMismatch` if `features` has the wrong length.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScoringError>;
}

/// Check an input length against what a model or scaler was fit with.
///
/// # Errors
/// Returns `ScoringError::ShapeMismatch` when the lengths differ.
pub fn check_shape(expected: usize, features: &[f64]) -> Result<(), ScoringError> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(ScoringError::ShapeMismatch {
            expected,
            actual: features.len(),
        })
    }
}
