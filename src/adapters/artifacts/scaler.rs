//! Standardisation transform exported alongside the logistic-regression model.

use serde::{Deserialize, Serialize};

use crate::ports::{check_shape, FeatureScaler, ScoringError};

/// `(x - mean) / scale`, column by column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// # Errors
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(format!(
                "mean ({}) and scale ({}) must both have {n} entries",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err("non-finite mean or scale".into());
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScoringError> {
        check_shape(self.mean.len(), features)?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant columns are exported with a zero scale.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> StandardScaler {
        StandardScaler {
            format_version: 1,
            feature_names: vec!["Age".into(), "Gender_Male".into()],
            mean: vec![50.0, 0.5],
            scale: vec![10.0, 0.0],
        }
    }

    #[test]
    fn test_transform() {
        let out = scaler().transform(&[60.0, 1.0]).unwrap();
        assert_eq!(out, vec![1.0, 0.5]);
    }

    #[test]
    fn test_transform_rejects_wrong_length() {
        assert!(matches!(
            scaler().transform(&[1.0]),
            Err(ScoringError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_validate_lengths() {
        let mut s = scaler();
        s.scale.pop();
        assert!(s.validate().is_err());
        assert!(scaler().validate().is_ok());
    }
}
