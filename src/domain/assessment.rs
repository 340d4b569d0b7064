//! Risk classification of a model probability.

use serde::{Deserialize, Serialize};

/// Probability above which a patient is flagged. The comparison is strict:
/// exactly 0.5 is low risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.5;

/// Binary CKD risk banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    /// Classify a positive-class probability.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Advisory text shown under the banner.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk. Continue preventive care and lifestyle management.",
            Self::High => "High Risk of CKD. Recommend clinical evaluation.",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low Risk"),
            Self::High => write!(f, "High Risk"),
        }
    }
}

/// Outcome of one encode, score and classify pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Probability of the CKD class (0.0 to 1.0).
    pub probability: f64,

    pub risk_level: RiskLevel,

    /// Display name of the model that produced the score.
    pub model_name: String,

    /// Reported validation AUC of that model, if the artifact carries one.
    pub model_auc: Option<f64>,

    /// Whether the feature vector went through the scaler first.
    pub scaled: bool,

    pub assessed_at: chrono::DateTime<chrono::Utc>,
}

impl RiskAssessment {
    #[must_use]
    pub fn new(
        probability: f64,
        model_name: impl Into<String>,
        model_auc: Option<f64>,
        scaled: bool,
    ) -> Self {
        Self {
            probability,
            risk_level: RiskLevel::from_probability(probability),
            model_name: model_name.into(),
            model_auc,
            scaled,
            assessed_at: chrono::Utc::now(),
        }
    }

    /// Probability as a percentage with two decimals, e.g. `37.25%`.
    #[must_use]
    pub fn percentage(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }

    /// `CKD Risk: 37.25%`
    #[must_use]
    pub fn headline(&self) -> String {
        format!("CKD Risk: {}", self.percentage())
    }

    /// `Model: Random Forest (AUC: 0.85)`
    #[must_use]
    pub fn model_line(&self) -> String {
        match self.model_auc {
            Some(auc) => format!("Model: {} (AUC: {auc:.2})", self.model_name),
            None => format!("Model: {}", self.model_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.5001), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn test_display_strings() {
        let assessment = RiskAssessment::new(0.3725, "Random Forest", Some(0.85), false);
        assert_eq!(assessment.headline(), "CKD Risk: 37.25%");
        assert_eq!(assessment.model_line(), "Model: Random Forest (AUC: 0.85)");
        assert_eq!(assessment.risk_level.to_string(), "Low Risk");
        assert!(assessment.risk_level.advice().starts_with("Low Risk."));

        let high = RiskAssessment::new(0.9, "XGBoost", None, false);
        assert_eq!(high.model_line(), "Model: XGBoost");
        assert_eq!(high.risk_level, RiskLevel::High);
        assert_eq!(high.percentage(), "90.00%");
    }
}
