//! Domain layer: Core types and pure logic.
//!
//! Nothing here touches the filesystem, the terminal or a model artifact.

mod assessment;
pub mod encoding;
pub mod patient;

pub use assessment::{RiskAssessment, RiskLevel, HIGH_RISK_THRESHOLD};
pub use encoding::{EncodedFeatureVector, EncodingError, FeatureSchema};
pub use patient::{
    Categorical, Condition, ConditionAnswers, EducationLevel, Ethnicity, HealthcareAccess,
    NumericBounds, RawPatientInput, Sex, SocioeconomicStatus, YesNo,
};
