//! Assessment service: encode, dispatch to a model, classify.
//!
//! Models are held read-only for the life of the process. Each call to
//! [`AssessmentService::assess`] is a self-contained synchronous pass with no
//! state carried between submissions.

use std::sync::Arc;

use crate::adapters::artifacts::LoadedArtifacts;
use crate::domain::{
    EncodedFeatureVector, EncodingError, FeatureSchema, RawPatientInput, RiskAssessment,
};
use crate::ports::{FeatureScaler, RiskModel, ScoringError};

/// Errors raised by the assessment pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model {0:?} needs feature scaling but no scaler was loaded")]
    MissingScaler(String),

    #[error("Model {model:?} expects {expected} features, the {schema} schema has {actual}")]
    SchemaMismatch {
        model: String,
        schema: FeatureSchema,
        expected: usize,
        actual: usize,
    },

    #[error("No models available")]
    NoModels,
}

impl AssessmentError {
    /// Whether the user can fix this by changing their answers.
    ///
    /// Everything else is a broken deployment rather than a bad submission.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }
}

/// Models whose inputs must be standardised first, recognised by name.
#[must_use]
pub fn requires_scaling(model_name: &str) -> bool {
    model_name.contains("Logistic")
}

/// One selectable model.
#[derive(Clone)]
pub struct ModelEntry {
    pub name: String,
    pub auc: Option<f64>,
    pub model: Arc<dyn RiskModel>,
}

/// Probability returned by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub probability: f64,
    pub scaled: bool,
}

pub struct AssessmentService {
    schema: FeatureSchema,
    entries: Vec<ModelEntry>,
    scaler: Option<Arc<dyn FeatureScaler>>,
}

impl AssessmentService {
    /// Build the service, checking that every model fits the schema and that a
    /// scaler is present when a model needs one.
    ///
    /// # Errors
    /// Returns `AssessmentError` describing the first contract violation.
    pub fn new(
        schema: FeatureSchema,
        entries: Vec<ModelEntry>,
        scaler: Option<Arc<dyn FeatureScaler>>,
    ) -> Result<Self, AssessmentError> {
        if entries.is_empty() {
            return Err(AssessmentError::NoModels);
        }
        for entry in &entries {
            if entry.model.n_features() != schema.len() {
                return Err(AssessmentError::SchemaMismatch {
                    model: entry.name.clone(),
                    schema,
                    expected: entry.model.n_features(),
                    actual: schema.len(),
                });
            }
            if requires_scaling(&entry.name) && scaler.is_none() {
                return Err(AssessmentError::MissingScaler(entry.name.clone()));
            }
        }

        Ok(Self {
            schema,
            entries,
            scaler,
        })
    }

    /// # Errors
    /// See [`AssessmentService::new`].
    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Result<Self, AssessmentError> {
        let entries = artifacts
            .models
            .into_iter()
            .map(|m| ModelEntry {
                name: m.name,
                auc: m.auc,
                model: m.model,
            })
            .collect();
        Self::new(artifacts.schema, entries, artifacts.scaler)
    }

    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Model names in picker order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// The model selected when the form opens.
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.entries[0].name
    }

    /// Whether the form should offer a model picker.
    #[must_use]
    pub fn has_model_choice(&self) -> bool {
        self.entries.len() > 1
    }

    #[must_use]
    pub fn model_auc(&self, model_name: &str) -> Option<f64> {
        self.entry(model_name).ok().and_then(|e| e.auc)
    }

    fn entry(&self, model_name: &str) -> Result<&ModelEntry, AssessmentError> {
        self.entries
            .iter()
            .find(|e| e.name == model_name)
            .ok_or_else(|| AssessmentError::UnknownModel(model_name.to_string()))
    }

    /// Encode a submission with this deployment's schema.
    ///
    /// # Errors
    /// Returns `AssessmentError::Encoding` for labels outside their enumeration.
    pub fn encode(&self, input: &RawPatientInput) -> Result<EncodedFeatureVector, AssessmentError> {
        Ok(self.schema.encode(input)?)
    }

    /// Score an encoded vector with the named model, scaling first when the
    /// model needs it.
    ///
    /// # Errors
    /// Returns `AssessmentError` if the model is unknown or the vector does not
    /// follow this deployment's schema.
    pub fn score(
        &self,
        model_name: &str,
        features: &EncodedFeatureVector,
    ) -> Result<Score, AssessmentError> {
        let entry = self.entry(model_name)?;

        if features.schema() != self.schema {
            return Err(AssessmentError::SchemaMismatch {
                model: entry.name.clone(),
                schema: features.schema(),
                expected: entry.model.n_features(),
                actual: features.len(),
            });
        }

        if requires_scaling(&entry.name) {
            let scaler = self
                .scaler
                .as_ref()
                .ok_or_else(|| AssessmentError::MissingScaler(entry.name.clone()))?;
            let scaled = scaler.transform(features.values())?;
            Ok(Score {
                probability: entry.model.positive_probability(&scaled)?,
                scaled: true,
            })
        } else {
            Ok(Score {
                probability: entry.model.positive_probability(features.values())?,
                scaled: false,
            })
        }
    }

    /// Full pipeline for one submission.
    ///
    /// # Errors
    /// Returns `AssessmentError` from encoding or scoring.
    pub fn assess(
        &self,
        input: &RawPatientInput,
        model_name: &str,
    ) -> Result<RiskAssessment, AssessmentError> {
        let features = self.encode(input)?;
        tracing::debug!(
            "Encoded {} features with the {} schema",
            features.len(),
            self.schema
        );
        self.assess_encoded(model_name, &features)
    }

    /// Score and classify an already encoded vector.
    ///
    /// # Errors
    /// Returns `AssessmentError` from scoring.
    pub fn assess_encoded(
        &self,
        model_name: &str,
        features: &EncodedFeatureVector,
    ) -> Result<RiskAssessment, AssessmentError> {
        let score = self.score(model_name, features)?;
        let assessment = RiskAssessment::new(
            score.probability,
            model_name,
            self.model_auc(model_name),
            score.scaled,
        );

        tracing::info!(
            "Assessment complete: model={:?}, scaled={}, risk={}",
            assessment.model_name,
            assessment.scaled,
            assessment.risk_level
        );
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::{fixtures, load_artifacts, Verification};
    use crate::domain::{ConditionAnswers, RiskLevel, YesNo};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Returns a fixed probability and remembers what it was given.
    struct RecordingModel {
        n: usize,
        probability: f64,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl RecordingModel {
        fn new(n: usize, probability: f64) -> Arc<Self> {
            Arc::new(Self {
                n,
                probability,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn last_input(&self) -> Vec<f64> {
            self.seen.lock().unwrap().last().cloned().expect("model was called")
        }
    }

    impl RiskModel for RecordingModel {
        fn n_features(&self) -> usize {
            self.n
        }

        fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ScoringError> {
            crate::ports::check_shape(self.n, features)?;
            self.seen.lock().unwrap().push(features.to_vec());
            Ok([1.0 - self.probability, self.probability])
        }
    }

    /// Marks every value so routed vectors are recognisable.
    struct NegatingScaler;

    impl FeatureScaler for NegatingScaler {
        fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScoringError> {
            Ok(features.iter().map(|x| -x - 1000.0).collect())
        }
    }

    fn patient() -> RawPatientInput {
        RawPatientInput {
            age: 45.0,
            sex: "Male".into(),
            ethnicity: None,
            socioeconomic_status: "Middle".into(),
            education_level: Some("Tertiary".into()),
            conditions: ConditionAnswers::all(YesNo::No),
            healthcare_access: "Good".into(),
            systolic_bp: 130.0,
            diastolic_bp: 80.0,
            bmi: 24.0,
            heart_rate: 75.0,
        }
    }

    fn entry(name: &str, model: Arc<RecordingModel>) -> ModelEntry {
        ModelEntry {
            name: name.into(),
            auc: Some(0.8),
            model,
        }
    }

    #[test]
    fn test_dispatch_routes_logistic_through_scaler() {
        let n = FeatureSchema::WithEducation.len();
        let logistic = RecordingModel::new(n, 0.7);
        let forest = RecordingModel::new(n, 0.2);
        let boosting = RecordingModel::new(n, 0.5);

        let service = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![
                entry("Logistic Regression", logistic.clone()),
                entry("Random Forest", forest.clone()),
                entry("XGBoost", boosting.clone()),
            ],
            Some(Arc::new(NegatingScaler)),
        )
        .expect("service");

        let input = patient();
        let raw = service.encode(&input).unwrap();

        let a = service.assess(&input, "Logistic Regression").unwrap();
        assert!(a.scaled);
        assert_eq!(logistic.last_input()[0], -1045.0);

        let b = service.assess(&input, "Random Forest").unwrap();
        assert!(!b.scaled);
        assert_eq!(forest.last_input(), raw.values());

        let c = service.assess(&input, "XGBoost").unwrap();
        assert!(!c.scaled);
        assert_eq!(boosting.last_input(), raw.values());

        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(b.risk_level, RiskLevel::Low);
        // Exactly 0.5 stays low.
        assert_eq!(c.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_assess_encoded_scores_the_given_vector() {
        let n = FeatureSchema::WithEducation.len();
        let forest = RecordingModel::new(n, 0.6);
        let service = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![entry("Random Forest", forest.clone())],
            None,
        )
        .expect("service");

        let features = service.encode(&patient()).unwrap();
        let assessment = service.assess_encoded("Random Forest", &features).unwrap();

        assert_eq!(forest.calls(), 1);
        assert_eq!(forest.last_input(), features.values());
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.model_auc, Some(0.8));
        assert!(!assessment.scaled);
    }

    #[test]
    fn test_unknown_model() {
        let n = FeatureSchema::WithEducation.len();
        let service = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![entry("Random Forest", RecordingModel::new(n, 0.1))],
            None,
        )
        .unwrap();
        let err = service.assess(&patient(), "SVM").unwrap_err();
        assert!(matches!(err, AssessmentError::UnknownModel(ref m) if m == "SVM"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_logistic_without_scaler_rejected_at_construction() {
        let n = FeatureSchema::WithEducation.len();
        let result = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![entry("Logistic Regression", RecordingModel::new(n, 0.1))],
            None,
        );
        assert!(matches!(result, Err(AssessmentError::MissingScaler(_))));
    }

    #[test]
    fn test_model_width_must_match_schema() {
        let result = AssessmentService::new(
            FeatureSchema::WithEthnicity,
            vec![entry("Random Forest", RecordingModel::new(25, 0.1))],
            None,
        );
        assert!(matches!(
            result,
            Err(AssessmentError::SchemaMismatch {
                expected: 25,
                actual: 26,
                ..
            })
        ));
        assert!(matches!(
            AssessmentService::new(FeatureSchema::WithEthnicity, vec![], None),
            Err(AssessmentError::NoModels)
        ));
    }

    #[test]
    fn test_vector_from_other_schema_rejected() {
        let n = FeatureSchema::WithEducation.len();
        let service = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![entry("Random Forest", RecordingModel::new(n, 0.1))],
            None,
        )
        .unwrap();

        let mut input = patient();
        input.ethnicity = Some("Asian".into());
        let foreign = FeatureSchema::WithEthnicity.encode(&input).unwrap();
        assert!(matches!(
            service.score("Random Forest", &foreign),
            Err(AssessmentError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_encoding_error_is_recoverable() {
        let n = FeatureSchema::WithEducation.len();
        let service = AssessmentService::new(
            FeatureSchema::WithEducation,
            vec![entry("Random Forest", RecordingModel::new(n, 0.1))],
            None,
        )
        .unwrap();
        let mut input = patient();
        input.sex = "Unknown".into();
        let err = service.assess(&input, "Random Forest").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_end_to_end_with_loaded_artifacts() {
        let temp = tempdir().unwrap();
        fixtures::write_picker_set(temp.path());
        let artifacts = load_artifacts(temp.path(), &Verification::Unsigned).unwrap();
        let service = AssessmentService::from_artifacts(artifacts).expect("service");

        assert!(service.has_model_choice());
        assert_eq!(service.default_model(), "Logistic Regression");
        let names: Vec<&str> = service.model_names().collect();
        assert_eq!(names, ["Logistic Regression", "Random Forest", "XGBoost"]);

        let mut input = patient();
        input.conditions.hypertension = "Yes".into();

        // Scaler subtracts 1 from every column: Hypertension 1 -> 0, so z = -1.
        let lr = service.assess(&input, "Logistic Regression").unwrap();
        assert!((lr.probability - crate::adapters::artifacts::sigmoid(-1.0)).abs() < 1e-12);
        assert_eq!(lr.model_line(), "Model: Logistic Regression (AUC: 0.81)");

        // Age 45 <= 60 -> left leaf [3, 1].
        let rf = service.assess(&input, "Random Forest").unwrap();
        assert!((rf.probability - 0.25).abs() < 1e-12);
        assert_eq!(rf.headline(), "CKD Risk: 25.00%");

        // SBP 130 <= 140 -> leaf -2.
        let gb = service.assess(&input, "XGBoost").unwrap();
        assert!((gb.probability - crate::adapters::artifacts::sigmoid(-2.0)).abs() < 1e-12);
        assert_eq!(gb.model_line(), "Model: XGBoost");
    }

    #[test]
    fn test_single_model_deployment() {
        let temp = tempdir().unwrap();
        fixtures::write_single_set(temp.path());
        let artifacts = load_artifacts(temp.path(), &Verification::Unsigned).unwrap();
        let service = AssessmentService::from_artifacts(artifacts).unwrap();

        assert!(!service.has_model_choice());
        assert_eq!(service.schema(), FeatureSchema::WithEthnicity);

        let mut input = patient();
        input.ethnicity = Some("White".into());
        input.age = 72.0;
        let result = service.assess(&input, service.default_model()).unwrap();
        assert!((result.probability - 0.75).abs() < 1e-12);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(!result.scaled);
    }
}
