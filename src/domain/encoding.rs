//! Feature encoding: raw form answers to the exact numeric vector a model
//! was fit against.
//!
//! Column names and order are the contract with the scoring artifacts. The
//! scorers perform no schema validation of their own, so a reordered or
//! shortened vector would silently produce wrong probabilities.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::patient::{
    Categorical, Condition, EducationLevel, Ethnicity, HealthcareAccess, RawPatientInput, Sex,
    SocioeconomicStatus, YesNo,
};

/// Errors raised while encoding a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("{field}: '{value}' is not one of the accepted options")]
    UnknownCategory { field: &'static str, value: String },

    #[error("{field} is required by the {schema} feature schema")]
    MissingField {
        field: &'static str,
        schema: FeatureSchema,
    },
}

/// Feature layouts the shipped models were trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Single-model layout: no education, ethnicity as a Black/White/Other one-hot.
    WithEthnicity,
    /// Model-picker layout: education ordinal, no ethnicity.
    WithEducation,
}

const WITH_ETHNICITY_COLUMNS: [&str; 26] = [
    "Age",
    "Gender_Male",
    "Socioeconomic_Status",
    "Hypertension",
    "Diabetes",
    "Cardiovascular_Disease",
    "Family_History",
    "Smoking",
    "Alcohol",
    "Fatigue",
    "Swelling",
    "Urinary_Frequency",
    "Nocturia",
    "Hematuria",
    "Nausea",
    "Muscle_Cramps",
    "Pallor",
    "Herbal_Medication_Use",
    "Healthcare_Access",
    "SBP",
    "DBP",
    "BMI",
    "Heart_Rate",
    "Ethnicity_Black",
    "Ethnicity_White",
    "Ethnicity_Other",
];

const WITH_EDUCATION_COLUMNS: [&str; 24] = [
    "Age",
    "Gender_Male",
    "Socioeconomic_Status",
    "Education_Level",
    "Hypertension",
    "Diabetes",
    "Cardiovascular_Disease",
    "Family_History",
    "Smoking",
    "Alcohol",
    "Fatigue",
    "Swelling",
    "Urinary_Frequency",
    "Nocturia",
    "Hematuria",
    "Nausea",
    "Muscle_Cramps",
    "Pallor",
    "Herbal_Medication_Use",
    "Healthcare_Access",
    "SBP",
    "DBP",
    "BMI",
    "Heart_Rate",
];

impl FeatureSchema {
    /// Column names in model order.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::WithEthnicity => &WITH_ETHNICITY_COLUMNS,
            Self::WithEducation => &WITH_EDUCATION_COLUMNS,
        }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.columns().len()
    }

    /// Whether the form should ask for ethnicity.
    #[must_use]
    pub fn uses_ethnicity(self) -> bool {
        matches!(self, Self::WithEthnicity)
    }

    /// Whether the form should ask for education level.
    #[must_use]
    pub fn uses_education(self) -> bool {
        matches!(self, Self::WithEducation)
    }

    /// Encode a submission into this schema.
    ///
    /// # Errors
    /// Returns `EncodingError` if a categorical label is outside its enumeration
    /// or a field this schema needs is absent.
    pub fn encode(self, input: &RawPatientInput) -> Result<EncodedFeatureVector, EncodingError> {
        let mut values = Vec::with_capacity(self.len());

        values.push(input.age);
        values.push(encode_sex(Sex::parse_label(&input.sex)?));
        values.push(encode_socioeconomic(SocioeconomicStatus::parse_label(
            &input.socioeconomic_status,
        )?));

        if self.uses_education() {
            let label = input
                .education_level
                .as_deref()
                .ok_or(EncodingError::MissingField {
                    field: EducationLevel::FIELD,
                    schema: self,
                })?;
            values.push(encode_education(EducationLevel::parse_label(label)?));
        }

        for condition in Condition::ALL {
            values.push(encode_yes_no(YesNo::parse_label(
                input.conditions.get(condition),
            )?));
        }

        values.push(encode_healthcare(HealthcareAccess::parse_label(
            &input.healthcare_access,
        )?));
        values.push(input.systolic_bp);
        values.push(input.diastolic_bp);
        values.push(input.bmi);
        values.push(input.heart_rate);

        if self.uses_ethnicity() {
            let label = input
                .ethnicity
                .as_deref()
                .ok_or(EncodingError::MissingField {
                    field: Ethnicity::FIELD,
                    schema: self,
                })?;
            values.extend_from_slice(&encode_ethnicity(Ethnicity::parse_label(label)?));
        }

        debug_assert_eq!(values.len(), self.len());
        Ok(EncodedFeatureVector {
            schema: self,
            values,
        })
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithEthnicity => write!(f, "with_ethnicity"),
            Self::WithEducation => write!(f, "with_education"),
        }
    }
}

#[must_use]
pub fn encode_yes_no(answer: YesNo) -> f64 {
    match answer {
        YesNo::Yes => 1.0,
        YesNo::No => 0.0,
    }
}

#[must_use]
pub fn encode_sex(sex: Sex) -> f64 {
    match sex {
        Sex::Male => 1.0,
        Sex::Female => 0.0,
    }
}

#[must_use]
pub fn encode_healthcare(access: HealthcareAccess) -> f64 {
    match access {
        HealthcareAccess::Good => 1.0,
        HealthcareAccess::Poor => 0.0,
    }
}

#[must_use]
pub fn encode_socioeconomic(status: SocioeconomicStatus) -> f64 {
    match status {
        SocioeconomicStatus::Low => 0.0,
        SocioeconomicStatus::Middle => 1.0,
        SocioeconomicStatus::High => 2.0,
    }
}

#[must_use]
pub fn encode_education(level: EducationLevel) -> f64 {
    match level {
        EducationLevel::NoEducation => 0.0,
        EducationLevel::Primary => 1.0,
        EducationLevel::Secondary => 2.0,
        EducationLevel::Tertiary => 3.0,
    }
}

/// `[Ethnicity_Black, Ethnicity_White, Ethnicity_Other]`.
///
/// Asian and Hispanic share the Other bucket; the models never saw them as
/// separate columns.
#[must_use]
pub fn encode_ethnicity(ethnicity: Ethnicity) -> [f64; 3] {
    match ethnicity {
        Ethnicity::Black => [1.0, 0.0, 0.0],
        Ethnicity::White => [0.0, 1.0, 0.0],
        Ethnicity::Asian | Ethnicity::Hispanic | Ethnicity::Other => [0.0, 0.0, 1.0],
    }
}

/// An encoded submission together with the schema it follows.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl EncodedFeatureVector {
    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in schema order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.schema
            .columns()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}
