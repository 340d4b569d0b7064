//! Patient answers collected by the risk form.
//!
//! Categorical answers are carried as the label the form displayed, exactly as
//! submitted. The encoder parses them against the enumerations declared here,
//! so a label that slipped past the input boundary surfaces as an
//! [`EncodingError`] instead of a silently wrong feature.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::encoding::EncodingError;

/// A closed set of labels a select box can offer.
pub trait Categorical: Sized + Copy + 'static {
    /// Field name used in error messages.
    const FIELD: &'static str;

    /// Every variant, in the order the form lists them.
    const ALL: &'static [Self];

    /// Label shown to the user and accepted on input.
    fn label(self) -> &'static str;

    /// Labels in display order.
    #[must_use]
    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.label()).collect()
    }

    /// Parse a submitted label.
    ///
    /// # Errors
    /// Returns `EncodingError::UnknownCategory` if the label is not in the enumeration.
    fn parse_label(value: &str) -> Result<Self, EncodingError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label() == value)
            .ok_or_else(|| EncodingError::UnknownCategory {
                field: Self::FIELD,
                value: value.to_string(),
            })
    }
}

/// Sex as recorded on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
}

impl Categorical for Sex {
    const FIELD: &'static str = "Sex";
    const ALL: &'static [Self] = &[Self::Male, Self::Female];

    fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sex {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

/// Self-reported ethnicity. The model only distinguishes Black, White and
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ethnicity {
    Black,
    White,
    Asian,
    Hispanic,
    Other,
}

impl Categorical for Ethnicity {
    const FIELD: &'static str = "Ethnicity";
    const ALL: &'static [Self] = &[Self::Black, Self::White, Self::Asian, Self::Hispanic, Self::Other];

    fn label(self) -> &'static str {
        match self {
            Self::Black => "Black",
            Self::White => "White",
            Self::Asian => "Asian",
            Self::Hispanic => "Hispanic",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Ethnicity {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocioeconomicStatus {
    Low,
    Middle,
    High,
}

impl Categorical for SocioeconomicStatus {
    const FIELD: &'static str = "Socioeconomic Status";
    const ALL: &'static [Self] = &[Self::Low, Self::Middle, Self::High];

    fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Middle => "Middle",
            Self::High => "High",
        }
    }
}

impl fmt::Display for SocioeconomicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SocioeconomicStatus {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationLevel {
    NoEducation,
    Primary,
    Secondary,
    Tertiary,
}

impl Categorical for EducationLevel {
    const FIELD: &'static str = "Education Level";
    const ALL: &'static [Self] = &[Self::NoEducation, Self::Primary, Self::Secondary, Self::Tertiary];

    fn label(self) -> &'static str {
        match self {
            Self::NoEducation => "No education",
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
            Self::Tertiary => "Tertiary",
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EducationLevel {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthcareAccess {
    Good,
    Poor,
}

impl Categorical for HealthcareAccess {
    const FIELD: &'static str = "Access to Healthcare";
    const ALL: &'static [Self] = &[Self::Good, Self::Poor];

    fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for HealthcareAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HealthcareAccess {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

/// Answer to any yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YesNo {
    Yes,
    No,
}

impl Categorical for YesNo {
    const FIELD: &'static str = "Yes/No";
    const ALL: &'static [Self] = &[Self::Yes, Self::No];

    fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for YesNo {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

/// Inclusive bounds and default for a numeric form field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

impl NumericBounds {
    const fn new(min: f64, max: f64, default: f64, step: f64) -> Self {
        Self {
            min,
            max,
            default,
            step,
        }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// True when `value` is `min` plus a whole number of steps.
    #[must_use]
    pub fn on_step(&self, value: f64) -> bool {
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() < 1e-6
    }

    /// True for a value the slider itself could have produced.
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        self.contains(value) && self.on_step(value)
    }

    /// Whether typed input may carry a decimal point.
    #[must_use]
    pub fn fractional(&self) -> bool {
        self.step < 1.0
    }
}

pub const AGE_BOUNDS: NumericBounds = NumericBounds::new(18.0, 100.0, 45.0, 1.0);
pub const SBP_BOUNDS: NumericBounds = NumericBounds::new(90.0, 200.0, 130.0, 1.0);
pub const DBP_BOUNDS: NumericBounds = NumericBounds::new(60.0, 120.0, 80.0, 1.0);
pub const BMI_BOUNDS: NumericBounds = NumericBounds::new(10.0, 60.0, 24.0, 0.1);
pub const HEART_RATE_BOUNDS: NumericBounds = NumericBounds::new(40.0, 150.0, 75.0, 1.0);

/// Yes/no questions in feature-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Hypertension,
    Diabetes,
    CardiovascularDisease,
    FamilyHistory,
    Smoking,
    Alcohol,
    Fatigue,
    Swelling,
    UrinaryFrequency,
    Nocturia,
    Hematuria,
    Nausea,
    MuscleCramps,
    Pallor,
    HerbalMedicationUse,
}

impl Condition {
    pub const ALL: [Condition; 15] = [
        Condition::Hypertension,
        Condition::Diabetes,
        Condition::CardiovascularDisease,
        Condition::FamilyHistory,
        Condition::Smoking,
        Condition::Alcohol,
        Condition::Fatigue,
        Condition::Swelling,
        Condition::UrinaryFrequency,
        Condition::Nocturia,
        Condition::Hematuria,
        Condition::Nausea,
        Condition::MuscleCramps,
        Condition::Pallor,
        Condition::HerbalMedicationUse,
    ];

    /// Question label on the form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Hypertension => "Hypertension",
            Self::Diabetes => "Diabetes",
            Self::CardiovascularDisease => "Cardiovascular Disease",
            Self::FamilyHistory => "Family History of CKD",
            Self::Smoking => "Smoking",
            Self::Alcohol => "Alcohol Intake",
            Self::Fatigue => "Fatigue",
            Self::Swelling => "Swelling (Edema)",
            Self::UrinaryFrequency => "Urinary Frequency",
            Self::Nocturia => "Nocturia",
            Self::Hematuria => "Hematuria",
            Self::Nausea => "Nausea",
            Self::MuscleCramps => "Muscle Cramps",
            Self::Pallor => "Pallor",
            Self::HerbalMedicationUse => "Herbal Medication Use",
        }
    }

    /// Feature column the model was fit with.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Hypertension => "Hypertension",
            Self::Diabetes => "Diabetes",
            Self::CardiovascularDisease => "Cardiovascular_Disease",
            Self::FamilyHistory => "Family_History",
            Self::Smoking => "Smoking",
            Self::Alcohol => "Alcohol",
            Self::Fatigue => "Fatigue",
            Self::Swelling => "Swelling",
            Self::UrinaryFrequency => "Urinary_Frequency",
            Self::Nocturia => "Nocturia",
            Self::Hematuria => "Hematuria",
            Self::Nausea => "Nausea",
            Self::MuscleCramps => "Muscle_Cramps",
            Self::Pallor => "Pallor",
            Self::HerbalMedicationUse => "Herbal_Medication_Use",
        }
    }
}

/// Answers to the yes/no questions, stored as submitted labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConditionAnswers {
    pub hypertension: String,
    pub diabetes: String,
    pub cardiovascular_disease: String,
    pub family_history: String,
    pub smoking: String,
    pub alcohol: String,
    pub fatigue: String,
    pub swelling: String,
    pub urinary_frequency: String,
    pub nocturia: String,
    pub hematuria: String,
    pub nausea: String,
    pub muscle_cramps: String,
    pub pallor: String,
    pub herbal_medication_use: String,
}

impl ConditionAnswers {
    /// Every question answered with the same label.
    #[must_use]
    pub fn all(answer: YesNo) -> Self {
        let a = || answer.label().to_string();
        Self {
            hypertension: a(),
            diabetes: a(),
            cardiovascular_disease: a(),
            family_history: a(),
            smoking: a(),
            alcohol: a(),
            fatigue: a(),
            swelling: a(),
            urinary_frequency: a(),
            nocturia: a(),
            hematuria: a(),
            nausea: a(),
            muscle_cramps: a(),
            pallor: a(),
            herbal_medication_use: a(),
        }
    }

    fn slot_mut(&mut self, condition: Condition) -> &mut String {
        match condition {
            Condition::Hypertension => &mut self.hypertension,
            Condition::Diabetes => &mut self.diabetes,
            Condition::CardiovascularDisease => &mut self.cardiovascular_disease,
            Condition::FamilyHistory => &mut self.family_history,
            Condition::Smoking => &mut self.smoking,
            Condition::Alcohol => &mut self.alcohol,
            Condition::Fatigue => &mut self.fatigue,
            Condition::Swelling => &mut self.swelling,
            Condition::UrinaryFrequency => &mut self.urinary_frequency,
            Condition::Nocturia => &mut self.nocturia,
            Condition::Hematuria => &mut self.hematuria,
            Condition::Nausea => &mut self.nausea,
            Condition::MuscleCramps => &mut self.muscle_cramps,
            Condition::Pallor => &mut self.pallor,
            Condition::HerbalMedicationUse => &mut self.herbal_medication_use,
        }
    }

    #[must_use]
    pub fn get(&self, condition: Condition) -> &str {
        match condition {
            Condition::Hypertension => &self.hypertension,
            Condition::Diabetes => &self.diabetes,
            Condition::CardiovascularDisease => &self.cardiovascular_disease,
            Condition::FamilyHistory => &self.family_history,
            Condition::Smoking => &self.smoking,
            Condition::Alcohol => &self.alcohol,
            Condition::Fatigue => &self.fatigue,
            Condition::Swelling => &self.swelling,
            Condition::UrinaryFrequency => &self.urinary_frequency,
            Condition::Nocturia => &self.nocturia,
            Condition::Hematuria => &self.hematuria,
            Condition::Nausea => &self.nausea,
            Condition::MuscleCramps => &self.muscle_cramps,
            Condition::Pallor => &self.pallor,
            Condition::HerbalMedicationUse => &self.herbal_medication_use,
        }
    }

    pub fn set(&mut self, condition: Condition, answer: impl Into<String>) {
        *self.slot_mut(condition) = answer.into();
    }
}

impl Default for ConditionAnswers {
    fn default() -> Self {
        Self::all(YesNo::Yes)
    }
}

/// One form submission.
///
/// `ethnicity` is only consumed by the ethnicity schema and `education_level`
/// only by the education schema; the other may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPatientInput {
    pub age: f64,
    pub sex: String,
    #[serde(default)]
    pub ethnicity: Option<String>,
    pub socioeconomic_status: String,
    #[serde(default)]
    pub education_level: Option<String>,
    pub conditions: ConditionAnswers,
    pub healthcare_access: String,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub bmi: f64,
    pub heart_rate: f64,
}

impl Default for RawPatientInput {
    /// The form's initial state: slider defaults and the first label of
    /// every select box.
    fn default() -> Self {
        Self {
            age: AGE_BOUNDS.default,
            sex: Sex::Male.label().to_string(),
            ethnicity: Some(Ethnicity::Black.label().to_string()),
            socioeconomic_status: SocioeconomicStatus::Low.label().to_string(),
            education_level: Some(EducationLevel::NoEducation.label().to_string()),
            conditions: ConditionAnswers::default(),
            healthcare_access: HealthcareAccess::Good.label().to_string(),
            systolic_bp: SBP_BOUNDS.default,
            diastolic_bp: DBP_BOUNDS.default,
            bmi: BMI_BOUNDS.default,
            heart_rate: HEART_RATE_BOUNDS.default,
        }
    }
}

impl RawPatientInput {
    /// Check numeric answers against the form's slider bounds and steps.
    ///
    /// The interactive form cannot produce these values; this guards inputs
    /// that arrive as files.
    ///
    /// # Errors
    /// Returns one message per out-of-range or off-step field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let checks = [
            ("Age", self.age, AGE_BOUNDS),
            ("Systolic BP", self.systolic_bp, SBP_BOUNDS),
            ("Diastolic BP", self.diastolic_bp, DBP_BOUNDS),
            ("BMI", self.bmi, BMI_BOUNDS),
            ("Heart Rate", self.heart_rate, HEART_RATE_BOUNDS),
        ];

        let errors: Vec<String> = checks
            .iter()
            .filter_map(|(label, value, bounds)| bounds_error(label, *value, bounds))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Message for a value outside `bounds` or off its step grid.
fn bounds_error(label: &str, value: f64, bounds: &NumericBounds) -> Option<String> {
    if !bounds.contains(value) {
        Some(format!(
            "{label} {value} out of range [{}, {}]",
            bounds.min, bounds.max
        ))
    } else if !bounds.on_step(value) {
        Some(format!("{label} {value} must be a multiple of {}", bounds.step))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_parse() {
        for eth in Ethnicity::ALL {
            assert_eq!(eth.label().parse::<Ethnicity>().unwrap(), *eth);
        }
        assert_eq!(
            "No education".parse::<EducationLevel>().unwrap(),
            EducationLevel::NoEducation
        );
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = "Maybe".parse::<YesNo>().unwrap_err();
        assert!(matches!(
            err,
            EncodingError::UnknownCategory { field: "Yes/No", ref value } if value == "Maybe"
        ));
        // Labels are case-sensitive, as in the select boxes.
        assert!("male".parse::<Sex>().is_err());
    }

    #[test]
    fn test_defaults_match_form() {
        let input = RawPatientInput::default();
        assert!((input.age - 45.0).abs() < f64::EPSILON);
        assert!((input.systolic_bp - 130.0).abs() < f64::EPSILON);
        assert!((input.bmi - 24.0).abs() < f64::EPSILON);
        assert_eq!(input.sex, "Male");
        assert_eq!(input.conditions.get(Condition::Pallor), "Yes");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_condition_set_targets_one_slot() {
        let mut answers = ConditionAnswers::all(YesNo::No);
        answers.set(Condition::Nocturia, "Yes");
        for condition in Condition::ALL {
            let expected = if condition == Condition::Nocturia { "Yes" } else { "No" };
            assert_eq!(answers.get(condition), expected);
        }
    }

    #[test]
    fn test_validation_reports_each_out_of_range_field() {
        let input = RawPatientInput {
            age: 12.0,
            heart_rate: 200.0,
            ..RawPatientInput::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Age"));
        assert!(errors[1].starts_with("Heart Rate"));
    }

    #[test]
    fn test_whole_number_fields_reject_fractions() {
        let input = RawPatientInput {
            age: 45.5,
            systolic_bp: 130.25,
            ..RawPatientInput::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Age 45.5 must be a multiple of 1");
        assert!(errors[1].starts_with("Systolic BP 130.25"));
    }

    #[test]
    fn test_bmi_accepts_tenths_only() {
        let tenth = RawPatientInput {
            bmi: 24.3,
            ..RawPatientInput::default()
        };
        assert!(tenth.validate().is_ok());

        let hundredth = RawPatientInput {
            bmi: 24.35,
            ..RawPatientInput::default()
        };
        assert!(hundredth.validate().unwrap_err()[0].starts_with("BMI"));

        assert!(BMI_BOUNDS.fractional());
        assert!(!AGE_BOUNDS.fractional());
    }

    #[test]
    fn test_display_matches_label() {
        for level in EducationLevel::ALL {
            assert_eq!(level.to_string(), level.label());
        }
        assert_eq!(HealthcareAccess::labels(), vec!["Good", "Poor"]);
        assert_eq!(SocioeconomicStatus::ALL.len(), 3);
    }

    #[test]
    fn test_bounds_clamp() {
        assert!((BMI_BOUNDS.clamp(75.0) - 60.0).abs() < f64::EPSILON);
        assert!(AGE_BOUNDS.contains(18.0));
        assert!(!AGE_BOUNDS.contains(100.5));
    }
}
