//! Patient questionnaire form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::patient::{
    AGE_BOUNDS, BMI_BOUNDS, DBP_BOUNDS, HEART_RATE_BOUNDS, SBP_BOUNDS,
};
use crate::domain::{
    Categorical, Condition, EducationLevel, Ethnicity, FeatureSchema, HealthcareAccess,
    NumericBounds, RawPatientInput, Sex, SocioeconomicStatus, YesNo,
};
use crate::tui::styles::ClinicalTheme;

/// Which answer a form row feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    Model,
    Age,
    Sex,
    Ethnicity,
    SocioeconomicStatus,
    EducationLevel,
    Condition(Condition),
    HealthcareAccess,
    SystolicBp,
    DiastolicBp,
    Bmi,
    HeartRate,
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Select box: one of `options`.
    Choice { options: Vec<String>, index: usize },
    /// Slider: `value` within `bounds`, with `typed` holding digits entered
    /// since the field was last committed.
    Numeric {
        bounds: NumericBounds,
        value: f64,
        typed: String,
    },
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub id: FieldId,
    pub label: &'static str,
    pub value: FieldValue,
}

impl FormField {
    fn choice(id: FieldId, label: &'static str, options: Vec<String>) -> Self {
        Self {
            id,
            label,
            value: FieldValue::Choice { options, index: 0 },
        }
    }

    fn labels<C: Categorical>(id: FieldId, label: &'static str) -> Self {
        Self::choice(
            id,
            label,
            C::labels().into_iter().map(str::to_string).collect(),
        )
    }

    fn numeric(id: FieldId, label: &'static str, bounds: NumericBounds) -> Self {
        Self {
            id,
            label,
            value: FieldValue::Numeric {
                bounds,
                value: bounds.default,
                typed: String::new(),
            },
        }
    }

    /// Text shown for the current value.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.value {
            FieldValue::Choice { options, index } => options[*index].clone(),
            FieldValue::Numeric { typed, .. } if !typed.is_empty() => typed.clone(),
            FieldValue::Numeric { bounds, value, .. } => format_numeric(*value, bounds.step),
        }
    }

    fn selected_label(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Choice { options, index } => Some(options[*index].as_str()),
            FieldValue::Numeric { .. } => None,
        }
    }

    fn numeric_value(&self) -> Option<f64> {
        match &self.value {
            FieldValue::Numeric { value, .. } => Some(*value),
            FieldValue::Choice { .. } => None,
        }
    }

    /// Move a choice by `delta` options (wrapping) or a slider by `delta`
    /// steps (saturating at the bounds).
    fn adjust(&mut self, delta: i32) {
        match &mut self.value {
            FieldValue::Choice { options, index } => {
                let len = options.len() as i32;
                *index = (*index as i32 + delta).rem_euclid(len) as usize;
            }
            FieldValue::Numeric {
                bounds,
                value,
                typed,
            } => {
                typed.zeroize();
                let next = *value + f64::from(delta) * bounds.step;
                // Snap to the step grid to keep 0.1 increments exact.
                let snapped = ((next - bounds.min) / bounds.step).round() * bounds.step + bounds.min;
                *value = bounds.clamp(snapped);
            }
        }
    }

    /// Apply typed digits, if any.
    fn commit(&mut self) -> Result<(), String> {
        let FieldValue::Numeric {
            bounds,
            value,
            typed,
        } = &mut self.value
        else {
            return Ok(());
        };
        if typed.is_empty() {
            return Ok(());
        }

        let result = match typed.parse::<f64>() {
            Ok(v) if bounds.accepts(v) => {
                *value = v;
                Ok(())
            }
            Ok(v) if bounds.contains(v) => Err(format!(
                "{}: Value must be a multiple of {}",
                self.label,
                format_numeric(bounds.step, bounds.step)
            )),
            Ok(_) => Err(format!(
                "{}: Value must be between {} and {}",
                self.label,
                format_numeric(bounds.min, bounds.step),
                format_numeric(bounds.max, bounds.step)
            )),
            Err(_) => Err(format!("{}: Invalid number", self.label)),
        };
        typed.zeroize();
        result
    }

    fn reset(&mut self) {
        match &mut self.value {
            FieldValue::Choice { index, .. } => *index = 0,
            FieldValue::Numeric {
                bounds,
                value,
                typed,
            } => {
                typed.zeroize();
                *value = bounds.default;
            }
        }
    }
}

fn format_numeric(value: f64, step: f64) -> String {
    if step < 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

/// Form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl PatientFormState {
    /// Build the rows a deployment needs: the model picker only when there is
    /// a choice to make, and whichever of ethnicity or education the schema
    /// consumes.
    #[must_use]
    pub fn new(schema: FeatureSchema, models: &[String]) -> Self {
        let mut fields = Vec::with_capacity(26);

        if models.len() > 1 {
            fields.push(FormField::choice(FieldId::Model, "Model", models.to_vec()));
        }
        fields.push(FormField::numeric(FieldId::Age, "Age", AGE_BOUNDS));
        fields.push(FormField::labels::<Sex>(FieldId::Sex, "Sex"));
        if schema.uses_ethnicity() {
            fields.push(FormField::labels::<Ethnicity>(FieldId::Ethnicity, "Ethnicity"));
        }
        fields.push(FormField::labels::<SocioeconomicStatus>(
            FieldId::SocioeconomicStatus,
            "Socioeconomic Status",
        ));
        if schema.uses_education() {
            fields.push(FormField::labels::<EducationLevel>(
                FieldId::EducationLevel,
                "Education Level",
            ));
        }
        for condition in Condition::ALL {
            fields.push(FormField::labels::<YesNo>(
                FieldId::Condition(condition),
                condition.label(),
            ));
        }
        fields.push(FormField::labels::<HealthcareAccess>(
            FieldId::HealthcareAccess,
            "Access to Healthcare",
        ));
        fields.push(FormField::numeric(FieldId::SystolicBp, "Systolic BP", SBP_BOUNDS));
        fields.push(FormField::numeric(FieldId::DiastolicBp, "Diastolic BP", DBP_BOUNDS));
        fields.push(FormField::numeric(FieldId::Bmi, "BMI", BMI_BOUNDS));
        fields.push(FormField::numeric(FieldId::HeartRate, "Heart Rate", HEART_RATE_BOUNDS));

        Self {
            fields,
            selected_field: 0,
            error_message: None,
        }
    }

    fn leave_field(&mut self) {
        if let Err(e) = self.fields[self.selected_field].commit() {
            self.error_message = Some(e);
        }
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.leave_field();
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        self.leave_field();
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Cycle a choice or nudge a slider by `delta` steps.
    pub fn adjust(&mut self, delta: i32) {
        self.fields[self.selected_field].adjust(delta);
        self.error_message = None;
    }

    /// Type into a slider field. A decimal point is only taken by fields
    /// whose step is fractional.
    pub fn input_char(&mut self, c: char) {
        if let FieldValue::Numeric { bounds, typed, .. } =
            &mut self.fields[self.selected_field].value
        {
            let point = c == '.' && bounds.fractional() && !typed.contains('.');
            if c.is_ascii_digit() || point {
                typed.push(c);
                self.error_message = None;
            }
        }
    }

    /// Delete the last typed character
    pub fn delete_char(&mut self) {
        if let FieldValue::Numeric { typed, .. } = &mut self.fields[self.selected_field].value {
            typed.pop();
        }
    }

    /// Restore the current field to its default.
    pub fn reset_field(&mut self) {
        self.fields[self.selected_field].reset();
        self.error_message = None;
    }

    /// Wipe typed buffers and restore every default.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            field.reset();
        }
        if let Some(message) = self.error_message.as_mut() {
            message.zeroize();
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    fn find(&self, id: FieldId) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    fn label_of(&self, id: FieldId) -> Option<String> {
        self.find(id)
            .and_then(FormField::selected_label)
            .map(str::to_string)
    }

    fn number_of(&self, id: FieldId) -> f64 {
        self.find(id)
            .and_then(FormField::numeric_value)
            .unwrap_or_default()
    }

    /// Selected model, if the form offers a picker.
    #[must_use]
    pub fn selected_model(&self) -> Option<String> {
        self.label_of(FieldId::Model)
    }

    /// Commit pending typing and collect the answers.
    ///
    /// # Errors
    /// Returns a message naming the first field whose typed value is unusable.
    pub fn to_patient_input(&mut self) -> Result<RawPatientInput, String> {
        for field in &mut self.fields {
            field.commit()?;
        }

        let mut input = RawPatientInput {
            age: self.number_of(FieldId::Age),
            sex: self.label_of(FieldId::Sex).unwrap_or_default(),
            ethnicity: self.label_of(FieldId::Ethnicity),
            socioeconomic_status: self
                .label_of(FieldId::SocioeconomicStatus)
                .unwrap_or_default(),
            education_level: self.label_of(FieldId::EducationLevel),
            healthcare_access: self.label_of(FieldId::HealthcareAccess).unwrap_or_default(),
            systolic_bp: self.number_of(FieldId::SystolicBp),
            diastolic_bp: self.number_of(FieldId::DiastolicBp),
            bmi: self.number_of(FieldId::Bmi),
            heart_rate: self.number_of(FieldId::HeartRate),
            ..RawPatientInput::default()
        };
        for condition in Condition::ALL {
            if let Some(answer) = self.label_of(FieldId::Condition(condition)) {
                input.conditions.set(condition, answer);
            }
        }
        Ok(input)
    }
}

/// Render the questionnaire
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Chronic Kidney Disease (CKD) Risk Predictor", ClinicalTheme::title()),
        Span::styled(" │ Enter patient information", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let lines: Vec<Line> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let is_selected = offset + i == selected;
            let label_style = if is_selected {
                ClinicalTheme::focused()
            } else {
                ClinicalTheme::text_secondary()
            };
            let value_style = if is_selected {
                ClinicalTheme::selected()
            } else {
                ClinicalTheme::text()
            };

            Line::from(vec![
                Span::styled(if is_selected { "▶ " } else { "  " }, ClinicalTheme::key_hint()),
                Span::styled(format!("{:<26}", field.label), label_style),
                Span::styled("◀ ", ClinicalTheme::text_muted()),
                Span::styled(field.display(), value_style),
                Span::styled(" ▶", ClinicalTheme::text_muted()),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[←→] ", ClinicalTheme::key_hint()),
            Span::styled("Change ", ClinicalTheme::key_desc()),
            Span::styled("[PgUp/PgDn] ", ClinicalTheme::key_hint()),
            Span::styled("×10 ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Predict CKD Risk ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}
