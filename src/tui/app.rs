//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation between the form and the result
//! - Input event handling
//! - Synchronous assessment on submit

use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::artifacts::load_artifacts;
use crate::application::AssessmentService;
use crate::config::{AppConfig, MODEL_PATH_ENV};

use super::ui::{
    form::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result, ResultState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    service: AssessmentService,
    form_state: PatientFormState,
    result_state: ResultState,
}

impl App {
    /// Load and verify the configured artifacts and build the application.
    ///
    /// # Errors
    /// Returns error if the artifacts are missing, unverifiable, or unusable.
    /// The application refuses to start without a working model.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let model_dir = config.model_path.as_path();
        if !model_dir.exists() {
            return Err(anyhow!(
                "Model path not found at {:?}. Set {MODEL_PATH_ENV} to a directory containing catalog.json.",
                model_dir
            ));
        }

        let verification = config.verification()?;
        let artifacts = load_artifacts(model_dir, &verification)
            .with_context(|| format!("Failed to load model artifacts from {model_dir:?}"))?;
        let service = AssessmentService::from_artifacts(artifacts)?;

        Ok(Self::with_service(service))
    }

    /// Create application with an injected service (Composition Root pattern).
    #[must_use]
    pub fn with_service(service: AssessmentService) -> Self {
        let models: Vec<String> = service.model_names().map(str::to_string).collect();
        let form_state = PatientFormState::new(service.schema(), &models);

        Self {
            screen: Screen::Form,
            should_quit: false,
            service,
            form_state,
            result_state: ResultState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        // Answers do not outlive the session.
        self.form_state.clear_sensitive();
        self.result_state = ResultState::Idle;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Form => render_patient_form(f, chunks[0], &self.form_state),
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Form => self.handle_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Left => self.form_state.adjust(-1),
            KeyCode::Right => self.form_state.adjust(1),
            KeyCode::PageDown => self.form_state.adjust(-10),
            KeyCode::PageUp => self.form_state.adjust(10),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.reset_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.screen = Screen::Form,
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form_state.clear_sensitive();
                self.result_state = ResultState::Idle;
                self.screen = Screen::Form;
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let input = match self.form_state.to_patient_input() {
            Ok(input) => input,
            Err(e) => {
                self.form_state.error_message = Some(e);
                return;
            }
        };
        if let Err(errors) = input.validate() {
            self.form_state.error_message = Some(errors.join(", "));
            return;
        }

        let model = self
            .form_state
            .selected_model()
            .unwrap_or_else(|| self.service.default_model().to_string());

        match self.service.assess(&input, &model) {
            Ok(assessment) => {
                self.form_state.error_message = None;
                self.result_state = ResultState::Complete { assessment };
                self.screen = Screen::Result;
            }
            Err(e) if e.is_input_error() => {
                self.form_state.error_message = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!("Assessment failed: {}", e);
                self.result_state = ResultState::Error {
                    message: e.to_string(),
                };
                self.screen = Screen::Result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::{fixtures, Verification};
    use crate::domain::RiskLevel;
    use tempfile::tempdir;

    fn picker_app() -> App {
        let temp = tempdir().unwrap();
        fixtures::write_picker_set(temp.path());
        let artifacts = load_artifacts(temp.path(), &Verification::Unsigned).unwrap();
        App::with_service(AssessmentService::from_artifacts(artifacts).unwrap())
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn completed(app: &App) -> &crate::domain::RiskAssessment {
        match &app.result_state {
            ResultState::Complete { assessment } => assessment,
            other => panic!("expected a completed assessment, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_defaults_with_first_model() {
        let mut app = picker_app();
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Result);
        let assessment = completed(&app);
        assert_eq!(assessment.model_name, "Logistic Regression");
        assert!(assessment.scaled);
    }

    #[test]
    fn test_picker_selects_model() {
        let mut app = picker_app();
        // Model row is first; move to Random Forest.
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);

        let assessment = completed(&app);
        assert_eq!(assessment.model_name, "Random Forest");
        assert!(!assessment.scaled);
        // Age 45 falls in the low-risk leaf.
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_typed_age_changes_outcome() {
        let mut app = picker_app();
        press(&mut app, KeyCode::Right); // Random Forest
        press(&mut app, KeyCode::Down); // Age
        press(&mut app, KeyCode::Char('7'));
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(completed(&app).risk_level, RiskLevel::High);
    }

    #[test]
    fn test_invalid_typing_stays_on_form() {
        let mut app = picker_app();
        press(&mut app, KeyCode::Down); // Age
        press(&mut app, KeyCode::Char('5'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Form);
        assert!(app.form_state.error_message.is_some());
    }

    #[test]
    fn test_result_navigation() {
        let mut app = picker_app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Form);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen, Screen::Form);
        assert!(matches!(app.result_state, ResultState::Idle));

        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_q_quits() {
        let mut app = picker_app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn test_missing_model_dir_is_fatal() {
        let config = AppConfig {
            model_path: "/nonexistent/ckd/models".into(),
            log_mode: crate::config::LogMode::Stdout,
            log_file: "ckd-risk.log".into(),
            pubkey_b64: None,
            pubkey_file: None,
            allow_unsigned: true,
        };
        let err = App::new(&config).err().expect("startup must fail");
        assert!(err.to_string().contains("Model path not found"));
    }
}
