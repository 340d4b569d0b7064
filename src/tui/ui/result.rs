//! Assessment result view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::{RiskAssessment, RiskLevel};
use crate::tui::styles::ClinicalTheme;

/// Result state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Completed with result
    Complete { assessment: RiskAssessment },
    /// Scoring failed
    Error { message: String },
}

/// Render the result screen
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_result_header(f, chunks[0]);
    match state {
        ResultState::Idle => render_idle(f, chunks[1]),
        ResultState::Complete { assessment } => render_assessment(f, chunks[1], assessment),
        ResultState::Error { message } => render_error(f, chunks[1], message),
    }
    render_result_footer(f, chunks[2], state);
}

fn render_result_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Risk Assessment", ClinicalTheme::title()),
        Span::styled(" │ Chronic Kidney Disease", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No assessment yet",
            ClinicalTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &RiskAssessment) {
    let block = Block::default()
        .title(Span::styled(" Prediction Result ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border_focused());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Headline
            Constraint::Length(3), // Probability
            Constraint::Length(2), // Model
            Constraint::Length(3), // Advice
            Constraint::Min(0),
        ])
        .margin(1)
        .split(inner);

    let headline = Paragraph::new(Line::from(Span::styled(
        assessment.headline(),
        ClinicalTheme::title(),
    )))
    .alignment(Alignment::Center);
    f.render_widget(headline, chunks[0]);

    let risk_style = ClinicalTheme::risk_level(assessment.risk_level);
    let percent = (assessment.probability * 100.0).round().clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .gauge_style(risk_style)
        .percent(percent)
        .label(assessment.percentage());
    f.render_widget(gauge, chunks[1]);

    let model = Paragraph::new(Line::from(Span::styled(
        assessment.model_line(),
        ClinicalTheme::info(),
    )))
    .alignment(Alignment::Center);
    f.render_widget(model, chunks[2]);

    let icon = match assessment.risk_level {
        RiskLevel::Low => "OK",
        RiskLevel::High => "!",
    };
    let advice = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{icon} "),
            risk_style.add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            assessment.risk_level.advice(),
            risk_style.add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(advice, chunks[3]);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Error", ClinicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, ClinicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_result_footer(f: &mut Frame, area: Rect, state: &ResultState) {
    let content = match state {
        ResultState::Error { .. } => Line::from(vec![
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Back to Form ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ]),
        _ => Line::from(vec![
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Edit Answers ", ClinicalTheme::key_desc()),
            Span::styled("[N] ", ClinicalTheme::key_hint()),
            Span::styled("New Patient ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}
