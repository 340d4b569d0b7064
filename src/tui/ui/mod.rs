//! UI module: View components for the TUI.

pub mod form;
pub mod result;

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::ClinicalTheme;

pub const FOOTER: &str = "Part of the NCD Risk Suite";

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "DISCLAIMER: This tool provides indicative estimates and does not replace professional medical evaluation.",
            ClinicalTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(FOOTER, ClinicalTheme::text_secondary())])
            .alignment(Alignment::Center),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(ClinicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
