//! Colour palette and text styles for the screening screens.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::RiskLevel;

/// Clinical theme: teal accents on the terminal's own background.
pub struct ClinicalTheme;

impl ClinicalTheme {
    pub const ACCENT: Color = Color::Rgb(13, 148, 136); // #0D9488
    pub const ACCENT_LIGHT: Color = Color::Rgb(45, 212, 191); // #2DD4BF
    pub const BORDER: Color = Color::Rgb(148, 163, 184); // #94A3B8

    /// Low risk banner
    pub const LOW_RISK: Color = Color::Rgb(16, 185, 129); // #10B981
    /// High risk banner, errors
    pub const HIGH_RISK: Color = Color::Rgb(244, 63, 94); // #F43F5E
    /// Model line
    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    pub const TEXT: Color = Color::Rgb(248, 250, 252); // #F8FAFC
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B
    pub const SELECTED_FG: Color = Color::Rgb(15, 23, 42); // #0F172A

    #[must_use]
    pub fn title() -> Style {
        Style::default().fg(Self::TEXT).add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::HIGH_RISK)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Value of the focused form row
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::SELECTED_FG)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Label of the focused form row
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Banner colour for a classification
    #[must_use]
    pub fn risk_level(level: RiskLevel) -> Style {
        match level {
            RiskLevel::Low => Style::default().fg(Self::LOW_RISK),
            RiskLevel::High => Self::danger(),
        }
    }
}
