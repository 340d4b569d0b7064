//! TUI module: Terminal User Interface using Ratatui.
//!
//! One questionnaire screen and one result screen, with a disclaimer footer.

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::ClinicalTheme;
