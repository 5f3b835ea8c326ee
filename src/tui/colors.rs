//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::{Confidence, RiskTier};

/// Header, status bar and focused form fields.
pub const ACCENT: Color = Color::Rgb(255, 215, 0);
/// Text drawn on top of `ACCENT`.
pub const ON_ACCENT: Color = Color::Rgb(20, 20, 20);
pub const DARK_GREEN: Color = Color::Rgb(0, 120, 0);
pub const AMBER: Color = Color::Rgb(230, 150, 0);
pub const DARK_RED: Color = Color::Rgb(160, 20, 20);

pub fn risk_color(risk: RiskTier) -> Color {
    match risk {
        RiskTier::Low => DARK_GREEN,
        RiskTier::Medium => AMBER,
        RiskTier::High => DARK_RED,
    }
}

/// Color of the confidence dot next to a forecast.
pub fn confidence_color(level: Confidence) -> Color {
    match level {
        Confidence::High => Color::Green,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::Red,
    }
}
