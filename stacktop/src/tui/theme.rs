//! TUI color theme
//!
//! Green-on-black scheme for the dashboard, plus a warm palette for flame
//! graph boxes.

use ratatui::style::{Color, Modifier, Style};

pub const SIGNAL_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);

pub const STYLE_HEADING: Style = Style::new().fg(SIGNAL_GREEN).add_modifier(Modifier::BOLD);
pub const STYLE_LABEL: Style = Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD);
pub const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
pub const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
pub const STYLE_TEXT: Style = Style::new().fg(Color::White);
pub const STYLE_VALUE: Style = Style::new().fg(SIGNAL_GREEN);

const FLAME_PALETTE: [Color; 6] = [
    Color::Rgb(205, 60, 30),
    Color::Rgb(225, 110, 40),
    Color::Rgb(235, 150, 50),
    Color::Rgb(215, 85, 45),
    Color::Rgb(240, 180, 70),
    Color::Rgb(195, 100, 60),
];

/// Get severity color based on percentage threshold
/// - Above 40%: Critical (Red)
/// - Above 20%: Caution (Amber)
/// - Otherwise: Normal (Green)
#[must_use]
pub fn severity_color(percentage: f64) -> Color {
    if percentage > 40.0 {
        CRITICAL_RED
    } else if percentage > 20.0 {
        CAUTION_AMBER
    } else {
        SIGNAL_GREEN
    }
}

/// Stable flame color for a function name, so boxes keep their color across
/// refreshes.
#[must_use]
pub fn flame_color(name: &str) -> Color {
    let hash = name.bytes().fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(usize::from(b)));
    FLAME_PALETTE[hash % FLAME_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_color() {
        assert_eq!(severity_color(50.0), CRITICAL_RED);
        assert_eq!(severity_color(25.0), CAUTION_AMBER);
        assert_eq!(severity_color(5.0), SIGNAL_GREEN);
    }

    #[test]
    fn test_flame_color_is_stable() {
        assert_eq!(flame_color("main"), flame_color("main"));
    }
}
