//! Responsive layout engine for the TUI.
//!
//! Adapts the layout based on terminal dimensions so the statistics stay
//! usable from minimal terminals (40x10) up to full screen.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

// Width breakpoints
const WIDTH_NARROW: u16 = 80; // Below this: plots stacked, no side-by-side

// Height breakpoints
const HEIGHT_MINIMAL: u16 = 14; // Below this: header line + data only
const HEIGHT_COMPACT: u16 = 24; // Below this: hide the plots

/// Computed layout configuration based on terminal dimensions.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LayoutConfig {
    /// Rows used by the header panel (borders included)
    pub header_height: u16,

    /// Whether to show the CPU and memory plots
    pub show_plots: bool,

    /// Stack the two plots vertically instead of side by side
    pub stacked_plots: bool,

    /// Whether to show the key hint bar (bottom)
    pub show_status_bar: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header_height: 5,
            show_plots: true,
            stacked_plots: false,
            show_status_bar: true,
        }
    }
}

/// Screen regions; absent panels get an empty rect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Regions {
    pub header: Rect,
    pub cpu_plot: Rect,
    pub mem_plot: Rect,
    pub data: Rect,
    pub notification: Rect,
    pub status_bar: Rect,
}

impl LayoutConfig {
    /// Split `area` into the dashboard regions.
    #[must_use]
    pub fn split(&self, area: Rect) -> Regions {
        let plots_height = match (self.show_plots, self.stacked_plots) {
            (false, _) => 0,
            (true, false) => 5,
            (true, true) => 8,
        };
        let status_height = u16::from(self.show_status_bar);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.header_height),
                Constraint::Length(plots_height),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(status_height),
            ])
            .split(area);

        let (cpu_plot, mem_plot) = if self.show_plots {
            let direction =
                if self.stacked_plots { Direction::Vertical } else { Direction::Horizontal };
            let plots = Layout::default()
                .direction(direction)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[1]);
            (plots[0], plots[1])
        } else {
            (Rect::default(), Rect::default())
        };

        Regions {
            header: rows[0],
            cpu_plot,
            mem_plot,
            data: rows[2],
            notification: rows[3],
            status_bar: rows[4],
        }
    }
}

/// Compute layout configuration based on terminal dimensions.
///
/// # Breakpoints
///
/// | Terminal Size | Behavior |
/// |---------------|----------|
/// | Width < 80    | Plots stacked vertically |
/// | Height < 14   | Minimal: one-line header, no plots, no status bar |
/// | Height 14-24  | Compact: hide plots |
/// | Height > 24   | Full layout |
#[must_use]
pub fn compute_layout(width: u16, height: u16) -> LayoutConfig {
    let mut config = LayoutConfig::default();

    if width < WIDTH_NARROW {
        config.stacked_plots = true;
    }

    if height < HEIGHT_MINIMAL {
        config.header_height = 1;
        config.show_plots = false;
        config.show_status_bar = false;
    } else if height <= HEIGHT_COMPACT
        || (config.stacked_plots && height <= HEIGHT_COMPACT + 4)
    {
        config.show_plots = false;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_layout() {
        let config = compute_layout(120, 40);
        assert_eq!(config.header_height, 5);
        assert!(config.show_plots);
        assert!(!config.stacked_plots);
        assert!(config.show_status_bar);
    }

    #[test]
    fn test_narrow_layout_stacks_plots() {
        let config = compute_layout(60, 40);
        assert!(config.stacked_plots);
        assert!(config.show_plots);
    }

    #[test]
    fn test_minimal_height() {
        let config = compute_layout(120, 12);
        assert!(!config.show_plots);
        assert_eq!(config.header_height, 1);
        assert!(!config.show_status_bar);
    }

    #[test]
    fn test_compact_height() {
        let config = compute_layout(120, 20);
        assert_eq!(config.header_height, 5);
        assert!(!config.show_plots);
        assert!(config.show_status_bar);
    }

    #[test]
    fn test_split_gives_data_the_rest() {
        let regions = compute_layout(120, 40).split(Rect::new(0, 0, 120, 40));
        assert_eq!(regions.header.height, 5);
        assert_eq!(regions.cpu_plot.width + regions.mem_plot.width, 120);
        assert_eq!(regions.data.height, 40 - 5 - 5 - 1 - 1);
        assert_eq!(regions.status_bar.height, 1);
    }
}
