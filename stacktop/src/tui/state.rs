//! UI-only state and the RUNNING/PAUSED state machine.
//!
//! Nothing here touches the session. [`UiState::apply`] turns a [`Command`]
//! into a state change plus an [`Effect`] telling the render loop what to do
//! next.

use super::keymap::Command;

/// Step for the `+`/`-` threshold keys, in percent.
pub const THRESHOLD_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

/// Follow-up work for the render loop after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed
    None,
    /// Redraw with the current display model
    Redraw,
    /// Rebuild the display model from the held snapshot, then redraw
    Rebuild,
    /// Load the latest snapshot, rebuild and redraw
    Refresh,
    /// Save the held snapshot to a file
    Save,
    Quit,
}

/// What the state machine needs to know about the current data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewContext {
    pub thread_count: usize,
    /// Rows (or flame levels) in the current display model
    pub row_count: usize,
    /// Rows visible at once
    pub page: usize,
    /// The sample source has ended
    pub stopped: bool,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub run_state: RunState,
    /// Full call tree instead of the last stack
    pub full: bool,
    /// Every node sorted by total instead of the last stack
    pub sorted: bool,
    /// Flame graph instead of rows
    pub graph: bool,
    /// Minimum %TOTAL for a row to be shown
    pub threshold: f64,
    /// Index into the session's thread order
    pub selected: usize,
    pub scroll: usize,
    pub help: bool,
    pub notification: Option<String>,
}

impl UiState {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            run_state: RunState::Running,
            full: false,
            sorted: false,
            graph: false,
            threshold: threshold.clamp(0.0, 100.0),
            selected: 0,
            scroll: 0,
            help: false,
            notification: None,
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
    }

    /// Keep selection and scroll inside the data, which may have shrunk
    /// (first samples, narrower threshold).
    pub fn clamp(&mut self, ctx: &ViewContext) {
        self.selected = self.selected.min(ctx.thread_count.saturating_sub(1));
        self.scroll = self.scroll.min(max_scroll(ctx));
    }

    pub fn apply(&mut self, command: Command, ctx: &ViewContext) -> Effect {
        // any key dismisses the help overlay
        if self.help {
            self.help = false;
            return Effect::Redraw;
        }

        match command {
            Command::Quit => Effect::Quit,
            Command::Help => {
                self.help = true;
                Effect::Redraw
            }
            Command::Save => Effect::Save,
            Command::PlayPause => self.toggle_pause(ctx),
            Command::ToggleFull => {
                // the flame graph always shows the whole tree
                if self.graph {
                    return Effect::None;
                }
                self.full = !self.full;
                self.scroll = 0;
                Effect::Rebuild
            }
            Command::ToggleTable => {
                // only switches the non-tree row view
                if self.graph || self.full {
                    return Effect::None;
                }
                self.sorted = !self.sorted;
                self.scroll = 0;
                Effect::Rebuild
            }
            Command::ToggleGraph => {
                self.graph = !self.graph;
                self.scroll = 0;
                Effect::Rebuild
            }
            Command::PrevThread => self.select(self.selected.saturating_sub(1), ctx),
            Command::NextThread => self.select(self.selected + 1, ctx),
            Command::ThresholdUp => self.set_threshold(self.threshold + THRESHOLD_STEP),
            Command::ThresholdDown => self.set_threshold(self.threshold - THRESHOLD_STEP),
            Command::ScrollUp => self.scroll_to(self.scroll.saturating_sub(1), ctx),
            Command::ScrollDown => self.scroll_to(self.scroll + 1, ctx),
            Command::PageUp => self.scroll_to(self.scroll.saturating_sub(ctx.page.max(1)), ctx),
            Command::PageDown => self.scroll_to(self.scroll + ctx.page.max(1), ctx),
            Command::Home => self.scroll_to(0, ctx),
            Command::End => self.scroll_to(max_scroll(ctx), ctx),
        }
    }

    fn toggle_pause(&mut self, ctx: &ViewContext) -> Effect {
        if ctx.stopped {
            return Effect::None;
        }
        match self.run_state {
            RunState::Running => {
                self.run_state = RunState::Paused;
                self.notify("Paused");
                Effect::Redraw
            }
            RunState::Paused => {
                self.run_state = RunState::Running;
                self.notify("Resumed");
                Effect::Refresh
            }
        }
    }

    fn select(&mut self, index: usize, ctx: &ViewContext) -> Effect {
        let index = index.min(ctx.thread_count.saturating_sub(1));
        if index == self.selected {
            return Effect::None;
        }
        self.selected = index;
        self.scroll = 0;
        Effect::Rebuild
    }

    fn set_threshold(&mut self, threshold: f64) -> Effect {
        let threshold = threshold.clamp(0.0, 100.0);
        if (threshold - self.threshold).abs() < f64::EPSILON {
            return Effect::None;
        }
        self.threshold = threshold;
        Effect::Rebuild
    }

    fn scroll_to(&mut self, offset: usize, ctx: &ViewContext) -> Effect {
        let offset = offset.min(max_scroll(ctx));
        if offset == self.scroll {
            return Effect::None;
        }
        self.scroll = offset;
        Effect::Redraw
    }
}

fn max_scroll(ctx: &ViewContext) -> usize {
    ctx.row_count.saturating_sub(ctx.page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ViewContext {
        ViewContext { thread_count: 3, row_count: 50, page: 20, stopped: false }
    }

    #[test]
    fn test_pause_and_resume() {
        let mut state = UiState::new(0.0);
        assert_eq!(state.apply(Command::PlayPause, &ctx()), Effect::Redraw);
        assert!(state.is_paused());
        assert_eq!(state.notification.as_deref(), Some("Paused"));

        assert_eq!(state.apply(Command::PlayPause, &ctx()), Effect::Refresh);
        assert_eq!(state.run_state, RunState::Running);
        assert_eq!(state.notification.as_deref(), Some("Resumed"));
    }

    #[test]
    fn test_pause_disabled_once_stopped() {
        let mut state = UiState::new(0.0);
        let stopped = ViewContext { stopped: true, ..ctx() };
        assert_eq!(state.apply(Command::PlayPause, &stopped), Effect::None);
        assert!(!state.is_paused());
    }

    #[test]
    fn test_toggles_do_not_touch_run_state() {
        let mut state = UiState::new(0.0);
        state.apply(Command::PlayPause, &ctx());
        state.apply(Command::ToggleGraph, &ctx());
        state.apply(Command::NextThread, &ctx());
        assert!(state.is_paused());
    }

    #[test]
    fn test_full_ignored_in_graph_mode() {
        let mut state = UiState::new(0.0);
        assert_eq!(state.apply(Command::ToggleFull, &ctx()), Effect::Rebuild);
        assert!(state.full);
        state.apply(Command::ToggleGraph, &ctx());
        assert_eq!(state.apply(Command::ToggleFull, &ctx()), Effect::None);
        assert!(state.full);
    }

    #[test]
    fn test_sorted_table_only_from_row_view() {
        let mut state = UiState::new(0.0);
        state.scroll = 5;
        assert_eq!(state.apply(Command::ToggleTable, &ctx()), Effect::Rebuild);
        assert!(state.sorted);
        assert_eq!(state.scroll, 0);

        state.apply(Command::ToggleFull, &ctx());
        assert_eq!(state.apply(Command::ToggleTable, &ctx()), Effect::None);
        state.apply(Command::ToggleFull, &ctx());
        state.apply(Command::ToggleGraph, &ctx());
        assert_eq!(state.apply(Command::ToggleTable, &ctx()), Effect::None);
        assert!(state.sorted);
    }

    #[test]
    fn test_thread_selection_clamped() {
        let mut state = UiState::new(0.0);
        assert_eq!(state.apply(Command::PrevThread, &ctx()), Effect::None);
        state.apply(Command::NextThread, &ctx());
        state.apply(Command::NextThread, &ctx());
        assert_eq!(state.apply(Command::NextThread, &ctx()), Effect::None);
        assert_eq!(state.selected, 2);
    }

    #[test]
    fn test_threshold_steps_and_clamps() {
        let mut state = UiState::new(99.5);
        assert_eq!(state.apply(Command::ThresholdUp, &ctx()), Effect::Rebuild);
        assert!((state.threshold - 100.0).abs() < f64::EPSILON);
        assert_eq!(state.apply(Command::ThresholdUp, &ctx()), Effect::None);

        let mut state = UiState::new(0.0);
        assert_eq!(state.apply(Command::ThresholdDown, &ctx()), Effect::None);
    }

    #[test]
    fn test_scrolling_bounds() {
        let mut state = UiState::new(0.0);
        state.apply(Command::End, &ctx());
        assert_eq!(state.scroll, 30);
        state.apply(Command::PageDown, &ctx());
        assert_eq!(state.scroll, 30);
        state.apply(Command::PageUp, &ctx());
        assert_eq!(state.scroll, 10);
        state.apply(Command::Home, &ctx());
        assert_eq!(state.scroll, 0);
    }

    #[test]
    fn test_help_closes_on_any_key() {
        let mut state = UiState::new(0.0);
        state.apply(Command::Help, &ctx());
        assert!(state.help);
        assert_eq!(state.apply(Command::Quit, &ctx()), Effect::Redraw);
        assert!(!state.help);
        assert_eq!(state.apply(Command::Quit, &ctx()), Effect::Quit);
    }

    #[test]
    fn test_clamp_after_data_shrinks() {
        let mut state = UiState::new(0.0);
        state.selected = 5;
        state.scroll = 40;
        state.clamp(&ctx());
        assert_eq!((state.selected, state.scroll), (2, 30));
    }
}
