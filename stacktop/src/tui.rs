//! # Terminal User Interface (TUI)
//!
//! Live dashboard drawn with `ratatui`:
//!
//! ```text
//! ┌ stacktop ────────────────────────────────────────────────────┐
//! │ PID 4242 | python app.py | Python 3.12.1                     │
//! │ THREAD 1/3 4242:4243 | 01'12" | 7200 samples | ...  RUNNING  │
//! └──────────────────────────────────────────────────────────────┘
//! ┌ CPU ─────────────────────────┐┌ MEM ─────────────────────────┐
//! │ ▂▃▅▇█▇▅▃                     ││ ▁▁▂▂▃▃▄▄                     │
//! └──────────────────────────────┘└──────────────────────────────┘
//! ┌ Stats ───────────────────────────────────────────────────────┐
//! │ OWN     TOTAL   %OWN  %TOTAL FUNCTION                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Render loop
//!
//! One thread polls the keyboard with a timeout that ends at the next tick.
//! On each tick while RUNNING it loads the latest published session, feeds
//! the metrics tracker and rebuilds the display model for the selected
//! thread. While PAUSED the held session stays on screen; ingestion carries
//! on untouched. Keys are handled in either state and redraw immediately.
//!
//! ## Sub-Modules
//!
//! - `keymap` - Key bindings
//! - `state` - UI-only state and the RUNNING/PAUSED machine
//! - `widgets` - Drawable panels
//! - `layout` - Size breakpoints
//! - `theme` - Color scheme

// TUI rendering intentionally uses precision-losing casts and long functions for clarity
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::too_many_lines,
    clippy::needless_pass_by_value
)]

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use crossbeam_channel::Sender;
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    Terminal,
};

pub mod keymap;
pub mod layout;
pub mod state;
pub mod theme;
pub mod widgets;

use keymap::{key_label, Command, KeyMap};
use layout::{compute_layout, LayoutConfig};
use state::{Effect, UiState, ViewContext};
use theme::{
    CAUTION_AMBER, CRITICAL_RED, SIGNAL_GREEN, INFO_DIM, STYLE_DIM, STYLE_HEADING, STYLE_KEY,
    STYLE_LABEL, STYLE_TEXT, STYLE_VALUE,
};
use widgets::{Widget, WidgetId};

use crate::aggregation::Session;
use crate::analysis::{snapshot, DisplayModel, MetricsTracker, ViewKind};
use crate::cli::{Config, SaveFormat};
use crate::domain::{fmt_mem, fmt_time, ProfileMode, TuiError};
use crate::export::save_snapshot;
use crate::profiling::{SharedState, SystemProbe, UiRequest};

/// Longest a key poll may block, so shutdown is noticed between ticks.
const POLL_CAP: Duration = Duration::from_millis(100);

// =============================================================================
// TERMINAL GUARD
// =============================================================================

/// Raw mode plus the alternate screen, restored on drop whatever the exit
/// path (quit, error, panic unwinding through the render thread).
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode().map_err(|e| TuiError::TerminalError(e.to_string()))?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(TuiError::TerminalError(e.to_string()));
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                Err(TuiError::TerminalError(e.to_string()))
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

// =============================================================================
// APP
// =============================================================================

struct App {
    shared: Arc<SharedState>,
    probe: SystemProbe,
    /// Point the probe at the first sampled pid when none was given
    follow_sampled_pid: bool,
    keys: KeyMap,
    mode: ProfileMode,
    stale_after: Duration,
    save_format: SaveFormat,
    save_dir: std::path::PathBuf,

    state: UiState,
    /// Session on screen; only replaced while RUNNING
    session: Arc<Session>,
    tracker: MetricsTracker,
    model: DisplayModel,

    layout: LayoutConfig,
    /// Columns available to the flame graph
    flame_width: usize,
    /// Data rows visible at once
    page: usize,
}

impl App {
    fn new(config: &Config, shared: Arc<SharedState>, probe: SystemProbe) -> Self {
        let session = shared.load();
        let tracker = MetricsTracker::new(config.history, probe.cores());
        Self {
            shared,
            probe,
            follow_sampled_pid: config.source.is_live(),
            keys: KeyMap::default(),
            mode: config.mode,
            stale_after: config.stale_after,
            save_format: config.save_format,
            save_dir: config.save_dir.clone(),
            state: UiState::new(config.threshold),
            session,
            tracker,
            model: DisplayModel::LastStack(Vec::new()),
            layout: LayoutConfig::default(),
            flame_width: 0,
            page: 0,
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.layout = compute_layout(width, height);
        let data = self.layout.split(Rect::new(0, 0, width, height)).data;
        self.flame_width = data.width.saturating_sub(2) as usize;
        // borders and the table header
        self.page = data.height.saturating_sub(3) as usize;
    }

    fn context(&self) -> ViewContext {
        ViewContext {
            thread_count: self.session.thread_order().len(),
            row_count: self.model.row_count(),
            page: self.page,
            stopped: self.session.is_stopped(),
        }
    }

    /// Timer tick while RUNNING.
    fn tick(&mut self, now: Instant) {
        self.session = self.shared.load();
        let first_pid = self.session.thread_order().first().map(|key| key.pid.0);
        if let Some(pid) = first_pid.filter(|_| self.follow_sampled_pid) {
            self.probe.target_if_unset(pid);
        }
        let rss = self.probe.rss();
        self.tracker.tick(&self.session, rss, now);
        self.rebuild();
    }

    fn refresh(&mut self) {
        self.session = self.shared.load();
        self.rebuild();
    }

    fn view_kind(&self) -> ViewKind {
        if self.state.graph {
            ViewKind::Flame { width: self.flame_width }
        } else if self.state.full {
            ViewKind::FullTree
        } else if self.state.sorted {
            ViewKind::Table
        } else {
            ViewKind::LastStack
        }
    }

    /// Rebuild the display model for the selected thread from the held
    /// session.
    fn rebuild(&mut self) {
        // selection must be valid before it is used
        let threads = self.session.thread_order().len();
        self.state.selected = self.state.selected.min(threads.saturating_sub(1));

        let view = self.view_kind();
        self.model = self
            .session
            .thread_order()
            .get(self.state.selected)
            .and_then(|key| self.session.thread(*key))
            .map_or_else(
                || DisplayModel::LastStack(Vec::new()),
                |thread| snapshot(thread, self.mode, self.state.threshold, view),
            );
        let ctx = self.context();
        self.state.clamp(&ctx);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if self.state.help {
            self.state.help = false;
            return Effect::Redraw;
        }
        let Some(command) = self.keys.lookup(key) else { return Effect::None };

        let ctx = self.context();
        let effect = self.state.apply(command, &ctx);
        match effect {
            Effect::Rebuild => self.rebuild(),
            Effect::Refresh => self.refresh(),
            Effect::Save => self.save(),
            Effect::None | Effect::Redraw | Effect::Quit => {}
        }
        effect
    }

    /// Save the session on screen, which is the frozen one while PAUSED.
    fn save(&mut self) {
        let unix_secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        let pid = self
            .probe
            .target()
            .or_else(|| self.session.thread_order().first().map(|key| key.pid.0))
            .unwrap_or_else(std::process::id);

        match save_snapshot(&self.session, self.mode, self.save_format, &self.save_dir, unix_secs, pid)
        {
            Ok(path) => {
                info!("Snapshot saved to {}", path.display());
                self.state.notify(format!("Saved as {}", path.display()));
            }
            Err(e) => {
                warn!("Snapshot save failed: {e}");
                self.state.notify(format!("Failed to save: {e}"));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Drawing
    // -------------------------------------------------------------------------

    fn status_indicator(&self, now: Instant) -> Span<'static> {
        let bold = Modifier::BOLD;
        if self.session.is_stopped() {
            Span::styled("STOPPED", Style::new().fg(CRITICAL_RED).add_modifier(bold))
        } else if self.state.is_paused() {
            Span::styled("PAUSED", Style::new().fg(CAUTION_AMBER).add_modifier(bold))
        } else if self.session.is_stale(self.stale_after, now) {
            Span::styled("STALE", Style::new().fg(CAUTION_AMBER).add_modifier(bold))
        } else {
            Span::styled("RUNNING", Style::new().fg(SIGNAL_GREEN).add_modifier(bold))
        }
    }

    fn header_lines(&self, now: Instant) -> (Line<'static>, Line<'static>, Line<'static>) {
        let sep = || Span::styled(" | ", STYLE_DIM);
        let session = &self.session;
        let key = session.thread_order().get(self.state.selected).copied();
        let process = key.and_then(|k| session.process(k.pid));

        let pid = key.map_or_else(|| "---".to_string(), |k| k.pid.to_string());
        let cmd = process
            .and_then(|p| p.command_line.as_deref())
            .unwrap_or("<waiting for samples>")
            .to_string();
        let python = process
            .and_then(|p| p.interpreter.as_deref())
            .or_else(|| session.metadata_value("python"))
            .unwrap_or("?")
            .to_string();

        let identity = Line::from(vec![
            Span::styled("PID ", STYLE_LABEL),
            Span::styled(pid, STYLE_VALUE),
            sep(),
            Span::styled(cmd, STYLE_TEXT),
            sep(),
            Span::styled("Python ", STYLE_LABEL),
            Span::styled(python, STYLE_VALUE),
        ]);

        let thread_pos = if key.is_some() {
            format!("{}/{}", self.state.selected + 1, session.thread_order().len())
        } else {
            "0/0".to_string()
        };
        let thread_id = key.map_or_else(String::new, |k| format!(" {k}"));
        let progress = Line::from(vec![
            Span::styled("THREAD ", STYLE_LABEL),
            Span::styled(thread_pos, STYLE_VALUE),
            Span::styled(thread_id, STYLE_TEXT),
            sep(),
            Span::styled(fmt_time(session.elapsed().as_micros() as u64), STYLE_VALUE),
            sep(),
            Span::styled(format!("{} samples", session.samples), STYLE_VALUE),
            Span::styled(
                format!(" ({} bad, {:.1}%)", session.invalid, session.error_rate()),
                STYLE_DIM,
            ),
            sep(),
            self.status_indicator(now),
        ]);

        let view = match self.view_kind() {
            ViewKind::Flame { .. } => "FLAME",
            ViewKind::FullTree => "TREE",
            ViewKind::Table => "TABLE",
            ViewKind::LastStack => "STACK",
        };
        let cpu = self.tracker.cpu.latest().unwrap_or(0.0);
        let mem = self.tracker.memory.latest().unwrap_or(0);
        let usage = Line::from(vec![
            Span::styled("CPU ", STYLE_LABEL),
            Span::styled(format!("{cpu:5.1}%"), Style::new().fg(theme::severity_color(cpu))),
            sep(),
            Span::styled("MEM ", STYLE_LABEL),
            Span::styled(fmt_mem(mem), STYLE_VALUE),
            sep(),
            Span::styled("MODE ", STYLE_LABEL),
            Span::styled(self.mode.label(), STYLE_VALUE),
            sep(),
            Span::styled("THRESHOLD ", STYLE_LABEL),
            Span::styled(format!("{:.0}%", self.state.threshold), STYLE_VALUE),
            sep(),
            Span::styled(view, STYLE_VALUE),
        ]);

        (identity, progress, usage)
    }

    fn stats_widget(&self) -> Widget<'_> {
        let title = match &self.model {
            DisplayModel::LastStack(_) => format!(" {} (last stack) ", self.mode.label()),
            DisplayModel::Table(_) => format!(" {} (all frames) ", self.mode.label()),
            DisplayModel::FullTree(_) => format!(" {} (full tree) ", self.mode.label()),
            DisplayModel::Flame(_) => format!(" {} (flame graph) ", self.mode.label()),
        };
        let content = match &self.model {
            DisplayModel::LastStack(rows) | DisplayModel::Table(rows) => Widget::Table { rows, mode: self.mode, tree: false },
            DisplayModel::FullTree(rows) => Widget::Table { rows, mode: self.mode, tree: true },
            DisplayModel::Flame(rects) => Widget::FlameGraph { rects },
        };
        content.scrolled(self.state.scroll).boxed(title, Style::new().fg(SIGNAL_GREEN))
    }

    fn draw(&self, f: &mut ratatui::Frame, now: Instant) {
        let regions = self.layout.split(f.area());
        let (identity, progress, usage) = self.header_lines(now);

        let header = if self.layout.header_height > 1 {
            Widget::Label(vec![identity, progress, usage])
                .boxed(WidgetId::Header.title(), Style::new().fg(SIGNAL_GREEN))
        } else {
            Widget::Label(vec![progress])
        };
        header.render(f, regions.header);

        if self.layout.show_plots {
            let cores = self.probe.cores() as u64;
            let cpu: Vec<u64> = self.tracker.cpu.iter().map(|pct| pct.round() as u64).collect();
            Widget::Plot { data: cpu, max: Some(100 * cores) }
                .boxed(WidgetId::CpuPlot.title(), Style::new().fg(INFO_DIM))
                .render(f, regions.cpu_plot);
            let mem: Vec<u64> = self.tracker.memory.iter().collect();
            Widget::Plot { data: mem, max: None }
                .boxed(WidgetId::MemPlot.title(), Style::new().fg(INFO_DIM))
                .render(f, regions.mem_plot);
        }

        self.stats_widget().render(f, regions.data);

        if let Some(message) = &self.state.notification {
            Widget::Label(vec![Line::from(Span::styled(format!(" {message}"), STYLE_KEY))])
                .render(f, regions.notification);
        }

        if self.layout.show_status_bar {
            Widget::Label(vec![self.key_hints()]).render(f, regions.status_bar);
        }

        if self.state.help {
            let help = self.help_widget();
            let (_, height) = help.measure();
            let popup = centered_popup(f.area(), 60, height);
            help.render(f, popup);
        }
    }

    fn key_hints(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (command, name) in [
            (Command::Quit, "Quit"),
            (Command::PlayPause, "Pause"),
            (Command::ToggleFull, "Full"),
            (Command::ToggleTable, "Table"),
            (Command::ToggleGraph, "Graph"),
            (Command::Save, "Save"),
            (Command::Help, "Help"),
        ] {
            if let Some(key) = self.keys.keys_for(command).next() {
                spans.push(Span::styled(key_label(key), STYLE_KEY));
                spans.push(Span::styled(format!(":{name} "), STYLE_DIM));
            }
        }
        Line::from(spans)
    }

    fn help_widget(&self) -> Widget<'static> {
        let describe = |commands: &[Command]| {
            commands
                .iter()
                .flat_map(|c| self.keys.keys_for(*c))
                .map(key_label)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let entries: [(&[Command], &str); 11] = [
            (&[Command::PlayPause], "Pause / resume the display"),
            (&[Command::PrevThread, Command::NextThread], "Previous / next thread"),
            (&[Command::ScrollUp, Command::ScrollDown], "Scroll"),
            (&[Command::PageUp, Command::PageDown, Command::Home, Command::End], "Page, top, bottom"),
            (&[Command::ThresholdUp, Command::ThresholdDown], "Raise / lower the threshold"),
            (&[Command::ToggleFull], "Full call tree"),
            (&[Command::ToggleTable], "Last stack / all frames by total"),
            (&[Command::ToggleGraph], "Flame graph"),
            (&[Command::Save], "Save a snapshot"),
            (&[Command::Help], "This help"),
            (&[Command::Quit], "Quit (also Ctrl-C)"),
        ];

        let mut lines = vec![Line::from(""), Line::from(Span::styled("  Keys", STYLE_HEADING))];
        for (commands, text) in entries {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<16}", describe(commands)), STYLE_KEY),
                Span::styled(text, STYLE_TEXT),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("  Press any key to close", STYLE_DIM)));

        Widget::Overlay(Box::new(
            Widget::Label(lines).boxed(WidgetId::Help.title(), Style::new().fg(SIGNAL_GREEN)),
        ))
    }
}

/// Create a centered popup area with given width percentage and height in lines
fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

// =============================================================================
// LIVE LOOP
// =============================================================================

/// Run the dashboard until the user quits or ingestion shuts down.
///
/// Sends [`UiRequest::Quit`] to the ingestion loop on the way out, and
/// restores the terminal on every exit path.
///
/// # Errors
/// Returns an error if terminal setup, drawing or key reading fails.
pub fn run_live(
    config: Config,
    shared: Arc<SharedState>,
    quit_tx: Sender<UiRequest>,
    probe: SystemProbe,
) -> Result<()> {
    let result = render_loop(&config, shared, probe);
    // the ingestion loop may already be gone
    let _ = quit_tx.send(UiRequest::Quit);
    result
}

fn render_loop(config: &Config, shared: Arc<SharedState>, probe: SystemProbe) -> Result<()> {
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(config, Arc::clone(&shared), probe);

    let size = guard.terminal.size()?;
    app.resize(size.width, size.height);

    let mut next_tick = Instant::now();
    let mut dirty = true;
    loop {
        if shared.is_shutdown() {
            info!("Ingestion finished, closing the dashboard");
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            if !app.state.is_paused() {
                app.tick(now);
            }
            // elapsed time and staleness move even while paused
            dirty = true;
            next_tick = now + config.interval;
        }

        if dirty {
            guard.terminal.draw(|f| app.draw(f, Instant::now()))?;
            dirty = false;
        }

        let timeout = next_tick.saturating_duration_since(Instant::now()).min(POLL_CAP);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match app.handle_key(key) {
                    Effect::Quit => break,
                    Effect::None => {}
                    _ => dirty = true,
                },
                Event::Resize(width, height) => {
                    app.resize(width, height);
                    app.rebuild();
                    dirty = true;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregator;
    use crate::cli::SourceSpec;
    use crossterm::event::{KeyCode, KeyModifiers};
    use crate::profiling::IngestionLoop;
    use ratatui::backend::TestBackend;

    fn config(save_dir: &std::path::Path) -> Config {
        Config {
            source: SourceSpec::Stdin,
            mode: ProfileMode::Wall,
            interval: Duration::from_millis(100),
            threshold: 0.0,
            history: 10,
            stale_after: Duration::from_secs(5),
            save_format: SaveFormat::Collapsed,
            save_dir: save_dir.to_path_buf(),
            pid: None,
            headless: false,
            log_file: None,
            quiet: true,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(dir: &std::path::Path) -> (App, IngestionLoop) {
        let now = Instant::now();
        let aggregator = Aggregator::new(now);
        let shared = Arc::new(SharedState::new(aggregator.snapshot()));
        let mut ingest = IngestionLoop::new(aggregator, ProfileMode::Wall, Arc::clone(&shared));
        ingest.handle_line("P1;T1;app.py:main:1 10", now);
        ingest.handle_line("P1;T2;app.py:other:3 5", now);
        ingest.publish(now);

        let mut app = App::new(&config(dir), shared, SystemProbe::new(None));
        app.resize(100, 40);
        app.tick(now);
        (app, ingest)
    }

    #[test]
    fn test_paused_display_holds_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut ingest) = app(dir.path());
        assert_eq!(app.session.samples, 2);

        app.handle_key(press(KeyCode::Char('p')));
        ingest.handle_line("P1;T1;app.py:main:1 10", Instant::now());
        ingest.publish(Instant::now());
        // no tick while paused, and navigation works off the held session
        app.handle_key(press(KeyCode::Right));
        assert_eq!(app.session.samples, 2);
        assert_eq!(app.state.selected, 1);

        assert_eq!(app.handle_key(press(KeyCode::Char('p'))), Effect::Refresh);
        assert_eq!(app.session.samples, 3);
    }

    #[test]
    fn test_graph_mode_builds_flame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _ingest) = app(dir.path());
        app.handle_key(press(KeyCode::Char('g')));
        let DisplayModel::Flame(rects) = &app.model else { panic!("expected flame") };
        assert_eq!(rects[0].width, 98);
    }

    #[test]
    fn test_save_reports_in_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _ingest) = app(dir.path());
        assert_eq!(app.handle_key(press(KeyCode::Char('s'))), Effect::Save);
        let note = app.state.notification.clone().unwrap();
        assert!(note.starts_with("Saved as "), "{note}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        app.save_dir = dir.path().join("missing");
        app.handle_key(press(KeyCode::Char('s')));
        assert!(app.state.notification.unwrap().starts_with("Failed to save: "));
    }

    #[test]
    fn test_draw_all_views_in_small_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _ingest) = app(dir.path());
        for (w, h) in [(120, 40), (60, 20), (20, 6)] {
            let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
            app.resize(w, h);
            for key in ['t', 'f', 'g', '?'] {
                app.handle_key(press(KeyCode::Char(key)));
                terminal.draw(|f| app.draw(f, Instant::now())).unwrap();
            }
            app.handle_key(press(KeyCode::Esc));
            app.handle_key(press(KeyCode::Char('g')));
            app.handle_key(press(KeyCode::Char('f')));
            app.handle_key(press(KeyCode::Char('t')));
        }
    }

    #[test]
    fn test_row_view_defaults_to_last_stack() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut ingest) = app(dir.path());
        ingest.handle_line("P1;T1;app.py:main:1;app.py:work:7 30", Instant::now());
        ingest.handle_line("P1;T1;app.py:main:1;app.py:idle:9 10", Instant::now());
        ingest.publish(Instant::now());
        app.tick(Instant::now());

        let DisplayModel::LastStack(rows) = &app.model else { panic!("expected last stack") };
        let names: Vec<&str> = rows.iter().map(|r| &*r.frame.function).collect();
        assert_eq!(names, vec!["main", "idle"]);

        assert_eq!(app.handle_key(press(KeyCode::Char('t'))), Effect::Rebuild);
        let DisplayModel::Table(rows) = &app.model else { panic!("expected table") };
        let names: Vec<&str> = rows.iter().map(|r| &*r.frame.function).collect();
        assert_eq!(names, vec!["main", "work", "idle"]);
    }

    #[test]
    fn test_recorded_pids_are_not_probed() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _ingest) = app(dir.path());
        assert_eq!(app.probe.target(), Some(1));

        let now = Instant::now();
        let aggregator = Aggregator::new(now);
        let shared = Arc::new(SharedState::new(aggregator.snapshot()));
        let mut ingest = IngestionLoop::new(aggregator, ProfileMode::Wall, Arc::clone(&shared));
        ingest.handle_line("P1;T1;app.py:main:1 10", now);
        ingest.publish(now);

        let config = Config { source: SourceSpec::File("run.austin".into()), ..config(dir.path()) };
        let mut app = App::new(&config, shared, SystemProbe::new(None));
        app.resize(100, 40);
        app.tick(now);
        assert_eq!(app.probe.target(), None);

        // the save name still carries the recorded pid
        app.handle_key(press(KeyCode::Char('s')));
        let saved = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().file_name();
        assert!(saved.to_string_lossy().ends_with("_1.txt"), "{saved:?}");
    }

    #[test]
    fn test_status_indicator_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut ingest) = app(dir.path());
        let now = Instant::now();
        let quiet = now + app.stale_after;
        assert_eq!(app.status_indicator(now).content, "RUNNING");
        assert_eq!(app.status_indicator(quiet).content, "STALE");
        app.handle_key(press(KeyCode::Char('p')));
        assert_eq!(app.status_indicator(now).content, "PAUSED");
        assert_eq!(app.status_indicator(quiet).content, "PAUSED");
        ingest.finish(now);
        app.session = app.shared.load();
        assert_eq!(app.status_indicator(now).content, "STOPPED");
        assert_eq!(app.status_indicator(quiet).content, "STOPPED");
    }
}
