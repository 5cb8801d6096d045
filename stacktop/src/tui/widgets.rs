//! Drawable widgets.
//!
//! Every panel of the dashboard is one [`Widget`] variant. All of them can
//! report their natural size ([`Widget::measure`]) and draw themselves into a
//! rect ([`Widget::render`]), clipping to whatever space they are given.

// Column arithmetic on terminal sizes
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Sparkline, Table},
    Frame,
};

use super::theme::{flame_color, severity_color, SIGNAL_GREEN, STYLE_DIM, STYLE_LABEL, STYLE_TEXT};
use crate::analysis::{FlameRect, StatRow};
use crate::domain::ProfileMode;

/// Stable names for the dashboard slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetId {
    Header,
    CpuPlot,
    MemPlot,
    Stats,
    Notification,
    StatusBar,
    Help,
}

impl WidgetId {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            WidgetId::Header => " stacktop ",
            WidgetId::CpuPlot => " CPU ",
            WidgetId::MemPlot => " MEM ",
            WidgetId::Stats => " Stats ",
            WidgetId::Notification | WidgetId::StatusBar => "",
            WidgetId::Help => " Help ",
        }
    }
}

pub enum Widget<'a> {
    /// Plain text lines
    Label(Vec<Line<'a>>),
    /// A bordered box around another widget
    Boxed { title: String, border: Style, inner: Box<Widget<'a>> },
    /// Statistics rows; `tree` draws the glyph prefixes and highlights the
    /// last stack
    Table { rows: &'a [StatRow], mode: ProfileMode, tree: bool },
    /// Time series as a sparkline; `max` fixes the top of the scale
    Plot { data: Vec<u64>, max: Option<u64> },
    FlameGraph { rects: &'a [FlameRect] },
    /// Shows `inner` starting `offset` rows down
    Scroll { offset: usize, inner: Box<Widget<'a>> },
    /// Clears the area first so it can float over other widgets
    Overlay(Box<Widget<'a>>),
}

impl<'a> Widget<'a> {
    #[must_use]
    pub fn boxed(self, title: impl Into<String>, border: Style) -> Self {
        Widget::Boxed { title: title.into(), border, inner: Box::new(self) }
    }

    #[must_use]
    pub fn scrolled(self, offset: usize) -> Self {
        Widget::Scroll { offset, inner: Box::new(self) }
    }

    /// Natural (width, height) in cells, borders included.
    #[must_use]
    pub fn measure(&self) -> (u16, u16) {
        match self {
            Widget::Label(lines) => {
                let width = lines.iter().map(Line::width).max().unwrap_or(0);
                (clamp_u16(width), clamp_u16(lines.len()))
            }
            Widget::Boxed { title, inner, .. } => {
                let (w, h) = inner.measure();
                (w.max(clamp_u16(title.chars().count())).saturating_add(2), h.saturating_add(2))
            }
            Widget::Table { rows, tree, .. } => {
                let name = rows
                    .iter()
                    .map(|r| r.prefix.chars().count() + r.frame.function.chars().count())
                    .max()
                    .unwrap_or(0);
                let extra = if *tree { 0 } else { 24 };
                (clamp_u16(TABLE_FIXED_COLUMNS + name + extra), clamp_u16(rows.len() + 1))
            }
            Widget::Plot { data, .. } => (clamp_u16(data.len()), 3),
            Widget::FlameGraph { rects } => {
                let width = rects.first().map_or(0, |r| r.width);
                (clamp_u16(width), clamp_u16(crate::analysis::height(rects)))
            }
            Widget::Scroll { offset, inner } => {
                let (w, h) = inner.measure();
                (w, h.saturating_sub(clamp_u16(*offset)))
            }
            Widget::Overlay(inner) => inner.measure(),
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        self.render_from(f, area, 0);
    }

    fn render_from(&self, f: &mut Frame, area: Rect, offset: usize) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        match self {
            Widget::Label(lines) => {
                let lines: Vec<Line> = lines.iter().skip(offset).cloned().collect();
                f.render_widget(Paragraph::new(lines), area);
            }
            Widget::Boxed { title, border, inner } => {
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(title.clone(), STYLE_LABEL))
                    .border_style(*border);
                let content = block.inner(area);
                f.render_widget(block, area);
                inner.render_from(f, content, offset);
            }
            Widget::Table { rows, mode, tree } => {
                render_table(f, area, &rows[offset.min(rows.len())..], *mode, *tree);
            }
            Widget::Plot { data, max } => {
                let mut plot = Sparkline::default().data(data).style(Style::new().fg(SIGNAL_GREEN));
                if let Some(max) = max {
                    plot = plot.max(*max);
                }
                f.render_widget(plot, area);
            }
            Widget::FlameGraph { rects } => render_flame(f, area, rects, offset),
            Widget::Scroll { offset: own, inner } => inner.render_from(f, area, offset + own),
            Widget::Overlay(inner) => {
                f.render_widget(Clear, area);
                inner.render_from(f, area, offset);
            }
        }
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

// OWN, TOTAL, %OWN, %TOTAL plus gaps
const TABLE_FIXED_COLUMNS: usize = 8 + 8 + 7 + 7 + 4;

fn render_table(f: &mut Frame, area: Rect, rows: &[StatRow], mode: ProfileMode, tree: bool) {
    let header = Row::new(["OWN", "TOTAL", "%OWN", "%TOTAL", "FUNCTION"])
        .style(STYLE_LABEL);

    let body: Vec<Row> = rows
        .iter()
        .take(area.height as usize)
        .map(|row| {
            let name_style = if tree && row.on_last_stack {
                Style::new().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                STYLE_TEXT
            };
            let mut name = vec![
                Span::styled(row.prefix.clone(), STYLE_DIM),
                Span::styled(row.frame.function.to_string(), name_style),
            ];
            name.push(Span::styled(format!(" ({}:{})", row.frame.file, row.frame.line), STYLE_DIM));

            Row::new(vec![
                Cell::from(mode.format(row.own)),
                Cell::from(mode.format(row.total)),
                Cell::from(format!("{:5.1}", row.own_pct))
                    .style(Style::new().fg(severity_color(row.own_pct))),
                Cell::from(format!("{:5.1}", row.total_pct))
                    .style(Style::new().fg(severity_color(row.total_pct))),
                Cell::from(Line::from(name)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Fill(1),
    ];
    f.render_widget(Table::new(body, widths).header(header), area);
}

/// Draw flame boxes cell by cell, clipped to `area`. `offset` skips levels
/// from the top.
fn render_flame(f: &mut Frame, area: Rect, rects: &[FlameRect], offset: usize) {
    let buf = f.buffer_mut();
    for rect in rects {
        let Some(row) = rect.depth.checked_sub(offset) else { continue };
        if row >= area.height as usize || rect.x >= area.width as usize {
            continue;
        }
        let y = area.y + row as u16;
        let width = rect.width.min(area.width as usize - rect.x);
        let name = rect.frame.as_ref().map_or("all", |frame| &*frame.function);
        let bg = if rect.frame.is_some() { flame_color(name) } else { Color::DarkGray };

        let mut label = name.chars();
        for i in 0..width {
            // last column of each box stays blank as a separator
            let ch = if i + 1 < width { label.next().unwrap_or(' ') } else { ' ' };
            let x = area.x + (rect.x + i) as u16;
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(ch).set_fg(Color::Black).set_bg(bg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacktop_common::Frame as StackFrame;

    fn row(function: &str, prefix: &str) -> StatRow {
        StatRow {
            frame: StackFrame::new(function, "app.py", 1),
            depth: 1,
            prefix: prefix.to_string(),
            own: 0,
            total: 0,
            own_pct: 0.0,
            total_pct: 0.0,
            own_samples: 0,
            total_samples: 0,
            on_last_stack: false,
        }
    }

    #[test]
    fn test_label_measure() {
        let label = Widget::Label(vec![Line::from("abc"), Line::from("abcdef")]);
        assert_eq!(label.measure(), (6, 2));
        assert_eq!(label.boxed("x", STYLE_DIM).measure(), (8, 4));
    }

    #[test]
    fn test_table_measure_counts_header() {
        let rows = vec![row("main", ""), row("work", "└─ ")];
        let table = Widget::Table { rows: &rows, mode: ProfileMode::Wall, tree: true };
        assert_eq!(table.measure().1, 3);
        assert_eq!(table.scrolled(1).measure().1, 2);
    }

    #[test]
    fn test_flame_measure() {
        let rects = vec![
            FlameRect { depth: 0, x: 0, width: 40, frame: None, weight_pct: 100.0 },
            FlameRect {
                depth: 1,
                x: 0,
                width: 20,
                frame: Some(StackFrame::new("main", "app.py", 1)),
                weight_pct: 50.0,
            },
        ];
        assert_eq!(Widget::FlameGraph { rects: &rects }.measure(), (40, 2));
    }
}
