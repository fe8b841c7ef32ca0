use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::WeekStart;
use crate::engine::CalendarViewModel;
use crate::grid::{CalendarDate, HAS_EVENTS_CLASS, TODAY_CLASS, cell_classes};

pub const EMPTY_SCHEDULE: &str = "No events scheduled for this day.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view))]
    pub fn write_json<W: Write>(&self, mut out: W, view: &CalendarViewModel) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut out, view)?;
        writeln!(out)?;
        Ok(())
    }

    /// Month title, the day grid, then the schedule for the selected day.
    #[tracing::instrument(skip(self, out, view))]
    pub fn write_view<W: Write>(
        &self,
        mut out: W,
        view: &CalendarViewModel,
        week_start: WeekStart,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", view.month_and_year_text)?;
        writeln!(out)?;

        let headers = week_start
            .ordered_days()
            .iter()
            .map(|day| day.chars().take(3).collect::<String>())
            .collect::<Vec<_>>();

        let rows = view
            .calendar_dates
            .iter()
            .map(|week| {
                week.iter()
                    .map(|cell| self.day_cell(cell.as_ref(), view))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        write_grid(&mut out, headers, rows)?;

        if view.state.selected_date.is_none() {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "{}", view.schedule_day)?;
        if view.state.tasks.is_empty() {
            writeln!(out, "  {EMPTY_SCHEDULE}")?;
            return Ok(());
        }

        for event in &view.state.tasks {
            let id = self.paint(&event.id.to_string(), "33");
            writeln!(out, "  {id} {}", event.name)?;
            if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
                writeln!(out, "      {description}")?;
            }
        }

        Ok(())
    }

    fn day_cell(&self, cell: Option<&CalendarDate>, view: &CalendarViewModel) -> String {
        let Some(date) = cell else {
            return String::new();
        };

        let classes = cell_classes(Some(date));
        let mut text = date.date.format("%-d").to_string();
        if classes.contains(&HAS_EVENTS_CLASS) {
            text.push('*');
        }
        if view.state.selected_date == Some(date.date) {
            text = format!("[{text}]");
        }
        if classes.contains(&TODAY_CLASS) {
            text = self.paint(&text, "1;32");
        } else if classes.contains(&HAS_EVENTS_CLASS) {
            text = self.paint(&text, "36");
        }
        text
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Right-aligned columns sized to the widest visible cell.
fn write_grid<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:>width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    for row in rows {
        let mut line = String::new();
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or_default();
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            if idx > 0 {
                line.push(' ');
            }
            line.push_str(&" ".repeat(width.saturating_sub(visible_width)));
            line.push_str(cell);
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
