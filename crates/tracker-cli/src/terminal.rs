use std::io::{self, BufRead, IsTerminal, Write};

use tracing::debug;
use tracker_core::render::{NotesPanel, RenderedColumn, Stats};
use tracker_core::task::{Status, Task};
use tracker_core::view::TaskView;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;

/// Terminal side of the view contract. The CLI is one-shot, so it only
/// needs to remember what the store asked it to show.
#[derive(Debug, Default)]
pub struct TerminalView {
    pub confirmation: Option<String>,
    pub stats: Stats,
}

impl TaskView for TerminalView {
    fn tasks_changed(&mut self, tasks: &[Task]) {
        self.stats = Stats::from_tasks(tasks);
    }

    fn show_confirmation(&mut self, message: &str) {
        self.confirmation = Some(message.to_string());
    }

    fn dismiss_confirmation(&mut self) {
        self.confirmation = None;
    }
}

#[derive(Debug, Clone)]
pub struct Painter {
    color: bool,
}

impl Painter {
    /// Colors only when `color` is on and stdout is a terminal.
    pub fn new(cfg: &Config) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn status(&self, status: Status) -> String {
        let code = match status {
            Status::NotStarted => "37",
            Status::InProgress => "34",
            Status::Completed => "32",
        };
        self.paint(status.label(), code)
    }

    pub fn write_board<W: Write>(
        &self,
        mut out: W,
        columns: &[RenderedColumn],
    ) -> anyhow::Result<()> {
        for (idx, column) in columns.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{} ({})", self.status(column.status), column.rows.len())?;

            if column.is_empty() {
                writeln!(out, "  No tasks")?;
                continue;
            }

            let rows = column
                .rows
                .iter()
                .map(|row| {
                    let note = row
                        .latest_note
                        .as_ref()
                        .map(|n| format!("{} ({})", first_line(&n.content), n.date))
                        .unwrap_or_else(|| "-".to_string());
                    vec![
                        self.paint(short_id(&row.id), "33"),
                        row.title.clone(),
                        row.deadline.clone(),
                        note,
                    ]
                })
                .collect();
            Table {
                indent: 2,
                headers: vec!["ID", "Title", "Deadline", "Latest note"],
                rows,
            }
            .write(&mut out)?;
        }
        Ok(())
    }

    pub fn write_stats<W: Write>(&self, mut out: W, stats: &Stats) -> anyhow::Result<()> {
        writeln!(out, "{:<12} {}", "Total", stats.total)?;
        for status in Status::ALL {
            writeln!(out, "{:<12} {}", status.label(), stats.count(status))?;
        }
        Ok(())
    }

    pub fn write_task<W: Write>(
        &self,
        mut out: W,
        task: &Task,
        deadline: &str,
        panel: &NotesPanel,
    ) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", self.status(task.status))?;
        writeln!(out, "deadline  {deadline}")?;
        writeln!(out, "created   {}", task.created_at.format("%Y-%m-%dT%H:%M:%SZ"))?;
        writeln!(out)?;

        match panel {
            NotesPanel::Empty => writeln!(out, "No notes yet.")?,
            NotesPanel::Timeline(entries) => {
                for entry in entries {
                    writeln!(
                        out,
                        "{} {}  {}",
                        self.paint(&entry.date, "1"),
                        entry.created_time,
                        self.paint(short_id(&entry.id), "33")
                    )?;
                    for line in entry.content.lines() {
                        writeln!(out, "    {line}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Asks `message [y/N]` and reads one line. Anything but y/yes declines,
/// including end of input.
pub fn ask_confirmation<R: BufRead, W: Write>(
    message: &str,
    mut input: R,
    mut output: W,
) -> io::Result<bool> {
    write!(output, "{message} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let accepted = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    debug!(accepted, "confirmation answered");
    Ok(accepted)
}

fn short_id(id: &str) -> &str {
    // Hyphenated UUIDs are shown by their first group; legacy ids as-is.
    match id.split_once('-') {
        Some((head, _)) if head.len() == 8 => head,
        _ => id,
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Left-aligned table. Widths ignore color codes so painted cells line up.
struct Table {
    indent: usize,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| visible_width(cell))
                    .fold(UnicodeWidthStr::width(*header), usize::max)
            })
            .collect()
    }

    fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        let widths = self.widths();
        let headers: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

        for cells in [&headers, &rule].into_iter().chain(self.rows.iter()) {
            let mut line = " ".repeat(self.indent);
            for (cell, width) in cells.iter().zip(&widths) {
                line.push_str(cell);
                line.push_str(&" ".repeat(width.saturating_sub(visible_width(cell)) + 1));
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // SGR sequences end at their final letter.
            let _ = chars.by_ref().find(|c| c.is_ascii_alphabetic());
        } else {
            out.push(ch);
        }
    }
    out
}
