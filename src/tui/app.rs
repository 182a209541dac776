//! TUI application state management.

use crate::execution::{LogEntry, RunResult, RuntimeError};
use crate::markers::{Annotation, AnnotationSet, AnnotationSink};
use crate::process::RunId;

/// Lines kept visible above a revealed line.
const REVEAL_CONTEXT: usize = 3;

/// Which pane arrow keys scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Console,
}

/// Where the last delivered result stands relative to the text on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No run has been started yet
    Waiting,
    Running(RunId),
    Succeeded(RunId),
    Failed(RunId),
}

/// Application state for the watch TUI
#[derive(Debug)]
pub struct App {
    /// Label for the editor pane (file path or snippet location)
    pub title: String,
    /// Source lines as last read
    pub lines: Vec<String>,
    /// Error annotations projected from the last result
    pub annotations: AnnotationSet,
    /// Console entries of the last delivered result
    pub entries: Vec<LogEntry>,
    /// Error of the last delivered result
    pub error: Option<RuntimeError>,
    pub status: RunStatus,
    /// Read problem with the watched source, if any
    pub notice: Option<String>,
    pub focus: Focus,
    /// First editor line shown (0-based)
    pub editor_top: usize,
    /// Scroll offset for the console, 0 follows the newest line
    pub console_scroll_offset: usize,
    pub show_help: bool,
}

impl App {
    pub fn new(title: impl Into<String>, source: &str) -> Self {
        Self {
            title: title.into(),
            lines: split_lines(source),
            annotations: AnnotationSet::new(),
            entries: Vec::new(),
            error: None,
            status: RunStatus::Waiting,
            notice: None,
            focus: Focus::Editor,
            editor_top: 0,
            console_scroll_offset: 0,
            show_help: false,
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.lines = split_lines(source);
        self.notice = None;
        self.editor_top = self.editor_top.min(self.max_editor_top());
    }

    pub fn run_started(&mut self, run: RunId) {
        self.status = RunStatus::Running(run);
    }

    /// Replaces the console with the delivered result. Results are applied as
    /// a whole; a newer run never shows older entries.
    pub fn run_finished(&mut self, run: RunId, result: RunResult) {
        self.status = if result.is_success() {
            RunStatus::Succeeded(run)
        } else {
            RunStatus::Failed(run)
        };
        self.entries = result.entries;
        self.error = result.error;
        self.console_scroll_offset = 0;
    }

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        if annotations.is_empty() {
            self.annotations.clear_annotations();
        } else {
            self.annotations.set_annotations(&annotations);
        }
    }

    /// Scrolls the editor so `line` (1-based) sits near the top.
    pub fn reveal(&mut self, line: u32) {
        self.annotations.reveal_line(line);
        let index = (line.max(1) as usize - 1).min(self.lines.len().saturating_sub(1));
        self.editor_top = index.saturating_sub(REVEAL_CONTEXT);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Editor => Focus::Console,
            Focus::Console => Focus::Editor,
        };
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn scroll_up(&mut self, amount: usize) {
        match self.focus {
            Focus::Editor => self.editor_top = self.editor_top.saturating_sub(amount),
            Focus::Console => {
                self.console_scroll_offset =
                    (self.console_scroll_offset + amount).min(self.console_line_count());
            }
        }
    }

    pub fn scroll_down(&mut self, amount: usize) {
        match self.focus {
            Focus::Editor => {
                self.editor_top = (self.editor_top + amount).min(self.max_editor_top());
            }
            Focus::Console => {
                self.console_scroll_offset = self.console_scroll_offset.saturating_sub(amount);
            }
        }
    }

    /// Lines the console pane would show, entries first then the error.
    pub fn console_line_count(&self) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|e| e.text().lines().count().max(1))
            .sum();
        entries + usize::from(self.error.is_some())
    }

    pub fn status_text(&self) -> String {
        match self.status {
            RunStatus::Waiting => "waiting for first run".to_string(),
            RunStatus::Running(run) => format!("run {run} running"),
            RunStatus::Succeeded(run) => format!("run {run} ok, {} entries", self.entries.len()),
            RunStatus::Failed(run) => match self.error.as_ref().and_then(|e| e.line) {
                Some(line) => format!("run {run} failed at line {line}"),
                None => format!("run {run} failed"),
            },
        }
    }

    fn max_editor_top(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

fn split_lines(source: &str) -> Vec<String> {
    source
        .split('\n')
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect()
}
