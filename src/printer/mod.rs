//! Printers for one-shot runs: console entries and annotated source excerpts.

use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use crate::execution::{LogEntry, LogKind, RunResult};
use crate::markers::{Annotation, AnnotationSink};

pub struct ConsolePrinter {
    pub color: bool,
}

impl ConsolePrinter {
    pub fn print(&self, result: &RunResult) {
        for entry in &result.entries {
            println!("{}", self.format_entry(entry));
        }
        if let Some(error) = &result.error {
            let text = format!("Uncaught {}", error.message);
            if self.color {
                println!("{}", text.red());
            } else {
                println!("{}", text);
            }
        }
    }

    pub fn format_entry(&self, entry: &LogEntry) -> String {
        let text = entry.text();
        if !self.color {
            return text;
        }
        match entry.kind {
            LogKind::Log => text,
            LogKind::Warn => format!("{}", text.yellow()),
            LogKind::Error => format!("{}", text.red()),
            LogKind::Table => format!("{}", text.cyan()),
        }
    }
}

/// Annotation sink that renders a few lines of context around the marked line.
pub struct TerminalAnnotations {
    source: String,
    color: bool,
    annotations: Vec<Annotation>,
    revealed: Option<u32>,
}

const CONTEXT_LINES: u32 = 2;

impl TerminalAnnotations {
    pub fn new(source: impl Into<String>, color: bool) -> Self {
        Self {
            source: source.into(),
            color,
            annotations: Vec::new(),
            revealed: None,
        }
    }

    /// Excerpt lines for the revealed line, empty when nothing is annotated.
    pub fn render(&self) -> Vec<String> {
        let Some(focus) = self.revealed.filter(|_| !self.annotations.is_empty()) else {
            return Vec::new();
        };
        let lines: Vec<&str> = self.source.split('\n').collect();
        let first = focus.saturating_sub(CONTEXT_LINES).max(1);
        let last = (focus + CONTEXT_LINES).min(lines.len() as u32);
        let gutter = last.to_string().len();

        let mut out = Vec::new();
        for number in first..=last {
            let text = lines
                .get(number as usize - 1)
                .copied()
                .unwrap_or_default()
                .trim_end_matches('\r');
            let marked = self.annotations.iter().find(|a| a.line == number);
            let marker = if marked.is_some() { ">" } else { " " };
            let row = format!("{marker}{number:>gutter$} | {text}");
            out.push(if marked.is_some() && self.color {
                format!("{}", row.bold())
            } else {
                row
            });
            if let Some(annotation) = marked {
                let indent = text.len() - text.trim_start().len();
                let width = UnicodeWidthStr::width(text.trim()).max(1);
                let underline = format!(
                    "{}{} {}",
                    " ".repeat(indent),
                    "^".repeat(width),
                    annotation.message
                );
                let pad = " ".repeat(gutter + 1);
                out.push(if self.color {
                    format!("{pad} | {}", underline.red())
                } else {
                    format!("{pad} | {underline}")
                });
            }
        }
        out
    }

    pub fn print(&self) {
        for line in self.render() {
            println!("{}", line);
        }
    }
}

impl AnnotationSink for TerminalAnnotations {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.annotations = annotations.to_vec();
    }

    fn clear_annotations(&mut self) {
        self.annotations.clear();
        self.revealed = None;
    }

    fn reveal_line(&mut self, line: u32) {
        self.revealed = Some(line);
    }
}
