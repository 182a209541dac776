//! Execution engine: wire protocol and result types.
//!
//! Everything in this module crosses the host/worker boundary as plain data.
//! No value here holds a reference into a JavaScript realm.

use serde::{Deserialize, Serialize};

pub mod console;
pub mod engine;
mod lexer;
pub mod loop_guard;
pub mod serializer;
pub mod timers;
pub mod trace;

/// Console method family a [`LogEntry`] was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Warn,
    Error,
    Table,
}

/// One captured console call. Payload elements are already serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub payload: Vec<String>,
}

impl LogEntry {
    pub fn new(kind: LogKind, payload: Vec<String>) -> Self {
        Self { kind, payload }
    }

    /// Display form used by console panes: elements joined by a single space.
    pub fn text(&self) -> String {
        self.payload.join(" ")
    }
}

/// A failure surfaced to the user, with a best-effort source line (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn timed_out() -> Self {
        Self::new(TIMED_OUT_MESSAGE, None)
    }
}

pub const TIMED_OUT_MESSAGE: &str = "Execution timed out";

/// Outcome of one run. Entries captured before a throw are kept alongside the error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "logs", default)]
    pub entries: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RuntimeError>,
}

impl RunResult {
    pub fn completed(entries: Vec<LogEntry>) -> Self {
        Self {
            entries,
            error: None,
        }
    }

    pub fn failed(entries: Vec<LogEntry>, error: RuntimeError) -> Self {
        Self {
            entries,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The single request message: raw source text, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub source: String,
}

/// The single response message is a [`RunResult`] serialized as
/// `{ "logs": [...], "error"?: {...} }`.
pub type WorkerResponse = RunResult;
