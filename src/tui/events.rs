//! Custom event types for the watch TUI.

use crossterm::event::KeyEvent;
use tokio::sync::mpsc;

use crate::coordinator::ResultSink;
use crate::execution::RunResult;
use crate::markers::{Annotation, AnnotationSink};
use crate::process::RunId;

/// Events that can occur in the TUI application
#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Terminal was resized
    Resize,
    /// The watched source changed on disk
    SourceChanged(String),
    /// The watched source could not be read
    SourceUnreadable(String),
    /// A sandbox run was started for the latest text
    RunStarted(RunId),
    /// A run delivered its result
    RunFinished { run: RunId, result: RunResult },
    /// Replace the editor annotations
    Annotations(Vec<Annotation>),
    /// Scroll the editor so the line is visible
    Reveal(u32),
}

/// Forwards coordinator output onto the TUI event channel. One clone serves
/// as the result sink, another as the annotation sink.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TuiEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<TuiEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TuiEvent) {
        // The UI has gone away; nothing left to update.
        let _ = self.tx.send(event);
    }
}

impl ResultSink for ChannelSink {
    fn on_run_started(&mut self, run: RunId) {
        self.send(TuiEvent::RunStarted(run));
    }

    fn on_result(&mut self, run: RunId, result: &RunResult) {
        self.send(TuiEvent::RunFinished {
            run,
            result: result.clone(),
        });
    }
}

impl AnnotationSink for ChannelSink {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.send(TuiEvent::Annotations(annotations.to_vec()));
    }

    fn clear_annotations(&mut self) {
        self.send(TuiEvent::Annotations(Vec::new()));
    }

    fn reveal_line(&mut self, line: u32) {
        self.send(TuiEvent::Reveal(line));
    }
}
