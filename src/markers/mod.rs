//! Projection of run errors onto editor annotations.

use crate::execution::RunResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

/// A whole-line annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub line: u32,
    pub message: String,
    pub severity: Severity,
}

/// Whatever displays the source being edited.
pub trait AnnotationSink {
    /// Replaces every annotation currently shown.
    fn set_annotations(&mut self, annotations: &[Annotation]);
    fn clear_annotations(&mut self);
    fn reveal_line(&mut self, line: u32);
}

impl<S: AnnotationSink + ?Sized> AnnotationSink for Box<S> {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        (**self).set_annotations(annotations);
    }

    fn clear_annotations(&mut self) {
        (**self).clear_annotations();
    }

    fn reveal_line(&mut self, line: u32) {
        (**self).reveal_line(line);
    }
}

pub struct MarkerProjector<A> {
    sink: A,
}

impl<A: AnnotationSink> MarkerProjector<A> {
    pub fn new(sink: A) -> Self {
        Self { sink }
    }

    /// Shows at most one annotation: the run's error, if it has one.
    /// Projecting the same result twice leaves the same state as once.
    pub fn project(&mut self, result: &RunResult) {
        self.sink.clear_annotations();
        let Some(error) = &result.error else {
            return;
        };
        let line = error.line.unwrap_or(1).max(1);
        self.sink.set_annotations(&[Annotation {
            line,
            message: error.message.clone(),
            severity: Severity::Error,
        }]);
        self.sink.reveal_line(line);
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn into_sink(self) -> A {
        self.sink
    }
}

/// In-memory annotation state with replace semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    revealed: Option<u32>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn on_line(&self, line: u32) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.line == line)
    }

    pub fn revealed(&self) -> Option<u32> {
        self.revealed
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl AnnotationSink for AnnotationSet {
    fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.annotations = annotations.to_vec();
    }

    fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    fn reveal_line(&mut self, line: u32) {
        self.revealed = Some(line);
    }
}
