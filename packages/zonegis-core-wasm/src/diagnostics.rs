//! Structured diagnostics emitted while processing layers.
//!
//! Per-feature failures never surface as errors; they are reported through a
//! [`DiagnosticSink`] instead. [`ConsoleSink`] writes to the browser console
//! (or `tracing` off the browser), [`RecordingSink`] keeps events in memory.
use std::fmt;
use std::sync::Mutex;

use crate::console;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A feature produced no buffer and was left out of the layer.
    BufferFeatureSkipped,
    /// A Point base cannot be eroded and was passed through.
    PointBasePassthrough,
    /// One reference could not be subtracted; the previous result was kept.
    SubtractionStepFailed,
    /// A base feature failed outright and was kept unmodified.
    BaseFeatureKept,
    /// A feature was listed with zero metrics.
    MetricsFeatureSkipped,
    LayerBuffered,
    LayersSubtracted,
    ZoneComposed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub layer_id: Option<String>,
    pub feature_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Info,
            kind,
            layer_id: None,
            feature_id: None,
            message: message.into(),
        }
    }

    pub fn warn(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Warn,
            ..Diagnostic::info(kind, message)
        }
    }

    pub fn for_layer(mut self, layer_id: &str) -> Self {
        self.layer_id = Some(layer_id.to_string());
        self
    }

    pub fn for_feature(mut self, feature_id: &str) -> Self {
        self.feature_id = Some(feature_id.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(layer_id) = &self.layer_id {
            write!(f, " layer={}", layer_id)?;
        }
        if let Some(feature_id) = &self.feature_id {
            write!(f, " feature={}", feature_id)?;
        }
        write!(f, " {}", self.message)
    }
}

pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Box<T> {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let line = diagnostic.to_string();
        match diagnostic.level {
            DiagnosticLevel::Info => console::log(&line),
            DiagnosticLevel::Warn => console::warn(&line),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter(|event| event.level == DiagnosticLevel::Warn)
            .collect()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order_and_levels() {
        let sink = RecordingSink::new();
        sink.emit(Diagnostic::info(DiagnosticKind::LayerBuffered, "done").for_layer("a"));
        sink.emit(
            Diagnostic::warn(DiagnosticKind::BufferFeatureSkipped, "empty")
                .for_layer("a")
                .for_feature("f1"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, DiagnosticKind::LayerBuffered);
        assert_eq!(sink.warnings().len(), 1);
        assert_eq!(sink.count(DiagnosticKind::BufferFeatureSkipped), 1);
    }

    #[test]
    fn display_includes_context() {
        let line = Diagnostic::warn(DiagnosticKind::SubtractionStepFailed, "bad ring")
            .for_layer("l")
            .for_feature("f")
            .to_string();
        assert_eq!(line, "[SubtractionStepFailed] layer=l feature=f bad ring");
    }

    #[test]
    fn sinks_work_through_references() {
        let sink = RecordingSink::new();
        let by_ref: &dyn DiagnosticSink = &sink;
        by_ref.emit(Diagnostic::info(DiagnosticKind::ZoneComposed, "ok"));
        NullSink.emit(Diagnostic::info(DiagnosticKind::ZoneComposed, "ignored"));
        assert_eq!(sink.events().len(), 1);
    }
}
