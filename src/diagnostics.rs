//! Diagnostics
//!
//! Findings produced by the correctness passes. All name-check findings are
//! advisory: they are aggregated across every scope, deterministically
//! ordered, handed to the caller's sink, and never block schema emission.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Two or more distinct source keys translate to the same output name
    OutputNameCollision,
    /// Two or more emitted output names translate back to the same source key
    SourceKeyCollision,
    /// The forward translator disagrees with the name the builder emitted
    ForwardMismatch,
    /// Translating forward then backward does not return the source key
    RoundTripMismatch,
    /// An emitted output name is not a valid identifier
    InvalidIdentifier,
    /// A third occurrence of a shared type disagrees with both recorded
    /// required sets
    RequiredSetConflict,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutputNameCollision => "N001",
            Self::SourceKeyCollision => "N002",
            Self::ForwardMismatch => "N003",
            Self::RoundTripMismatch => "N004",
            Self::InvalidIdentifier => "N005",
            Self::RequiredSetConflict => "N006",
        }
    }

    /// Every name-check finding is advisory
    pub fn severity(&self) -> Severity {
        Severity::Warning
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single finding, anchored to a validation scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Scope location, e.g. `resource example:index:Widget`
    pub location: String,
    /// Source key the finding is about (may be empty for scope-level findings)
    pub source_key: String,
    /// Attribute the finding concerns, typically the output name involved
    pub attribute: String,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        location: impl Into<String>,
        source_key: impl Into<String>,
        attribute: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            source_key: source_key.into(),
            attribute: attribute.into(),
            code,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Ordering key: by scope location, then source key, then attribute,
    /// then message. Repeated runs over unchanged input must produce
    /// byte-identical diagnostic output.
    pub fn sort_key(&self) -> (&str, &str, &str, &str) {
        (&self.location, &self.source_key, &self.attribute, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}: {}",
            self.code,
            self.severity(),
            self.location,
            self.message
        )
    }
}

/// Sort a batch of findings into their stable reporting order
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

// =============================================================================
// Sink
// =============================================================================

/// Caller-supplied destination for findings
pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, message: &str);
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _severity: Severity, _message: &str) {}
}

/// Sink that routes findings to the `tracing` subscriber
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }
}

/// Sink that collects everything, for tests and report generation
#[derive(Debug, Default)]
pub struct CollectSink {
    pub reports: Vec<(Severity, String)>,
}

impl DiagnosticSink for CollectSink {
    fn report(&mut self, severity: Severity, message: &str) {
        self.reports.push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order() {
        let mut diags = vec![
            Diagnostic::new("config", "b", "", DiagnosticCode::RoundTripMismatch, "m2"),
            Diagnostic::new("config", "a", "", DiagnosticCode::RoundTripMismatch, "m1"),
            Diagnostic::new("a-scope", "z", "", DiagnosticCode::OutputNameCollision, "m3"),
        ];
        sort_diagnostics(&mut diags);
        assert_eq!(diags[0].location, "a-scope");
        assert_eq!(diags[1].source_key, "a");
        assert_eq!(diags[2].source_key, "b");
    }

    #[test]
    fn test_collect_sink() {
        let mut sink = CollectSink::default();
        sink.report(Severity::Warning, "something");
        assert_eq!(sink.reports.len(), 1);
        assert_eq!(sink.reports[0].0, Severity::Warning);
    }

    #[test]
    fn test_display_includes_code_and_location() {
        let d = Diagnostic::new("config", "k", "", DiagnosticCode::ForwardMismatch, "drift");
        let text = d.to_string();
        assert!(text.contains("N003"));
        assert!(text.contains("config"));
    }
}
