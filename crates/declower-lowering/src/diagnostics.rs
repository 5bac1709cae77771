//! Diagnostics collected while lowering a unit.
//!
//! Lowering keeps going past recoverable errors. Each one becomes a
//! [`Diagnostic`] tied to the source declaration it was raised for, so the
//! consuming compiler can report as many independent problems as possible
//! from a single run.

use std::fmt;

use declower_core::{LoweringError, QualifiedName, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    CompilerBug,
    Unsupported,
    Precondition,
    /// The declaration carried upstream error markers and was not lowered.
    SkippedErroneous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// The source declaration the diagnostic is reported against.
    pub declaration: QualifiedName,
    pub span: Span,
}

impl Diagnostic {
    pub fn from_error(error: &LoweringError, declaration: QualifiedName) -> Self {
        let kind = match error {
            LoweringError::CompilerBug { .. } => DiagnosticKind::CompilerBug,
            LoweringError::Unsupported { .. } => DiagnosticKind::Unsupported,
            LoweringError::Precondition { .. } | LoweringError::Model(_) => {
                DiagnosticKind::Precondition
            }
        };
        Self {
            severity: Severity::Error,
            kind,
            message: error.message(),
            declaration,
            span: error.span(),
        }
    }

    pub fn skipped(declaration: QualifiedName, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::SkippedErroneous,
            message: format!("'{declaration}' has upstream errors and was not lowered"),
            declaration,
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}: {}",
            self.severity, self.declaration, self.span, self.message
        )
    }
}

/// Counters for what a lowering run synthesized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoweringStats {
    pub declarations_lowered: usize,
    pub declarations_skipped: usize,
    pub companions: usize,
    pub companion_delegates: usize,
    pub overloads: usize,
    pub default_value_methods: usize,
    pub canonical_methods: usize,
    pub instantiators: usize,
    pub placeholders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_maps_kind_and_span() {
        let err = LoweringError::unsupported("term `switch`", Span::new(3, 4, 6));
        let diag = Diagnostic::from_error(&err, QualifiedName::from_dotted("pkg.f"));
        assert_eq!(diag.kind, DiagnosticKind::Unsupported);
        assert_eq!(diag.span, Span::new(3, 4, 6));
        assert!(diag.is_error());
        assert_eq!(diag.to_string(), "error: pkg.f at 3:4: term `switch`");
    }

    #[test]
    fn model_errors_report_as_precondition() {
        let err = LoweringError::Model(declower_core::ModelError::UnknownDeclaration { index: 2 });
        let diag = Diagnostic::from_error(&err, QualifiedName::global("C"));
        assert_eq!(diag.kind, DiagnosticKind::Precondition);
    }

    #[test]
    fn skipped_is_a_warning() {
        let diag = Diagnostic::skipped(QualifiedName::global("Broken"), Span::new(1, 1, 6));
        assert_eq!(diag.kind, DiagnosticKind::SkippedErroneous);
        assert!(!diag.is_error());
        assert!(diag.message.contains("Broken"));
    }
}
