//! Error types for the declaration-lowering pipeline.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LoweringError
//! ├── CompilerBug   - an expected-unreachable branch was hit; recovered with a placeholder
//! ├── Unsupported   - a legal input shape the core cannot lower yet; recovered with a placeholder
//! ├── Precondition  - an ownership/classification assumption failed; aborts one declaration
//! └── Model         - a query against the declaration model failed (ModelError)
//! ```
//!
//! Only `Precondition` and `Model` are fatal for the declaration being
//! lowered. The other two are converted into diagnostics plus an erroneous
//! placeholder node at the construct that raised them, so sibling members and
//! declarations keep lowering.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Model Errors
// ============================================================================

/// Errors raised by queries against the resolved declaration model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A declaration handle does not belong to this model.
    #[error("unknown declaration #{index}")]
    UnknownDeclaration { index: usize },

    /// A parameter reference points past the end of its parameter list.
    #[error("at {span}: '{owner}' has no parameter {index} in list {list}")]
    NoSuchParameter {
        owner: String,
        list: usize,
        index: usize,
        span: Span,
    },

    /// A type parameter reference points past the owner's type parameters.
    #[error("at {span}: '{owner}' has no type parameter {index}")]
    NoSuchTypeParameter {
        owner: String,
        index: usize,
        span: Span,
    },

    /// A declaration was attached to a container that cannot own it.
    #[error("at {span}: '{name}' cannot be declared inside '{container}'")]
    InvalidContainer {
        name: String,
        container: String,
        span: Span,
    },
}

impl ModelError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ModelError::UnknownDeclaration { .. } => Span::default(),
            ModelError::NoSuchParameter { span, .. } => *span,
            ModelError::NoSuchTypeParameter { span, .. } => *span,
            ModelError::InvalidContainer { span, .. } => *span,
        }
    }
}

// ============================================================================
// Lowering Errors
// ============================================================================

/// Errors raised while lowering a declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoweringError {
    /// Internal invariant violation.
    #[error("at {span}: compiler bug: {message}")]
    CompilerBug { message: String, span: Span },

    /// Legal input the core has no lowering for.
    #[error("at {span}: unsupported: {message}")]
    Unsupported { message: String, span: Span },

    /// Ownership classification assumption violated.
    #[error("at {span}: precondition failed: {message}")]
    Precondition { message: String, span: Span },

    /// Model query failure.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl LoweringError {
    pub fn compiler_bug(message: impl Into<String>, span: Span) -> Self {
        LoweringError::CompilerBug {
            message: message.into(),
            span,
        }
    }

    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        LoweringError::Unsupported {
            message: message.into(),
            span,
        }
    }

    pub fn precondition(message: impl Into<String>, span: Span) -> Self {
        LoweringError::Precondition {
            message: message.into(),
            span,
        }
    }

    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LoweringError::CompilerBug { span, .. } => *span,
            LoweringError::Unsupported { span, .. } => *span,
            LoweringError::Precondition { span, .. } => *span,
            LoweringError::Model(e) => e.span(),
        }
    }

    /// Whether this error aborts the declaration being lowered.
    ///
    /// Non-fatal errors are recovered in place with a placeholder node.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoweringError::Precondition { .. } | LoweringError::Model(_)
        )
    }

    /// The message without the location prefix.
    pub fn message(&self) -> String {
        match self {
            LoweringError::CompilerBug { message, .. } => format!("compiler bug: {message}"),
            LoweringError::Unsupported { message, .. } => message.clone(),
            LoweringError::Precondition { message, .. } => message.clone(),
            LoweringError::Model(e) => e.to_string(),
        }
    }
}
