//! Codegen error types.

use tether_types::{ErrorCode, SourceError, SourceFile, Span};
use thiserror::Error;

/// Errors that can occur while translating a view module.
///
/// Translation stops at the first error: no partial output is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// A node outside the translatable subset.
    #[error("'{node}' nodes are not supported for transpilation (at {span}){}", hint_suffix(.hint))]
    UnsupportedNode {
        node: &'static str,
        span: Span,
        hint: Option<&'static str>,
    },

    /// An operator the target has no rendering for.
    #[error("operator '{op}' is not supported for transpilation (at {span})")]
    UnsupportedOperator { op: &'static str, span: Span },

    /// A node that cannot be written to.
    #[error("'{node}' is not a valid assignment or loop target (at {span})")]
    UnsupportedTarget { node: &'static str, span: Span },

    /// A dict key that is not a string or number literal.
    #[error("dict keys must be string or number literals, found '{node}' (at {span})")]
    UnsupportedKey { node: &'static str, span: Span },

    /// A destructuring loop target where only some names are already bound.
    #[error("loop target binds both new and existing names ({names}) (at {span})")]
    MixedDeclaration { names: String, span: Span },
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    match hint {
        Some(hint) => format!(": {hint}"),
        None => String::new(),
    }
}

impl CodegenError {
    pub(crate) fn unsupported(node: &'static str, span: Span) -> Self {
        Self::UnsupportedNode {
            node,
            span,
            hint: None,
        }
    }

    pub(crate) fn unsupported_with(node: &'static str, span: Span, hint: &'static str) -> Self {
        Self::UnsupportedNode {
            node,
            span,
            hint: Some(hint),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedNode { .. } => ErrorCode::UNSUPPORTED_NODE,
            Self::UnsupportedOperator { .. } => ErrorCode::UNSUPPORTED_OPERATOR,
            Self::UnsupportedTarget { .. } => ErrorCode::UNSUPPORTED_TARGET,
            Self::UnsupportedKey { .. } => ErrorCode::UNSUPPORTED_KEY,
            Self::MixedDeclaration { .. } => ErrorCode::MIXED_DECLARATION,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnsupportedNode { span, .. }
            | Self::UnsupportedOperator { span, .. }
            | Self::UnsupportedTarget { span, .. }
            | Self::UnsupportedKey { span, .. }
            | Self::MixedDeclaration { span, .. } => *span,
        }
    }

    /// Convert into a positioned diagnostic against `source`.
    pub fn to_source_error(&self, source: &SourceFile) -> SourceError {
        let span = self.span();
        let line = source.line(span.start_line).unwrap_or("");
        let error = SourceError::new(&source.name, self.code(), self.to_string(), span, line);
        match self {
            Self::UnsupportedNode {
                hint: Some(hint), ..
            } => error.with_suggestion(*hint),
            _ => error,
        }
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
