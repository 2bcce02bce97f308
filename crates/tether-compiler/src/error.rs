//! Compiler error types.

use tether_types::{CompileErrors, SourceError};
use thiserror::Error;

/// Errors from compiling a view source.
///
/// `Clone` so a failed compilation can be cached alongside successful ones.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Lexer or parser diagnostics.
    #[error("{0}")]
    Syntax(CompileErrors),

    /// The code generator rejected a construct.
    #[error("{0}")]
    Unsupported(Box<SourceError>),

    /// A view source must define exactly one `def` or `class`.
    #[error("view '{view}' must define exactly one 'def' or 'class', found {found}")]
    ItemCount { view: String, found: usize },
}

impl CompileError {
    /// Every positioned diagnostic carried by this error.
    pub fn diagnostics(&self) -> Vec<&SourceError> {
        match self {
            Self::Syntax(errors) => errors.errors.iter().collect(),
            Self::Unsupported(error) => vec![error.as_ref()],
            Self::ItemCount { .. } => Vec::new(),
        }
    }
}

/// Compiler result type alias.
pub type CompileResult<T> = Result<T, CompileError>;
