//! Shared types for the tether view compiler.
//!
//! This crate defines the view-source AST, source spans and the structured
//! diagnostics used by every compiler stage.

mod error;
mod span;
pub mod ast;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, Severity, SourceError, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used throughout the compiler front end.
pub type Result<T> = std::result::Result<T, SourceError>;
