use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors stored before the lexer/parser give up.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Unsupported,
    Scope,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const INCONSISTENT_INDENT: Self = Self(102);
    pub const UNEXPECTED_CHARACTER: Self = Self(103);
    pub const EXPECTED_ITEM: Self = Self(104);
    pub const NESTING_TOO_DEEP: Self = Self(105);

    // ── Unsupported constructs (E200–E299) ──
    pub const UNSUPPORTED_NODE: Self = Self(200);
    pub const UNSUPPORTED_OPERATOR: Self = Self(201);
    pub const UNSUPPORTED_TARGET: Self = Self(202);
    pub const UNSUPPORTED_KEY: Self = Self(203);

    // ── Scope errors (E300–E399) ──
    pub const MIXED_DECLARATION: Self = Self(300);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Unsupported,
            300..=399 => ErrorCategory::Scope,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Scope => write!(f, "scope"),
        }
    }
}

/// A structured diagnostic pointing into a view source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{file}:{span}: {code} [{category}] {message}")]
pub struct SourceError {
    /// Source file name.
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Derived from `code`.
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SourceError {
    /// Create a new error.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Diagnostics collected by one lexing or parsing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<SourceError>,
    pub total_errors: usize,
}

impl CompileErrors {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, storing at most [`MAX_ERRORS`] of them.
    pub fn push_error(&mut self, error: SourceError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Absorb another collection (lexer errors into parser errors).
    pub fn extend(&mut self, other: CompileErrors) {
        let unstored = other.total_errors.saturating_sub(other.errors.len());
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += unstored;
    }

    /// The first stored error, if any.
    pub fn first(&self) -> Option<&SourceError> {
        self.errors.first()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{error}")?;
        }
        if self.total_errors > self.errors.len() {
            write!(f, "\n... and {} more", self.total_errors - self.errors.len())?;
        }
        Ok(())
    }
}
