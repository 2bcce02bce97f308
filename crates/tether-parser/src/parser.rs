//! Core parser infrastructure: token cursor, error reporting, helpers.

use tether_lexer::token::{Token, TokenKind};
use tether_types::ast::{Ident, Module};
use tether_types::{CompileErrors, ErrorCode, SourceError, SourceFile, Span, MAX_ERRORS};

/// The view-source parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Module`].
/// Collects errors and resynchronises at the next logical line.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    source_file: &'src SourceFile,
    errors: CompileErrors,
    /// Returned by the cursor once the stream is exhausted.
    eof: Token,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// `None` when any error was reported.
    pub module: Option<Module>,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        let eof_span = tokens.last().map(|t| t.span).unwrap_or(Span::point(1, 1));
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            eof: Token::new(TokenKind::Eof, eof_span),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the span of the last consumed token that carries source text,
    /// so node spans never stretch over trailing layout tokens.
    pub(crate) fn previous_span(&self) -> Span {
        let consumed = self.pos.min(self.tokens.len());
        self.tokens[..consumed]
            .iter()
            .rev()
            .find(|t| !t.kind.is_layout())
            .map(|t| t.span)
            .unwrap_or(Span::point(1, 1))
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Line Handling ─────────────────────────────────────────────────────────

    /// Expect the end of a logical line.
    ///
    /// A `Dedent` or `Eof` also ends the line; the lexer always emits a
    /// `Newline` before them, so this only matters after error recovery.
    pub(crate) fn expect_end_of_line(&mut self) {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
            }
            TokenKind::Dedent | TokenKind::Eof => {}
            other => {
                let message = format!("expected end of line, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
            }
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{other}'"),
                );
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = SourceError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip the rest of the current logical line, and the indented block
    /// attached to it if there is one.
    pub(crate) fn synchronize(&mut self) {
        while !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
        ) {
            self.advance();
        }
        self.eat(&TokenKind::Newline);
        if self.check_exact(&TokenKind::Indent) {
            self.skip_indented_block();
        }
    }

    /// Skip from an `Indent` through its matching `Dedent`.
    pub(crate) fn skip_indented_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Module`].
    pub fn parse(mut self) -> ParseResult {
        let module = self.parse_module();
        let module = if self.errors.has_errors() {
            None
        } else {
            Some(module)
        };
        ParseResult {
            module,
            errors: self.errors,
        }
    }
}
