//! Core view-source lexer: converts source text to a token stream.
//!
//! Features:
//! - Indentation-structured blocks via `Indent` / `Dedent` layout tokens
//! - Blank and comment-only lines never affect indentation
//! - Inside `()`, `[]`, `{}` newlines and indentation are insignificant
//! - Single, double and triple-quoted strings with backslash escapes
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use tether_types::ast::BinOp;
use tether_types::{CompileErrors, ErrorCode, SourceError, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// Columns a tab advances to, matching the usual Python convention.
const TAB_WIDTH: u32 = 8;

/// The view-source lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    errors: CompileErrors,
    tokens: Vec<Token>,
    /// Widths of the open indentation levels; the bottom entry is always 0.
    indent_stack: Vec<u32>,
    /// Open bracket depth. Layout is suspended while it is non-zero.
    bracket_depth: u32,
    /// Set after a significant newline; the next scan measures indentation.
    at_line_start: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            tokens: Vec::new(),
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        while !self.at_end() && !self.error_cap_reached() {
            if self.at_line_start {
                self.at_line_start = false;
                self.scan_indentation();
            } else {
                self.scan_token();
            }
        }
        self.finish();

        LexResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    /// Close the last logical line and every open block, then append `Eof`.
    fn finish(&mut self) {
        if matches!(self.tokens.last(), Some(t) if t.kind != TokenKind::Newline) {
            self.push_token(TokenKind::Newline, self.current_span());
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push_token(TokenKind::Dedent, self.current_span());
        }
        self.push_token(TokenKind::Eof, self.current_span());
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume `expected` if it is next.
    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn error_cap_reached(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn current_indent(&self) -> u32 {
        *self.indent_stack.last().unwrap_or(&0)
    }

    fn push_token(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = SourceError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = SourceError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────

    /// Measure the indentation of a new logical line and emit `Indent` /
    /// `Dedent` tokens against the indentation stack.
    fn scan_indentation(&mut self) {
        let mut width = 0u32;
        while let Some(ch) = self.peek() {
            match ch {
                b' ' => width += 1,
                b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                b'\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        // Blank and comment-only lines are left for `scan_token` to skip.
        let blank = match self.peek() {
            None | Some(b'\n') | Some(b'#') => true,
            Some(b'\r') => self.peek_at(1) == Some(b'\n'),
            _ => false,
        };
        if blank {
            return;
        }

        let span = self.current_span();
        if width > self.current_indent() {
            self.indent_stack.push(width);
            self.push_token(TokenKind::Indent, span);
            return;
        }
        while width < self.current_indent() {
            self.indent_stack.pop();
            self.push_token(TokenKind::Dedent, span);
        }
        if width != self.current_indent() {
            self.emit_error(
                ErrorCode::INCONSISTENT_INDENT,
                "Unindent does not match any outer indentation level",
                span,
            );
            // Recover by treating this width as a level of its own.
            self.indent_stack.push(width);
        }
    }

    /// Handle a newline character that has just been consumed.
    fn end_line(&mut self, span: Span) {
        if self.bracket_depth > 0 {
            return;
        }
        if matches!(self.tokens.last(), Some(t) if t.kind != TokenKind::Newline) {
            self.push_token(TokenKind::Newline, span);
        }
        self.at_line_start = true;
    }

    /// Skip spaces, tabs and carriage returns (NOT newlines).
    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r' | b'\x0c') = self.peek() {
            self.advance();
        }
    }

    /// Skip a `#` comment, up to but not including the newline.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token (or one piece of trivia) and push what it produces.
    fn scan_token(&mut self) {
        self.skip_whitespace();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.col;
        let Some(ch) = self.advance() else {
            return;
        };

        let kind = match ch {
            b'\n' => {
                let span = self.span_from(start_line, start_col);
                self.end_line(span);
                return;
            }
            b'#' => {
                self.skip_comment();
                return;
            }
            b'\\' => {
                // Explicit line continuation.
                self.eat(b'\r');
                if !self.eat(b'\n') {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        "Unexpected character '\\' outside a string",
                        span,
                    );
                }
                return;
            }

            b'"' | b'\'' => self.scan_string(ch, start_line, start_col),
            b'0'..=b'9' => self.scan_number(start_pos, start_line, start_col),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                self.scan_number(start_pos, start_line, start_col)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start_pos),

            // ── Brackets ──
            b'(' => self.open_bracket(TokenKind::LParen),
            b'[' => self.open_bracket(TokenKind::LBracket),
            b'{' => self.open_bracket(TokenKind::LBrace),
            b')' => self.close_bracket(TokenKind::RParen),
            b']' => self.close_bracket(TokenKind::RBracket),
            b'}' => self.close_bracket(TokenKind::RBrace),

            // ── Operators ──
            b'+' => self.with_assign(BinOp::Add, TokenKind::Plus),
            b'-' => {
                if self.eat(b'>') {
                    TokenKind::Arrow
                } else {
                    self.with_assign(BinOp::Sub, TokenKind::Minus)
                }
            }
            b'*' => {
                if self.eat(b'*') {
                    self.with_assign(BinOp::Pow, TokenKind::DoubleStar)
                } else {
                    self.with_assign(BinOp::Mul, TokenKind::Star)
                }
            }
            b'/' => {
                if self.eat(b'/') {
                    self.with_assign(BinOp::FloorDiv, TokenKind::DoubleSlash)
                } else {
                    self.with_assign(BinOp::Div, TokenKind::Slash)
                }
            }
            b'%' => self.with_assign(BinOp::Mod, TokenKind::Percent),
            b'|' => self.with_assign(BinOp::BitOr, TokenKind::Pipe),
            b'&' => self.with_assign(BinOp::BitAnd, TokenKind::Amp),
            b'^' => self.with_assign(BinOp::BitXor, TokenKind::Caret),
            b'~' => TokenKind::Tilde,
            b'<' => {
                if self.eat(b'<') {
                    self.with_assign(BinOp::LShift, TokenKind::LShift)
                } else if self.eat(b'=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    self.with_assign(BinOp::RShift, TokenKind::RShift)
                } else if self.eat(b'=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::NotEq
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        "Unexpected character '!'",
                        span,
                        "Use 'not' for boolean negation, or '!=' for inequality",
                    );
                    return;
                }
            }

            // ── Punctuation ──
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b'@' => TokenKind::At,
            b';' => {
                let span = self.span_from(start_line, start_col);
                self.emit_error_with_suggestion(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    "Unexpected character ';'",
                    span,
                    "Put each statement on its own line",
                );
                return;
            }

            _ => {
                // Swallow the rest of a multi-byte character.
                while let Some(0x80..=0xBF) = self.peek() {
                    self.advance();
                }
                let text = String::from_utf8_lossy(&self.source[start_pos..self.pos]).into_owned();
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("Unexpected character '{text}'"),
                    span,
                );
                return;
            }
        };

        let span = self.span_from(start_line, start_col);
        self.push_token(kind, span);
    }

    fn open_bracket(&mut self, kind: TokenKind) -> TokenKind {
        self.bracket_depth += 1;
        kind
    }

    fn close_bracket(&mut self, kind: TokenKind) -> TokenKind {
        self.bracket_depth = self.bracket_depth.saturating_sub(1);
        kind
    }

    /// `op=` if an `=` follows, else the plain operator token.
    fn with_assign(&mut self, op: BinOp, plain: TokenKind) -> TokenKind {
        if self.eat(b'=') {
            TokenKind::AugAssign(op)
        } else {
            plain
        }
    }

    fn scan_identifier(&mut self, start_pos: usize) -> TokenKind {
        while let Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') = self.peek() {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start_pos..self.pos]).into_owned();
        TokenKind::from_keyword(&text).unwrap_or(TokenKind::Identifier(text))
    }

    // ─────────────────────────────────────────────────────────────
    // Numbers
    // ─────────────────────────────────────────────────────────────

    fn eat_digits(&mut self) {
        while let Some(b'0'..=b'9' | b'_') = self.peek() {
            self.advance();
        }
    }

    /// Text of the literal so far, with `_` separators removed.
    fn literal_text(&self, start_pos: usize) -> String {
        self.source[start_pos..self.pos]
            .iter()
            .filter(|&&b| b != b'_')
            .map(|&b| b as char)
            .collect()
    }

    fn scan_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> TokenKind {
        let first = self.source[start_pos];

        if first == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || c == b'_') {
                self.advance();
            }
            let digits = self.literal_text(digits_start);
            return match i64::from_str_radix(&digits, 16) {
                Ok(n) => TokenKind::Int(n),
                Err(_) => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("Invalid hexadecimal literal '0x{digits}'"),
                        span,
                    );
                    TokenKind::Int(0)
                }
            };
        }

        let mut is_float = first == b'.';
        self.eat_digits();
        if !is_float && self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9'))
        {
            is_float = true;
            self.advance();
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let exponent_follows = match self.peek_at(1) {
                Some(b'0'..=b'9') => true,
                Some(b'+' | b'-') => matches!(self.peek_at(2), Some(b'0'..=b'9')),
                _ => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.advance();
                }
                self.eat_digits();
            }
        }

        let text = self.literal_text(start_pos);
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return TokenKind::Int(n);
            }
        }
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Float(n),
            Err(_) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Invalid number literal '{text}'"),
                    span,
                );
                TokenKind::Int(0)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Strings
    // ─────────────────────────────────────────────────────────────

    /// Scan a string body after its opening quote has been consumed.
    fn scan_string(&mut self, quote: u8, start_line: u32, start_col: u32) -> TokenKind {
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => {
                    self.unterminated_string(start_line, start_col);
                    break;
                }
                Some(b'\n') if !triple => {
                    self.unterminated_string(start_line, start_col);
                    break;
                }
                Some(ch) if ch == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                    buf.push(ch);
                }
                Some(b'\\') => self.scan_escape_sequence(&mut buf),
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        TokenKind::Str(String::from_utf8_lossy(&buf).into_owned())
    }

    fn unterminated_string(&mut self, start_line: u32, start_col: u32) {
        let span = self.span_from(start_line, start_col);
        self.emit_error(
            ErrorCode::UNTERMINATED_STRING,
            "Unterminated string literal",
            span,
        );
    }

    /// Scan an escape sequence starting at the `\` and append its bytes.
    ///
    /// Unknown escapes keep the backslash, so `"\d"` stays two characters.
    fn scan_escape_sequence(&mut self, buf: &mut Vec<u8>) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        let unescaped = match self.advance() {
            // Escaped newline joins the lines.
            Some(b'\n') => return,
            Some(b'n') => '\n',
            Some(b't') => '\t',
            Some(b'r') => '\r',
            Some(b'0') => '\0',
            Some(b'\\') => '\\',
            Some(b'\'') => '\'',
            Some(b'"') => '"',
            Some(kind @ (b'x' | b'u')) => {
                let width = if kind == b'x' { 2 } else { 4 };
                match self.read_hex(width).and_then(char::from_u32) {
                    Some(ch) => ch,
                    None => {
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(
                            ErrorCode::UNEXPECTED_CHARACTER,
                            format!("Invalid \\{} escape", kind as char),
                            span,
                        );
                        return;
                    }
                }
            }
            Some(other) => {
                buf.push(b'\\');
                buf.push(other);
                return;
            }
            None => return,
        };

        let mut utf8 = [0u8; 4];
        buf.extend_from_slice(unescaped.encode_utf8(&mut utf8).as_bytes());
    }

    fn read_hex(&mut self, width: usize) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..width {
            let digit = (self.peek()? as char).to_digit(16)?;
            self.advance();
            value = value * 16 + digit;
        }
        Some(value)
    }
}
