//! Token types for the view-source lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the view-source language,
//! including the layout tokens ([`TokenKind::Newline`], [`TokenKind::Indent`],
//! [`TokenKind::Dedent`]) that carry block structure, and [`Token`], which
//! pairs a kind with a source [`Span`].

use std::fmt;
use tether_types::ast::BinOp;
use tether_types::Span;

/// Words the lexer never hands out as identifiers.
///
/// The first group maps to dedicated tokens. The second group is recognised
/// so the parser can name the rejected statement precisely; each of those
/// becomes [`TokenKind::Reserved`].
pub const ALL_KEYWORDS: &[&str] = &[
    // Translated (18)
    "def", "class", "if", "elif", "else", "for", "in", "while", "return", "del",
    "pass", "lambda", "and", "or", "not", "is", "True", "False", "None",
    // Recognised, rejected (16)
    "with", "try", "except", "finally", "raise", "import", "from", "global",
    "nonlocal", "assert", "break", "continue", "async", "await", "yield", "as",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is a reserved word.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `42`, `0x1f`
    Int(i64),
    /// `3.14`, `1e-3`, or an integer too large for `i64`
    Float(f64),
    /// Any quoted string, escapes already resolved.
    Str(String),
    True,
    False,
    None,

    // ── Identifiers ──────────────────────────────────────────
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    Def,
    Class,
    If,
    Elif,
    Else,
    For,
    In,
    While,
    Return,
    Del,
    Pass,
    Lambda,
    And,
    Or,
    Not,
    Is,
    /// A recognised keyword with no dedicated token (`with`, `try`, ...).
    Reserved(String),

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Pipe,
    Amp,
    Caret,
    Tilde,
    LShift,
    RShift,
    EqEq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    /// `=`
    Eq,
    /// `+=`, `-=`, `**=`, ... carrying the underlying operator.
    AugAssign(BinOp),

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    At,
    Arrow,

    // ── Layout ───────────────────────────────────────────────
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for ordinary identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "def" => TokenKind::Def,
            "class" => TokenKind::Class,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "del" => TokenKind::Del,
            "pass" => TokenKind::Pass,
            "lambda" => TokenKind::Lambda,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            other if ALL_KEYWORDS.contains(&other) => TokenKind::Reserved(other.to_string()),
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Def
                | TokenKind::Class
                | TokenKind::If
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::In
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Del
                | TokenKind::Pass
                | TokenKind::Lambda
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::Is
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::Reserved(_)
        )
    }

    /// Layout tokens never carry source text of their own.
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::True => write!(f, "True"),
            TokenKind::False => write!(f, "False"),
            TokenKind::None => write!(f, "None"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::Def => write!(f, "def"),
            TokenKind::Class => write!(f, "class"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::For => write!(f, "for"),
            TokenKind::In => write!(f, "in"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Del => write!(f, "del"),
            TokenKind::Pass => write!(f, "pass"),
            TokenKind::Lambda => write!(f, "lambda"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Not => write!(f, "not"),
            TokenKind::Is => write!(f, "is"),
            TokenKind::Reserved(word) => write!(f, "{word}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::DoubleStar => write!(f, "**"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::DoubleSlash => write!(f, "//"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::LShift => write!(f, "<<"),
            TokenKind::RShift => write!(f, ">>"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Less => write!(f, "<"),
            TokenKind::Greater => write!(f, ">"),
            TokenKind::LessEq => write!(f, "<="),
            TokenKind::GreaterEq => write!(f, ">="),
            TokenKind::Eq => write!(f, "="),
            TokenKind::AugAssign(op) => write!(f, "{}=", op.as_str()),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::At => write!(f, "@"),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
