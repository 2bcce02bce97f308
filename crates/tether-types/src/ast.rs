//! AST node types for the view-source language.
//!
//! The parser accepts a wider grammar than the code generator translates:
//! slices, tuples, comprehensions, keyword arguments and the block statements
//! listed in [`UnsupportedStmt`] all parse, so that the code generator can
//! reject them with a message naming the node instead of a bare syntax error.
//!
//! Every node carries a [`Span`]. Spans double as node identity for the scope
//! pass, so two distinct nodes never share one.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed view source: a sequence of statements, usually one `def` or
/// `class`.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// An indented statement block.
pub type Block = Vec<Stmt>;

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Definitions
// ══════════════════════════════════════════════════════════════════════════════

/// `def name(params): body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Param>,
    /// `@decorator` lines; parsed, never translated.
    pub decorators: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// `class Name[(bases)]: body`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Ident,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// A function or lambda parameter: `name` or `name=default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    FunctionDef(Box<FunctionDef>),
    ClassDef(Box<ClassDef>),
    /// `a = b`, or the chained `a = b = c` (more than one target).
    Assign { targets: Vec<Expr>, value: Expr },
    /// `a += b`, `a -= b`, ...
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    If(Box<IfStmt>),
    For(Box<ForStmt>),
    While(Box<WhileStmt>),
    /// `return [expr]`
    Return(Option<Expr>),
    /// `del a, b`
    Delete(Vec<Expr>),
    Pass,
    /// A bare expression on its own line.
    Expr(Expr),
    /// A statement form the grammar recognises but nothing downstream
    /// translates. Its trailing tokens and any attached block are skipped.
    Unsupported(UnsupportedStmt),
}

impl StmtKind {
    /// Node name used in diagnostics.
    pub fn node_name(&self) -> &'static str {
        match self {
            StmtKind::FunctionDef(_) => "FunctionDef",
            StmtKind::ClassDef(_) => "ClassDef",
            StmtKind::Assign { .. } => "Assign",
            StmtKind::AugAssign { .. } => "AugAssign",
            StmtKind::If(_) => "If",
            StmtKind::For(_) => "For",
            StmtKind::While(_) => "While",
            StmtKind::Return(_) => "Return",
            StmtKind::Delete(_) => "Delete",
            StmtKind::Pass => "Pass",
            StmtKind::Expr(_) => "Expr",
            StmtKind::Unsupported(stmt) => stmt.node_name(),
        }
    }
}

/// Statements that parse but are never translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedStmt {
    With,
    Try,
    Raise,
    Import,
    ImportFrom,
    Global,
    Nonlocal,
    Assert,
    Break,
    Continue,
    Async,
}

impl UnsupportedStmt {
    /// Map a leading keyword to its statement form.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "with" => Self::With,
            "try" => Self::Try,
            "raise" => Self::Raise,
            "import" => Self::Import,
            "from" => Self::ImportFrom,
            "global" => Self::Global,
            "nonlocal" => Self::Nonlocal,
            "assert" => Self::Assert,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "async" => Self::Async,
            _ => return None,
        })
    }

    pub fn node_name(self) -> &'static str {
        match self {
            Self::With => "With",
            Self::Try => "Try",
            Self::Raise => "Raise",
            Self::Import => "Import",
            Self::ImportFrom => "ImportFrom",
            Self::Global => "Global",
            Self::Nonlocal => "Nonlocal",
            Self::Assert => "Assert",
            Self::Break => "Break",
            Self::Continue => "Continue",
            Self::Async => "AsyncFunctionDef",
        }
    }
}

/// `if cond: body [elif ...] [else: body]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub body: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

/// The else part of an `if`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `elif cond: ...`
    Elif(Box<IfStmt>),
    /// `else: ...`
    Else(Block),
}

/// `for target in iter: body [else: body]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    /// A name, or a tuple of names for `for k, v in ...`.
    pub target: Expr,
    pub iter: Expr,
    pub body: Block,
    pub orelse: Option<Block>,
    pub span: Span,
}

/// `while cond: body [else: body]`
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub orelse: Option<Block>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The identifier, if this is a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`
    Int(i64),
    /// `3.14`, `1e3`
    Float(f64),
    /// `"text"`, `'text'`, `"""text"""`
    Str(String),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    None,
    /// `[a, b]`
    List(Vec<Expr>),
    /// `(a, b)` or a bare `a, b`
    Tuple(Vec<Expr>),
    /// `{key: value, ...}`
    Dict(Vec<DictEntry>),

    // ── Names & access ──
    Name(String),
    /// `value.attr`
    Attribute { value: Box<Expr>, attr: Ident },
    /// `value[index]`; a slice index is an [`ExprKind::Slice`].
    Subscript { value: Box<Expr>, index: Box<Expr> },
    /// `lower:upper[:step]`, only valid as a subscript index.
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    /// `func(args...)`
    Call { func: Box<Expr>, args: Vec<Arg> },

    // ── Operators ──
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `a < b`, or a chain `a < b < c` (more than one comparison).
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
    },
    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// `lambda a, b: body`
    Lambda { params: Vec<Param>, body: Box<Expr> },

    // ── Parsed, never translated ──
    /// `[element for target in iter if cond]`
    ListComp {
        element: Box<Expr>,
        target: Box<Expr>,
        iter: Box<Expr>,
        conditions: Vec<Expr>,
    },
    /// `yield [value]`
    Yield(Option<Box<Expr>>),
}

impl ExprKind {
    /// Node name used in diagnostics.
    pub fn node_name(&self) -> &'static str {
        match self {
            ExprKind::Int(_) | ExprKind::Float(_) => "Num",
            ExprKind::Str(_) => "Str",
            ExprKind::Bool(_) | ExprKind::None => "NameConstant",
            ExprKind::List(_) => "List",
            ExprKind::Tuple(_) => "Tuple",
            ExprKind::Dict(_) => "Dict",
            ExprKind::Name(_) => "Name",
            ExprKind::Attribute { .. } => "Attribute",
            ExprKind::Subscript { .. } => "Subscript",
            ExprKind::Slice { .. } => "Slice",
            ExprKind::Call { .. } => "Call",
            ExprKind::Binary { op, .. } if op.is_logical() => "BoolOp",
            ExprKind::Binary { .. } => "BinOp",
            ExprKind::Unary { .. } => "UnaryOp",
            ExprKind::Compare { .. } => "Compare",
            ExprKind::IfExp { .. } => "IfExp",
            ExprKind::Lambda { .. } => "Lambda",
            ExprKind::ListComp { .. } => "ListComp",
            ExprKind::Yield(_) => "Yield",
        }
    }
}

/// `key: value` inside a dict literal.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub key: Expr,
    pub value: Expr,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `f(x)`
    Positional(Expr),
    /// `f(*xs)`
    Starred(Expr),
    /// `f(name=x)`
    Keyword { name: Ident, value: Expr },
    /// `f(**kw)`
    DoubleStarred(Expr),
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Binary operators, including `and`/`or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    LShift,
    RShift,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    /// Returns the operator symbol as written in view source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::Or | BinOp::And)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Less => "<",
            CmpOp::Greater => ">",
            CmpOp::LessEq => "<=",
            CmpOp::GreaterEq => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `not x`
    Not,
    /// `~x`
    Invert,
}
