//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 13. `lambda`
//! 12. `a if c else b`
//! 11. `or`
//! 10. `and`
//! 9. `not`
//! 8. comparisons `== != < > <= >= in not in is is not` (chainable)
//! 7. `|`
//! 6. `^`
//! 5. `&`
//! 4. `<<`, `>>`
//! 3. `+`, `-`
//! 2. `*`, `/`, `//`, `%`
//! 1. unary `+`, `-`, `~`, then `**` (right-associative), then
//!    `.attr`, `[index]`, `(args)`

use tether_lexer::token::TokenKind;
use tether_types::ast::*;
use tether_types::{ErrorCode, Span};

use crate::parser::Parser;

/// Maximum expression nesting depth before the parser gives up.
const MAX_EXPR_DEPTH: u32 = 64;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a single expression (lambda and ternary included).
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = if self.check_exact(&TokenKind::Lambda) {
            self.parse_lambda()
        } else {
            self.parse_ternary()
        };
        self.expr_depth -= 1;
        result
    }

    /// `Expr { "," Expr } [ "," ]`; more than one element makes a tuple.
    pub(crate) fn parse_expression_list(&mut self) -> Option<Expr> {
        let first = self.parse_expression()?;
        if !self.check_exact(&TokenKind::Comma) {
            return Some(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_expression_list_end() {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        Some(self.tuple(elements))
    }

    /// Loop and comprehension targets: `x` or `k, v`. Stops before `in`.
    pub(crate) fn parse_target_list(&mut self) -> Option<Expr> {
        let first = self.parse_bitor()?;
        if !self.check_exact(&TokenKind::Comma) {
            return Some(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check_exact(&TokenKind::In) {
                break;
            }
            elements.push(self.parse_bitor()?);
        }
        Some(self.tuple(elements))
    }

    fn at_expression_list_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::Dedent
                | TokenKind::Eof
                | TokenKind::Eq
                | TokenKind::AugAssign(_)
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }

    fn tuple(&self, elements: Vec<Expr>) -> Expr {
        let span = match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => self.previous_span(),
        };
        Expr::new(ExprKind::Tuple(elements), span)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `"lambda" Params ":" Expr`
    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `lambda`
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_expression()?;
        let span = start.merge(body.span);
        Some(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `OrExpr [ "if" OrExpr "else" Expr ]`
    fn parse_ternary(&mut self) -> Option<Expr> {
        let body = self.parse_or()?;
        if !self.check_exact(&TokenKind::If) {
            return Some(body);
        }
        self.advance();
        let test = self.parse_or()?;
        self.expect(&TokenKind::Else)?;
        let orelse = self.parse_expression()?;
        let span = body.span.merge(orelse.span);
        Some(Expr::new(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            span,
        ))
    }

    /// `AndExpr { "or" AndExpr }`
    pub(crate) fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Some(left)
    }

    /// `NotExpr { "and" NotExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = binary(left, BinOp::And, right);
        }
        Some(left)
    }

    /// `"not" NotExpr | Comparison`
    fn parse_not(&mut self) -> Option<Expr> {
        if self.check_exact(&TokenKind::Not) {
            let start = self.advance().span;
            let operand = self.parse_not()?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    /// `BitOr { CmpOp BitOr }`
    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_bitor()?;
        let mut comparisons = Vec::new();
        while let Some(op) = self.eat_comparison_op() {
            comparisons.push((op, self.parse_bitor()?));
        }
        if comparisons.is_empty() {
            return Some(left);
        }
        let end = comparisons.last().map(|(_, e)| e.span).unwrap_or(left.span);
        let span = left.span.merge(end);
        Some(Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                comparisons,
            },
            span,
        ))
    }

    fn eat_comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek_kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Less => CmpOp::Less,
            TokenKind::Greater => CmpOp::Greater,
            TokenKind::LessEq => CmpOp::LessEq,
            TokenKind::GreaterEq => CmpOp::GreaterEq,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.look_ahead(1) == &TokenKind::In => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is if self.look_ahead(1) == &TokenKind::Not => {
                self.advance();
                CmpOp::IsNot
            }
            TokenKind::Is => CmpOp::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// `BitXor { "|" BitXor }`
    pub(crate) fn parse_bitor(&mut self) -> Option<Expr> {
        let mut left = self.parse_bitxor()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_bitxor()?;
            left = binary(left, BinOp::BitOr, right);
        }
        Some(left)
    }

    fn parse_bitxor(&mut self) -> Option<Expr> {
        let mut left = self.parse_bitand()?;
        while self.eat(&TokenKind::Caret) {
            let right = self.parse_bitand()?;
            left = binary(left, BinOp::BitXor, right);
        }
        Some(left)
    }

    fn parse_bitand(&mut self) -> Option<Expr> {
        let mut left = self.parse_shift()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.parse_shift()?;
            left = binary(left, BinOp::BitAnd, right);
        }
        Some(left)
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::LShift => BinOp::LShift,
                TokenKind::RShift => BinOp::RShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `Term { ("+" | "-") Term }`
    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `Factor { ("*" | "/" | "//" | "%") Factor }`
    fn parse_term(&mut self) -> Option<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `("+" | "-" | "~") Factor | Power`
    fn parse_factor(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        let operand = self.parse_factor()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `Postfix [ "**" Factor ]`
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Some(binary(base, BinOp::Pow, exponent));
        }
        Some(base)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix: attribute, subscript, call
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_identifier()?;
                    let span = expr.span.merge(attr.span);
                    expr = Expr::new(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_subscript_index()?;
                    let end = self.expect(&TokenKind::RBracket)?.span;
                    let span = expr.span.merge(end);
                    expr = Expr::new(
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let end = self.expect(&TokenKind::RParen)?.span;
                    let span = expr.span.merge(end);
                    expr = Expr::new(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    /// An index expression, or `[lower]:[upper][:step]` as a slice.
    fn parse_subscript_index(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let lower = if self.check_exact(&TokenKind::Colon) {
            None
        } else {
            let index = self.parse_expression_list()?;
            if !self.check_exact(&TokenKind::Colon) {
                return Some(index);
            }
            Some(Box::new(index))
        };

        self.advance(); // eat `:`
        let upper = self.parse_slice_bound()?;
        let step = if self.eat(&TokenKind::Colon) {
            self.parse_slice_bound()?
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Slice { lower, upper, step }, span))
    }

    /// An optional slice bound. `Some(None)` means the bound was omitted.
    fn parse_slice_bound(&mut self) -> Option<Option<Box<Expr>>> {
        if matches!(
            self.peek_kind(),
            TokenKind::Colon | TokenKind::RBracket | TokenKind::Comma
        ) {
            return Some(None);
        }
        Some(Some(Box::new(self.parse_expression()?)))
    }

    /// `[ Arg { "," Arg } [ "," ] ]`, stopping before `)`.
    fn parse_call_args(&mut self) -> Option<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            let arg = match self.peek_kind() {
                TokenKind::Star => {
                    self.advance();
                    Arg::Starred(self.parse_expression()?)
                }
                TokenKind::DoubleStar => {
                    self.advance();
                    Arg::DoubleStarred(self.parse_expression()?)
                }
                TokenKind::Identifier(_) if self.look_ahead(1) == &TokenKind::Eq => {
                    let name = self.expect_identifier()?;
                    self.advance(); // eat `=`
                    let value = self.parse_expression()?;
                    Arg::Keyword { name, value }
                }
                _ => Arg::Positional(self.parse_expression()?),
            };
            args.push(arg);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(args)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Atoms
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_atom(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Int(n) => {
                self.advance();
                ExprKind::Int(n)
            }
            TokenKind::Float(n) => {
                self.advance();
                ExprKind::Float(n)
            }
            TokenKind::Str(_) => return Some(self.parse_strings()),
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::None => {
                self.advance();
                ExprKind::None
            }
            TokenKind::Identifier(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            TokenKind::LParen => return self.parse_paren(),
            TokenKind::LBracket => return self.parse_list(),
            TokenKind::LBrace => return self.parse_dict(),
            TokenKind::Reserved(word) if word == "yield" => return self.parse_yield(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                return None;
            }
        };
        Some(Expr::new(kind, span))
    }

    /// Adjacent string literals concatenate: `"a" "b"` is `"ab"`.
    fn parse_strings(&mut self) -> Expr {
        let start = self.current_span();
        let mut text = String::new();
        while let TokenKind::Str(part) = self.peek_kind() {
            text.push_str(part);
            self.advance();
        }
        Expr::new(ExprKind::Str(text), start.merge(self.previous_span()))
    }

    /// `()`, `(expr)`, or a parenthesised tuple.
    fn parse_paren(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `(`
        if self.check_exact(&TokenKind::RParen) {
            let end = self.advance().span;
            return Some(Expr::new(ExprKind::Tuple(Vec::new()), start.merge(end)));
        }
        let first = self.parse_expression()?;
        if self.check_exact(&TokenKind::For) {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "generator expressions are not part of the view language",
            );
            return None;
        }
        if !self.check_exact(&TokenKind::Comma) {
            self.expect(&TokenKind::RParen)?;
            return Some(first);
        }
        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check_exact(&TokenKind::RParen) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        let end = self.expect(&TokenKind::RParen)?.span;
        Some(Expr::new(ExprKind::Tuple(elements), start.merge(end)))
    }

    /// `[ ]`, `[a, b]`, or `[element for target in iter if cond]`.
    fn parse_list(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `[`
        let mut elements = Vec::new();
        while !self.check_exact(&TokenKind::RBracket) && !self.at_end() {
            let element = self.parse_expression()?;
            if elements.is_empty() && self.check_exact(&TokenKind::For) {
                return self.parse_list_comp(start, element);
            }
            elements.push(element);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBracket)?.span;
        Some(Expr::new(ExprKind::List(elements), start.merge(end)))
    }

    fn parse_list_comp(&mut self, start: Span, element: Expr) -> Option<Expr> {
        self.advance(); // eat `for`
        let target = self.parse_target_list()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_or()?;
        let mut conditions = Vec::new();
        while self.eat(&TokenKind::If) {
            conditions.push(self.parse_or()?);
        }
        let end = self.expect(&TokenKind::RBracket)?.span;
        Some(Expr::new(
            ExprKind::ListComp {
                element: Box::new(element),
                target: Box::new(target),
                iter: Box::new(iter),
                conditions,
            },
            start.merge(end),
        ))
    }

    /// `{ }` or `{key: value, ...}`.
    fn parse_dict(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `{`
        let mut entries = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push(DictEntry { key, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RBrace)?.span;
        Some(Expr::new(ExprKind::Dict(entries), start.merge(end)))
    }

    /// `"yield" [ ExprList ]`
    fn parse_yield(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `yield`
        if matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof | TokenKind::RParen
        ) {
            return Some(Expr::new(ExprKind::Yield(None), start));
        }
        let value = self.parse_expression_list()?;
        let span = start.merge(value.span);
        Some(Expr::new(ExprKind::Yield(Some(Box::new(value))), span))
    }
}

/// Build a binary node spanning both operands.
fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
