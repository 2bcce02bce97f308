//! Statement parsing.

use crate::parser::Parser;
use tether_lexer::token::TokenKind;
use tether_types::ast::*;
use tether_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a single statement, compound or simple.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Def => self.parse_function_def(Vec::new()),
            TokenKind::Class => self.parse_class_def(Vec::new()),
            TokenKind::At => self.parse_decorated(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Reserved(word) => match UnsupportedStmt::from_keyword(word) {
                Some(stmt) => Some(self.parse_unsupported(stmt)),
                // `yield` and `await` start expression statements.
                None if word == "yield" || word == "await" => self.parse_simple_statement(),
                None => {
                    let message = format!("unexpected '{word}'");
                    self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                    None
                }
            },
            _ => self.parse_simple_statement(),
        }
    }

    /// A statement that fits on one logical line.
    pub(crate) fn parse_simple_statement(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let kind = match self.peek_kind() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Return => {
                self.advance();
                if self.at_line_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expression_list()?))
                }
            }
            TokenKind::Del => {
                self.advance();
                let mut targets = vec![self.parse_bitor()?];
                while self.eat(&TokenKind::Comma) {
                    targets.push(self.parse_bitor()?);
                }
                StmtKind::Delete(targets)
            }
            _ => self.parse_assignment_or_expr()?,
        };
        let span = start.merge(self.previous_span());
        self.expect_end_of_line();
        Some(Stmt::new(kind, span))
    }

    /// `target = value`, `target op= value`, or a bare expression.
    fn parse_assignment_or_expr(&mut self) -> Option<StmtKind> {
        let first = self.parse_expression_list()?;

        if self.check_exact(&TokenKind::Eq) {
            let mut targets = vec![first];
            let mut value = None;
            while self.eat(&TokenKind::Eq) {
                let next = self.parse_expression_list()?;
                if let Some(previous) = value.replace(next) {
                    targets.push(previous);
                }
            }
            let value = value?;
            return Some(StmtKind::Assign { targets, value });
        }

        if let TokenKind::AugAssign(op) = *self.peek_kind() {
            self.advance();
            let value = self.parse_expression_list()?;
            return Some(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }

        Some(StmtKind::Expr(first))
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
        )
    }

    /// `"if" Expr Block { "elif" Expr Block } [ "else" Block ]`
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let if_stmt = self.parse_if_chain()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(StmtKind::If(Box::new(if_stmt)), span))
    }

    /// Parse from an `if` or `elif` keyword to the end of the chain.
    fn parse_if_chain(&mut self) -> Option<IfStmt> {
        let start = self.current_span();
        self.advance(); // eat `if` / `elif`
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        let else_branch = match self.peek_kind() {
            TokenKind::Elif => Some(ElseBranch::Elif(Box::new(self.parse_if_chain()?))),
            TokenKind::Else => {
                self.advance();
                Some(ElseBranch::Else(self.parse_block()?))
            }
            _ => None,
        };

        Some(IfStmt {
            condition,
            body,
            else_branch,
            span: start.merge(self.previous_span()),
        })
    }

    /// `"for" Targets "in" ExprList Block [ "else" Block ]`
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `for`
        let target = self.parse_target_list()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_expression_list()?;
        let body = self.parse_block()?;
        let orelse = self.parse_loop_else()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::For(Box::new(ForStmt {
                target,
                iter,
                body,
                orelse,
                span,
            })),
            span,
        ))
    }

    /// `"while" Expr Block [ "else" Block ]`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `while`
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let orelse = self.parse_loop_else()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::While(Box::new(WhileStmt {
                condition,
                body,
                orelse,
                span,
            })),
            span,
        ))
    }

    /// The optional `else:` block of a loop. `Some(None)` means absent.
    fn parse_loop_else(&mut self) -> Option<Option<Block>> {
        if self.eat(&TokenKind::Else) {
            Some(Some(self.parse_block()?))
        } else {
            Some(None)
        }
    }
}
