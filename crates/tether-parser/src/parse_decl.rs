//! Module, definition and block parsing.

use crate::parser::Parser;
use tether_lexer::token::TokenKind;
use tether_types::ast::*;
use tether_types::{ErrorCode, Span};

impl<'src> Parser<'src> {
    /// `Module = { Statement }`
    pub(crate) fn parse_module(&mut self) -> Module {
        let start = self.current_span();
        let mut body = Vec::new();

        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            match self.peek_kind() {
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Indent => {
                    self.error_at_current(ErrorCode::INCONSISTENT_INDENT, "unexpected indent");
                    self.skip_indented_block();
                }
                TokenKind::Dedent => {
                    self.advance();
                }
                _ => match self.parse_statement() {
                    Some(stmt) => body.push(stmt),
                    None => self.synchronize(),
                },
            }
        }

        Module {
            body,
            span: start.merge(self.previous_span()),
        }
    }

    /// `Block = ":" ( SimpleStatement | Newline Indent { Statement } Dedent )`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        self.expect(&TokenKind::Colon)?;

        if !self.check_exact(&TokenKind::Newline) {
            // `if ready: pass` on one line.
            let stmt = self.parse_simple_statement()?;
            return Some(vec![stmt]);
        }
        self.advance();

        if !self.eat(&TokenKind::Indent) {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected an indented block");
            return None;
        }

        let mut body = Vec::new();
        while !self.check_exact(&TokenKind::Dedent) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        self.eat(&TokenKind::Dedent);
        Some(body)
    }

    /// `{ "@" Expr Newline } ( FunctionDef | ClassDef )`
    pub(crate) fn parse_decorated(&mut self) -> Option<Stmt> {
        let mut decorators = Vec::new();
        while self.eat(&TokenKind::At) {
            decorators.push(self.parse_expression()?);
            self.expect_end_of_line();
        }
        match self.peek_kind() {
            TokenKind::Def => self.parse_function_def(decorators),
            TokenKind::Class => self.parse_class_def(decorators),
            other => {
                let message = format!("expected 'def' or 'class' after decorator, got '{other}'");
                self.error_at_current(ErrorCode::EXPECTED_ITEM, message);
                None
            }
        }
    }

    /// `"def" Ident "(" Params ")" [ "->" Expr ] Block`
    pub(crate) fn parse_function_def(&mut self, decorators: Vec<Expr>) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `def`
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen)?;
        if self.eat(&TokenKind::Arrow) {
            // Return annotations are accepted and ignored.
            self.parse_expression()?;
        }
        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::FunctionDef(Box::new(FunctionDef {
                name,
                params,
                decorators,
                body,
                span,
            })),
            span,
        ))
    }

    /// `"class" Ident [ "(" Bases ")" ] Block`
    pub(crate) fn parse_class_def(&mut self, decorators: Vec<Expr>) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `class`
        let name = self.expect_identifier()?;
        let mut bases = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
                bases.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::ClassDef(Box::new(ClassDef {
                name,
                bases,
                decorators,
                body,
                span,
            })),
            span,
        ))
    }

    /// `Params = [ Param { "," Param } [ "," ] ]`, stopping before `terminator`.
    ///
    /// `Param = Ident [ ":" Expr ] [ "=" Expr ]`. Annotations are skipped.
    pub(crate) fn parse_params(&mut self, terminator: &TokenKind) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        while !self.check_exact(terminator) && !self.at_end() {
            let name = self.expect_identifier()?;
            if terminator != &TokenKind::Colon && self.eat(&TokenKind::Colon) {
                self.parse_expression()?;
            }
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let span = match &default {
                Some(expr) => name.span.merge(expr.span),
                None => name.span,
            };
            params.push(Param {
                name,
                default,
                span,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// Skip a statement this language recognises but never translates,
    /// including any attached block and trailing `except`/`else`/`finally`
    /// clauses. The statement span covers the header line only.
    pub(crate) fn parse_unsupported(&mut self, stmt: UnsupportedStmt) -> Stmt {
        let start = self.current_span();
        let span = start.merge(self.skip_clause());
        if stmt == UnsupportedStmt::Try {
            while self.at_clause_continuation() {
                self.skip_clause();
            }
        }
        Stmt::new(StmtKind::Unsupported(stmt), span)
    }

    /// Skip one header line plus its block; returns the header's last span.
    fn skip_clause(&mut self) -> Span {
        let mut end = self.current_span();
        while !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
        ) {
            end = self.advance().span;
        }
        self.eat(&TokenKind::Newline);
        if self.check_exact(&TokenKind::Indent) {
            self.skip_indented_block();
        }
        end
    }

    fn at_clause_continuation(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Else => true,
            TokenKind::Reserved(word) => word == "except" || word == "finally",
            _ => false,
        }
    }
}
