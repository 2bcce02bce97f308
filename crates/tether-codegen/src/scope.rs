//! Pass 1: scope analysis.
//!
//! Walks a module keeping, per lexical scope, the set of names bound there.
//! A function body, every `if`/`elif`/`else` branch and every loop body
//! opens a scope that starts as a copy of its parent, so names bound in one
//! branch never leak into a sibling. An assignment or loop target that binds
//! a name not yet visible in the current scope is recorded by span; Pass 2
//! renders exactly those occurrences with a declaration keyword.

use std::collections::HashSet;

use tether_types::ast::*;
use tether_types::Span;

use crate::error::{CodegenError, CodegenResult};
use crate::replace::Replacements;

/// Target occurrences that introduce a new local binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    spans: HashSet<Span>,
}

impl Declarations {
    /// Whether the target node at `span` needs a declaration form.
    pub fn contains(&self, span: Span) -> bool {
        self.spans.contains(&span)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Run the scope pass over a whole module.
///
/// Names present in `replacements` are treated as always bound.
pub fn analyze(module: &Module, replacements: &Replacements) -> CodegenResult<Declarations> {
    let mut analyzer = ScopeAnalyzer {
        scopes: vec![HashSet::new()],
        declarations: Declarations::default(),
        replacements,
    };
    analyzer.visit_block(&module.body)?;
    Ok(analyzer.declarations)
}

struct ScopeAnalyzer<'a> {
    scopes: Vec<HashSet<String>>,
    declarations: Declarations,
    replacements: &'a Replacements,
}

impl ScopeAnalyzer<'_> {
    // ── Scope stack ───────────────────────────────────────────────────────────

    fn push_scope(&mut self) {
        let copy = self.scopes.last().cloned().unwrap_or_default();
        self.scopes.push(copy);
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn is_bound(&self, name: &str) -> bool {
        self.replacements.contains(name)
            || self.scopes.last().is_some_and(|scope| scope.contains(name))
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    /// Bind `name` and mark the occurrence at `span` if it is new here.
    fn declare(&mut self, name: &str, span: Span) {
        if !self.is_bound(name) {
            self.bind(name);
            self.declarations.spans.insert(span);
        }
    }

    fn scoped(&mut self, body: &[Stmt]) -> CodegenResult<()> {
        self.push_scope();
        let result = self.visit_block(body);
        self.pop_scope();
        result
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn visit_block(&mut self, body: &[Stmt]) -> CodegenResult<()> {
        for stmt in body {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                // `function inner() {}` is itself a declaration.
                self.bind(&def.name.name);
                self.push_scope();
                for param in &def.params {
                    self.bind(&param.name.name);
                }
                let result = self.visit_block(&def.body);
                self.pop_scope();
                result
            }
            StmtKind::ClassDef(class) => {
                self.bind(&class.name.name);
                self.scoped(&class.body)
            }
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    if let ExprKind::Name(name) = &target.kind {
                        self.declare(name, target.span);
                    }
                }
                Ok(())
            }
            StmtKind::If(if_stmt) => self.visit_if(if_stmt),
            StmtKind::For(for_stmt) => {
                self.push_scope();
                let result = self
                    .visit_loop_target(&for_stmt.target)
                    .and_then(|()| self.visit_block(&for_stmt.body));
                self.pop_scope();
                result?;
                match &for_stmt.orelse {
                    Some(orelse) => self.scoped(orelse),
                    None => Ok(()),
                }
            }
            StmtKind::While(while_stmt) => {
                self.scoped(&while_stmt.body)?;
                match &while_stmt.orelse {
                    Some(orelse) => self.scoped(orelse),
                    None => Ok(()),
                }
            }
            StmtKind::AugAssign { .. }
            | StmtKind::Return(_)
            | StmtKind::Delete(_)
            | StmtKind::Pass
            | StmtKind::Expr(_)
            | StmtKind::Unsupported(_) => Ok(()),
        }
    }

    fn visit_if(&mut self, if_stmt: &IfStmt) -> CodegenResult<()> {
        self.scoped(&if_stmt.body)?;
        match &if_stmt.else_branch {
            Some(ElseBranch::Elif(elif)) => self.visit_if(elif),
            Some(ElseBranch::Else(body)) => self.scoped(body),
            None => Ok(()),
        }
    }

    /// A loop target is a name or a flat tuple of names. A tuple is declared
    /// as a whole, so its names must be all new or all already bound.
    fn visit_loop_target(&mut self, target: &Expr) -> CodegenResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.declare(name, target.span);
                Ok(())
            }
            ExprKind::Tuple(elements) => {
                let names: Vec<&str> = elements.iter().filter_map(Expr::as_name).collect();
                if names.len() != elements.len() {
                    // Rejected with a better message by the renderer.
                    return Ok(());
                }
                let bound = names.iter().filter(|name| self.is_bound(name)).count();
                if bound == 0 {
                    for name in &names {
                        self.bind(name);
                    }
                    self.declarations.spans.insert(target.span);
                    Ok(())
                } else if bound == names.len() {
                    Ok(())
                } else {
                    Err(CodegenError::MixedDeclaration {
                        names: names.join(", "),
                        span: target.span,
                    })
                }
            }
            _ => Ok(()),
        }
    }
}
