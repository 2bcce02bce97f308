//! Statement rendering.

use tether_types::ast::*;
use tether_types::Span;

use crate::error::{CodegenError, CodegenResult};
use crate::expr::emit_expr;
use crate::translate::{emit_class, emit_function, EmitContext};

/// Render a block, one string per statement.
pub fn emit_stmts(stmts: &[Stmt], ctx: &EmitContext<'_>) -> CodegenResult<Vec<String>> {
    stmts.iter().map(|stmt| emit_stmt(stmt, ctx)).collect()
}

/// Render a single statement.
pub fn emit_stmt(stmt: &Stmt, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    match &stmt.kind {
        StmtKind::FunctionDef(def) => emit_function(def, ctx),
        StmtKind::ClassDef(class) => emit_class(class, ctx),
        StmtKind::Assign { targets, value } => emit_assign(targets, value, stmt, ctx),
        StmtKind::AugAssign { target, op, value } => {
            if *op != BinOp::Add {
                return Err(CodegenError::UnsupportedOperator {
                    op: augmented_symbol(*op),
                    span: stmt.span,
                });
            }
            let target = emit_store(target, ctx)?;
            let value = emit_expr(value, ctx)?;
            Ok(ctx.target.add_assign(&target, &value))
        }
        StmtKind::If(if_stmt) => emit_if(if_stmt, ctx),
        StmtKind::For(for_stmt) => emit_for(for_stmt, ctx),
        StmtKind::While(while_stmt) => {
            reject_loop_else(&while_stmt.orelse, "While", while_stmt.span)?;
            let condition = emit_expr(&while_stmt.condition, ctx)?;
            let body = emit_stmts(&while_stmt.body, ctx)?;
            Ok(ctx.target.while_loop(&condition, &body))
        }
        StmtKind::Return(value) => {
            let value = value.as_ref().map(|v| emit_expr(v, ctx)).transpose()?;
            Ok(ctx.target.return_stmt(value.as_deref()))
        }
        StmtKind::Delete(targets) => {
            let [target] = targets.as_slice() else {
                return Err(CodegenError::unsupported_with(
                    "Delete",
                    stmt.span,
                    "delete one target per statement",
                ));
            };
            if !matches!(
                target.kind,
                ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
            ) {
                return Err(CodegenError::UnsupportedTarget {
                    node: target.kind.node_name(),
                    span: target.span,
                });
            }
            Ok(ctx.target.delete(&emit_expr(target, ctx)?))
        }
        StmtKind::Pass => Ok(ctx.target.pass()),
        StmtKind::Expr(expr) => Ok(ctx.target.expr_stmt(&emit_expr(expr, ctx)?)),
        StmtKind::Unsupported(kind) => Err(CodegenError::unsupported(kind.node_name(), stmt.span)),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Assignment
// ══════════════════════════════════════════════════════════════════════════════

fn emit_assign(
    targets: &[Expr],
    value: &Expr,
    stmt: &Stmt,
    ctx: &EmitContext<'_>,
) -> CodegenResult<String> {
    let [target] = targets else {
        return Err(CodegenError::unsupported_with(
            "Assign",
            stmt.span,
            "chained assignment is not supported",
        ));
    };
    let target = emit_binding(target, ctx)?;
    let value = emit_expr(value, ctx)?;
    Ok(ctx.target.assign(&target, &value))
}

/// A store target, with the declaration form where Pass 1 marked one.
fn emit_binding(target: &Expr, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    let text = emit_store(target, ctx)?;
    if ctx.declarations.contains(target.span) {
        Ok(ctx.target.declare(&text))
    } else {
        Ok(text)
    }
}

/// A name, attribute or subscript in store position.
fn emit_store(target: &Expr, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    match &target.kind {
        ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => {
            emit_expr(target, ctx)
        }
        other => Err(CodegenError::UnsupportedTarget {
            node: other.node_name(),
            span: target.span,
        }),
    }
}

fn augmented_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Or | BinOp::And => "and=",
        BinOp::BitOr => "|=",
        BinOp::BitXor => "^=",
        BinOp::BitAnd => "&=",
        BinOp::LShift => "<<=",
        BinOp::RShift => ">>=",
        BinOp::Add => "+=",
        BinOp::Sub => "-=",
        BinOp::Mul => "*=",
        BinOp::Div => "/=",
        BinOp::FloorDiv => "//=",
        BinOp::Mod => "%=",
        BinOp::Pow => "**=",
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

fn emit_if(if_stmt: &IfStmt, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    let mut branches = Vec::new();
    let mut current = if_stmt;
    let orelse = loop {
        let condition = emit_expr(&current.condition, ctx)?;
        branches.push((condition, emit_stmts(&current.body, ctx)?));
        match &current.else_branch {
            Some(ElseBranch::Elif(elif)) => current = elif.as_ref(),
            Some(ElseBranch::Else(body)) => break Some(emit_stmts(body, ctx)?),
            None => break None,
        }
    };
    Ok(ctx.target.if_chain(&branches, orelse.as_deref()))
}

fn emit_for(for_stmt: &ForStmt, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    reject_loop_else(&for_stmt.orelse, "For", for_stmt.span)?;

    let target = &for_stmt.target;
    let (binding, is_pair) = match &target.kind {
        ExprKind::Name(_) => (emit_expr(target, ctx)?, false),
        ExprKind::Tuple(elements) => {
            let names = elements
                .iter()
                .map(|element| match &element.kind {
                    ExprKind::Name(_) => emit_expr(element, ctx),
                    other => Err(CodegenError::UnsupportedTarget {
                        node: other.node_name(),
                        span: element.span,
                    }),
                })
                .collect::<CodegenResult<Vec<_>>>()?;
            (ctx.target.destructure(&names), true)
        }
        other => {
            return Err(CodegenError::UnsupportedTarget {
                node: other.node_name(),
                span: target.span,
            })
        }
    };
    let binding = if ctx.declarations.contains(target.span) {
        ctx.target.declare(&binding)
    } else {
        binding
    };

    let body = emit_stmts(&for_stmt.body, ctx)?;
    match items_receiver(&for_stmt.iter) {
        Some(object) => {
            let object = emit_expr(object, ctx)?;
            if is_pair {
                Ok(ctx.target.for_entries(&binding, &object, &body))
            } else {
                Ok(ctx.target.for_keys(&binding, &object, &body))
            }
        }
        None => {
            let iterable = emit_expr(&for_stmt.iter, ctx)?;
            Ok(ctx.target.for_values(&binding, &iterable, &body))
        }
    }
}

/// `obj` when the loop iterates `obj.items()`.
fn items_receiver(iter: &Expr) -> Option<&Expr> {
    match &iter.kind {
        ExprKind::Call { func, args } if args.is_empty() => match &func.kind {
            ExprKind::Attribute { value, attr } if attr.name == "items" => Some(value),
            _ => None,
        },
        _ => None,
    }
}

fn reject_loop_else(
    orelse: &Option<Block>,
    node: &'static str,
    span: Span,
) -> CodegenResult<()> {
    match orelse {
        Some(_) => Err(CodegenError::unsupported_with(
            node,
            span,
            "loop 'else' blocks are not supported",
        )),
        None => Ok(()),
    }
}
