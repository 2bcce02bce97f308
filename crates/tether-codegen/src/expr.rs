//! Expression rendering.
//!
//! Every expression renders to a single self-contained fragment. Binary and
//! comparison fragments come back parenthesized from the target, so nesting
//! never needs precedence bookkeeping here.

use tether_types::ast::*;

use crate::error::{CodegenError, CodegenResult};
use crate::translate::{param_names, EmitContext};

pub fn emit_expr(expr: &Expr, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    let target = ctx.target;
    match &expr.kind {
        // ── Literals ──
        ExprKind::Int(value) => Ok(target.int(*value)),
        ExprKind::Float(value) => Ok(target.float(*value)),
        ExprKind::Str(value) => Ok(target.string(value)),
        ExprKind::Bool(value) => Ok(target.boolean(*value)),
        ExprKind::None => Ok(target.null()),
        ExprKind::List(items) => Ok(target.list(&emit_exprs(items, ctx)?)),
        ExprKind::Dict(entries) => {
            let entries = entries
                .iter()
                .map(|entry| Ok((emit_key(&entry.key, ctx)?, emit_expr(&entry.value, ctx)?)))
                .collect::<CodegenResult<Vec<_>>>()?;
            Ok(target.dict(&entries))
        }
        ExprKind::Tuple(_) => Err(CodegenError::unsupported_with(
            "Tuple",
            expr.span,
            "tuples are not supported, use a list",
        )),

        // ── Names & access ──
        ExprKind::Name(name) => Ok(ctx.identifier(name)),
        ExprKind::Attribute { value, attr } => {
            Ok(target.attribute(&emit_expr(value, ctx)?, &attr.name))
        }
        ExprKind::Subscript { value, index } => {
            let value = emit_expr(value, ctx)?;
            let index = emit_expr(index, ctx)?;
            Ok(target.subscript(&value, &index))
        }
        ExprKind::Slice { .. } => Err(CodegenError::unsupported_with(
            "Slice",
            expr.span,
            "slices are not handled, use the .slice(...) method",
        )),
        ExprKind::Call { func, args } => emit_call(func, args, ctx),

        // ── Operators ──
        ExprKind::Binary { left, op, right } => {
            let left = emit_expr(left, ctx)?;
            let right = emit_expr(right, ctx)?;
            target
                .binary(&left, *op, &right)
                .ok_or(CodegenError::UnsupportedOperator {
                    op: op.as_str(),
                    span: expr.span,
                })
        }
        ExprKind::Unary { op, operand } => {
            let operand = emit_expr(operand, ctx)?;
            target
                .unary(*op, &operand)
                .ok_or(CodegenError::UnsupportedOperator {
                    op: unary_symbol(*op),
                    span: expr.span,
                })
        }
        ExprKind::Compare { left, comparisons } => {
            let [(op, right)] = comparisons.as_slice() else {
                return Err(CodegenError::unsupported_with(
                    "Compare",
                    expr.span,
                    "chained comparisons are not supported",
                ));
            };
            let left = emit_expr(left, ctx)?;
            let right = emit_expr(right, ctx)?;
            target
                .compare(&left, *op, &right)
                .ok_or(CodegenError::UnsupportedOperator {
                    op: op.as_str(),
                    span: expr.span,
                })
        }
        ExprKind::IfExp { test, body, orelse } => {
            let test = emit_expr(test, ctx)?;
            let body = emit_expr(body, ctx)?;
            let orelse = emit_expr(orelse, ctx)?;
            Ok(target.ternary(&test, &body, &orelse))
        }
        ExprKind::Lambda { params, body } => {
            let params = param_names(params, ctx)?;
            Ok(target.lambda(&params, &emit_expr(body, ctx)?))
        }

        // ── Never translated ──
        ExprKind::ListComp { .. } => Err(CodegenError::unsupported_with(
            "ListComp",
            expr.span,
            "use a for loop or .map(...)",
        )),
        ExprKind::Yield(_) => Err(CodegenError::unsupported("Yield", expr.span)),
    }
}

fn emit_exprs(exprs: &[Expr], ctx: &EmitContext<'_>) -> CodegenResult<Vec<String>> {
    exprs.iter().map(|expr| emit_expr(expr, ctx)).collect()
}

/// Dict keys are restricted to string and number literals.
fn emit_key(key: &Expr, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    match &key.kind {
        ExprKind::Str(_) | ExprKind::Int(_) | ExprKind::Float(_) => emit_expr(key, ctx),
        other => Err(CodegenError::UnsupportedKey {
            node: other.node_name(),
            span: key.span,
        }),
    }
}

/// A capitalized bare callee constructs a new instance.
fn emit_call(func: &Expr, args: &[Arg], ctx: &EmitContext<'_>) -> CodegenResult<String> {
    let callee = emit_expr(func, ctx)?;
    let args = args
        .iter()
        .map(|arg| match arg {
            Arg::Positional(value) => emit_expr(value, ctx),
            Arg::Starred(value) => Ok(ctx.target.spread(&emit_expr(value, ctx)?)),
            Arg::Keyword { name, value } => Err(CodegenError::unsupported_with(
                "keyword",
                name.span.merge(value.span),
                "keyword arguments are not supported",
            )),
            Arg::DoubleStarred(value) => Err(CodegenError::unsupported_with(
                "keyword",
                value.span,
                "'**' arguments are not supported",
            )),
        })
        .collect::<CodegenResult<Vec<_>>>()?;

    let constructs = func
        .as_name()
        .and_then(|name| name.chars().next())
        .is_some_and(char::is_uppercase);
    if constructs {
        Ok(ctx.target.construct(&callee, &args))
    } else {
        Ok(ctx.target.call(&callee, &args))
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
        UnaryOp::Not => "not",
        UnaryOp::Invert => "~",
    }
}
