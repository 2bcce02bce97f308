//! Pass 2 entry point: render a scope-analyzed module through a [`Target`].

use tether_types::ast::*;

use crate::error::{CodegenError, CodegenResult};
use crate::replace::Replacements;
use crate::scope::{self, Declarations};
use crate::stmt::emit_stmts;
use crate::target::Target;

/// What kind of top-level item a translation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Function,
    Class,
}

/// One translated top-level `def` or `class`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedItem {
    pub kind: ItemKind,
    /// The name as written in view source.
    pub name: String,
    /// Function parameters, or the `constructor` parameters of a class.
    pub params: Vec<String>,
    /// Rendered target source.
    pub source: String,
}

/// Shared state for one translation.
pub struct EmitContext<'a> {
    pub target: &'a dyn Target,
    pub declarations: &'a Declarations,
    pub replacements: &'a Replacements,
}

impl EmitContext<'_> {
    /// The text an identifier renders as outside of a binding position.
    pub fn identifier(&self, name: &str) -> String {
        match self.replacements.get(name) {
            Some(text) => text.to_string(),
            None => name.to_string(),
        }
    }
}

/// Translate every item of `module`.
///
/// Runs both passes. The first error aborts translation; no partial output
/// is returned.
pub fn translate(
    module: &Module,
    replacements: &Replacements,
    target: &dyn Target,
) -> CodegenResult<Vec<TranslatedItem>> {
    let declarations = scope::analyze(module, replacements)?;
    let ctx = EmitContext {
        target,
        declarations: &declarations,
        replacements,
    };

    module
        .body
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) => Ok(TranslatedItem {
                kind: ItemKind::Function,
                name: def.name.name.clone(),
                params: param_names(&def.params, &ctx)?,
                source: emit_function(def, &ctx)?,
            }),
            StmtKind::ClassDef(class) => Ok(TranslatedItem {
                kind: ItemKind::Class,
                name: class.name.name.clone(),
                params: constructor_params(class, &ctx)?,
                source: emit_class(class, &ctx)?,
            }),
            other => Err(CodegenError::unsupported_with(
                other.node_name(),
                stmt.span,
                "only 'def' and 'class' are allowed at module level",
            )),
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & classes
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) fn param_names(params: &[Param], ctx: &EmitContext<'_>) -> CodegenResult<Vec<String>> {
    params
        .iter()
        .map(|param| match &param.default {
            Some(_) => Err(CodegenError::unsupported_with(
                "arguments",
                param.span,
                "default parameter values are not supported",
            )),
            None => Ok(ctx.identifier(&param.name.name)),
        })
        .collect()
}

fn check_decorators(decorators: &[Expr], node: &'static str) -> CodegenResult<()> {
    match decorators.first() {
        Some(decorator) => Err(CodegenError::unsupported_with(
            node,
            decorator.span,
            "decorators are not supported",
        )),
        None => Ok(()),
    }
}

/// `def` as a free-standing function.
pub(crate) fn emit_function(def: &FunctionDef, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    check_decorators(&def.decorators, "FunctionDef")?;
    let params = param_names(&def.params, ctx)?;
    let body = emit_stmts(&def.body, ctx)?;
    Ok(ctx.target.function(&def.name.name, &params, &body))
}

pub(crate) fn emit_class(class: &ClassDef, ctx: &EmitContext<'_>) -> CodegenResult<String> {
    check_decorators(&class.decorators, "ClassDef")?;
    if let Some(base) = class.bases.first() {
        return Err(CodegenError::unsupported_with(
            "ClassDef",
            base.span,
            "base classes are not supported",
        ));
    }

    let mut members = Vec::new();
    for stmt in &class.body {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                check_decorators(&def.decorators, "FunctionDef")?;
                let params = param_names(&def.params, ctx)?;
                let body = emit_stmts(&def.body, ctx)?;
                members.push(ctx.target.method(&def.name.name, &params, &body));
            }
            StmtKind::Pass => {}
            other => {
                return Err(CodegenError::unsupported_with(
                    other.node_name(),
                    stmt.span,
                    "class bodies may only contain methods",
                ))
            }
        }
    }
    Ok(ctx.target.class(&class.name.name, &members))
}

fn constructor_params(class: &ClassDef, ctx: &EmitContext<'_>) -> CodegenResult<Vec<String>> {
    let constructor = class.body.iter().find_map(|stmt| match &stmt.kind {
        StmtKind::FunctionDef(def) if def.name.name == "constructor" => Some(def),
        _ => None,
    });
    match constructor {
        Some(def) => param_names(&def.params, ctx),
        None => Ok(Vec::new()),
    }
}
