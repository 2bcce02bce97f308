//! Tether compiler: orchestrates the view compilation pipeline.
//!
//! ```text
//! view source → dedent → Lexer → Parser → scope pass → Target → ViewDefinition
//! ```
//!
//! A view is authored once, in an indentation-structured subset of the
//! backend's authoring syntax, and compiled once per [`ViewRef`] into the
//! source text shipped inside a `class` registration message.

pub mod bootstrap;
pub mod error;
pub mod source;
pub mod view;

pub use error::{CompileError, CompileResult};
pub use tether_codegen::{ItemKind, JavaScript, Replacements, Target, TranslatedItem};
pub use view::{ViewDefinition, ViewRef, ViewType};

use tether_lexer::Lexer;
use tether_parser::Parser;
use tether_types::SourceFile;

/// Compile view source to one translated item per top-level `def`/`class`.
///
/// Lexer and parser diagnostics are reported together; translation only
/// runs on a tree that parsed cleanly and stops at its first error.
pub fn compile_source(
    file_name: &str,
    source: &str,
    replacements: &Replacements,
    target: &dyn Target,
) -> CompileResult<Vec<TranslatedItem>> {
    let source_file = SourceFile::new(file_name, source::dedent(source));

    let lexed = Lexer::new(&source_file).lex();
    let mut errors = lexed.errors;
    let parsed = Parser::new(lexed.tokens, &source_file).parse();
    errors.extend(parsed.errors);

    let module = match parsed.module {
        Some(module) if !errors.has_errors() => module,
        _ => return Err(CompileError::Syntax(errors)),
    };

    tether_codegen::translate(&module, replacements, target)
        .map_err(|e| CompileError::Unsupported(Box::new(e.to_source_error(&source_file))))
}

/// Compile the source of a single view type to JavaScript.
pub fn compile_view(
    view_ref: ViewRef,
    source: &str,
    replacements: &Replacements,
) -> CompileResult<ViewDefinition> {
    let file_name = view_ref.to_string();
    let result = compile_source(&file_name, source, replacements, &JavaScript)
        .and_then(|mut items| match items.len() {
            1 => Ok(items.remove(0)),
            found => Err(CompileError::ItemCount {
                view: file_name.clone(),
                found,
            }),
        });

    match result {
        Ok(item) => {
            let definition = ViewDefinition::new(view_ref, item.name, item.params, item.source);
            tracing::debug!(
                view_ref = %definition.view_ref,
                digest = %definition.digest,
                "compiled view"
            );
            Ok(definition)
        }
        Err(e) => {
            tracing::warn!(view_ref = %file_name, error = %e, "view failed to compile");
            Err(e)
        }
    }
}
