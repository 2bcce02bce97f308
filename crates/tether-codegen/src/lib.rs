//! Tether code generator: translates a parsed view module to target source.
//!
//! # Architecture
//!
//! Translation runs in two passes over a [`tether_types::ast::Module`]:
//!
//! 1. [`scope`] walks the tree with a stack of per-scope binding sets and
//!    records which assignment and loop targets introduce a new local.
//! 2. [`translate`] renders the tree bottom-up through a [`Target`], using
//!    the Pass 1 markings to emit declaration forms at exactly those targets.
//!
//! Identifiers listed in a [`Replacements`] table render as their replacement
//! text and are never declared.
//!
//! Anything outside the supported subset fails with a [`CodegenError`]
//! naming the node. No partial output is ever produced.

pub mod error;
pub mod expr;
pub mod replace;
pub mod scope;
pub mod stmt;
pub mod target;
pub mod translate;

pub use error::{CodegenError, CodegenResult};
pub use replace::Replacements;
pub use scope::{analyze, Declarations};
pub use target::{JavaScript, Target};
pub use translate::{translate, ItemKind, TranslatedItem};
