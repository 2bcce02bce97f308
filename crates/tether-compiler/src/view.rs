//! View types, their stable references and compiled definitions.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tether_codegen::Replacements;

use crate::error::CompileResult;

/// Stable qualified reference to a view type.
///
/// Built from the defining module path, the enclosing type path and the
/// view's local name, so it is identical across processes and restarts and
/// can key registration caches on both ends of the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewRef {
    pub module_path: String,
    /// Empty for a view defined at module level.
    pub type_path: String,
    pub name: String,
}

impl ViewRef {
    pub fn new(
        module_path: impl Into<String>,
        type_path: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            type_path: type_path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module_path)?;
        if !self.type_path.is_empty() {
            write!(f, "::{}", self.type_path)?;
        }
        write!(f, "::{}", self.name)
    }
}

/// A compiled view: generated mirror-side source plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub view_ref: ViewRef,
    /// The `def` or `class` name as written in view source.
    pub name: String,
    pub params: Vec<String>,
    /// Generated target source.
    pub source: String,
    /// Lowercase hex SHA-256 of `source`.
    pub digest: String,
}

impl ViewDefinition {
    pub fn new(view_ref: ViewRef, name: String, params: Vec<String>, source: String) -> Self {
        let digest = format!("{:x}", Sha256::digest(source.as_bytes()));
        Self {
            view_ref,
            name,
            params,
            source,
            digest,
        }
    }
}

/// A view type declared in Rust: its reference and authoring source.
///
/// Meant to live in a `static` (see [`view_type!`](crate::view_type)).
/// The source is compiled on first use and the outcome, success or failure,
/// is cached for the life of the process.
pub struct ViewType {
    module_path: &'static str,
    type_path: &'static str,
    name: &'static str,
    source: &'static str,
    replacements: fn() -> Replacements,
    compiled: OnceLock<CompileResult<Arc<ViewDefinition>>>,
}

impl ViewType {
    pub const fn new(
        module_path: &'static str,
        type_path: &'static str,
        name: &'static str,
        source: &'static str,
    ) -> Self {
        Self {
            module_path,
            type_path,
            name,
            source,
            replacements: Replacements::default,
            compiled: OnceLock::new(),
        }
    }

    /// Use a custom replacement table instead of the default one.
    pub const fn with_replacements(mut self, replacements: fn() -> Replacements) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn view_ref(&self) -> ViewRef {
        ViewRef::new(self.module_path, self.type_path, self.name)
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// The compiled definition, compiling on first call.
    pub fn definition(&self) -> CompileResult<Arc<ViewDefinition>> {
        self.compiled
            .get_or_init(|| {
                crate::compile_view(self.view_ref(), self.source, &(self.replacements)())
                    .map(Arc::new)
            })
            .clone()
    }
}

impl fmt::Debug for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewType")
            .field("view_ref", &self.view_ref())
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}

/// Declare a `static` [`ViewType`] whose reference uses the current module
/// path.
///
/// ```
/// tether_compiler::view_type!(
///     /// A text label.
///     pub static LABEL = "", "Label", r#"
///         class Label:
///             def constructor():
///                 this.domNode = document.createElement("span")
///     "#
/// );
/// assert_eq!(LABEL.view_ref().name, "Label");
/// ```
#[macro_export]
macro_rules! view_type {
    ($(#[$meta:meta])* $vis:vis static $ident:ident = $type_path:expr, $name:expr, $source:expr $(,)?) => {
        $(#[$meta])*
        $vis static $ident: $crate::ViewType =
            $crate::ViewType::new(module_path!(), $type_path, $name, $source);
    };
}
