//! Replacement placeholders: identifiers that render as raw target text.

use std::collections::HashMap;

/// Maps view-source identifiers to literal target-language text.
///
/// A name present here is never declared by the scope pass and is emitted
/// verbatim wherever it appears, which is how keywords like `this` and
/// ambient globals reach the generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacements {
    entries: HashMap<String, String>,
}

impl Default for Replacements {
    /// `this`, `undefined` and `null`.
    fn default() -> Self {
        Self::empty()
            .with("this", "this")
            .with("undefined", "undefined")
            .with("null", "null")
    }
}

impl Replacements {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or overwrite an entry; returns the previous text.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), text.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_ambient_keywords() {
        let table = Replacements::default();
        assert_eq!(table.get("this"), Some("this"));
        assert_eq!(table.get("undefined"), Some("undefined"));
        assert_eq!(table.get("null"), Some("null"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn insert_overwrites() {
        let mut table = Replacements::empty();
        assert!(table.is_empty());
        assert_eq!(table.insert("doc", "document"), None);
        assert_eq!(table.insert("doc", "window.document"), Some("document".into()));
        assert_eq!(table.get("doc"), Some("window.document"));
        assert!(!table.contains("this"));
    }
}
