//! Built-in component showing a handler failure to the user.

use serde_json::Value;
use tether_compiler::ViewType;

use crate::component::{Component, ComponentKind};
use crate::error::ComponentResult;

tether_compiler::view_type!(
    /// Red preformatted text appended to the page body.
    pub static DIAGNOSTIC_VIEW = "Diagnostic", "DiagnosticView", r#"
        class DiagnosticView:
            def constructor():
                this.domNode = document.createElement("pre")
                this.domNode.style.color = "red"
                document.body.appendChild(this.domNode)

            def handle(change):
                if change.text != undefined:
                    this.domNode.innerText = change.text
    "#
);

/// Failure text rendered by [`DIAGNOSTIC_VIEW`].
///
/// Text longer than the session's `diagnostic_limit` is cut to that many
/// characters. A session keeps one diagnostic and updates its text on later
/// failures.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    text: String,
}

impl Diagnostic {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replace the text shown by an existing diagnostic component.
    pub fn show(component: &Component, text: &str) -> ComponentResult<()> {
        let limit = component
            .session()
            .map(|session| session.config().diagnostic_limit)
            .unwrap_or(usize::MAX);
        let text: String = text.chars().take(limit).collect();
        component.set("text", Value::String(text))
    }
}

impl ComponentKind for Diagnostic {
    fn view_type(&self) -> &'static ViewType {
        &DIAGNOSTIC_VIEW
    }

    fn init(&self, component: &Component) -> ComponentResult<()> {
        Diagnostic::show(component, &self.text)
    }
}
