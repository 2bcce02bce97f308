//! Session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-session settings.
///
/// Every field has a default, so a config document only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Show handler failures to the user as a diagnostic component.
    pub render_diagnostics: bool,
    /// Maximum characters of rendered diagnostic text.
    pub diagnostic_limit: usize,
    /// Default window for [`Debouncer`](crate::Debouncer).
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            render_diagnostics: true,
            diagnostic_limit: 4096,
            debounce_ms: 10,
        }
    }
}

impl SessionConfig {
    /// Load from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
