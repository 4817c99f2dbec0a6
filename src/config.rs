//! Runtime configuration.
//!
//! Defaults match the table-top layout (four heroes, eight-character slugs).
//! The bridge may replace the whole config with a JSON body on
//! `POST /api/config`; any field it omits keeps its default.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanionConfig {
    /// Number of blank characters in a freshly created roster.
    pub default_roster_size: usize,
    /// Length of generated dungeon slugs.
    pub slug_length: usize,
    /// Delay before an attack/defense roll is revealed.
    pub roll_delay_ms: u32,
    /// Delay before a map dice roller re-reveals while an old result is showing.
    pub redraw_delay_ms: u32,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            default_roster_size: 4,
            slug_length: 8,
            roll_delay_ms: 500,
            redraw_delay_ms: 200,
        }
    }
}

thread_local! {
    static CONFIG: RefCell<CompanionConfig> = RefCell::new(CompanionConfig::default());
}

/// Snapshot of the active config.
pub fn current() -> CompanionConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Replace the active config.
pub fn replace(config: CompanionConfig) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// Parse and install a config from JSON. Missing fields fall back to defaults.
pub fn import_json(json: &str) -> crate::Result<()> {
    let config: CompanionConfig = serde_json::from_str(json)?;
    tracing::debug!(?config, "config replaced");
    replace(config);
    Ok(())
}

pub fn export_json() -> String {
    CONFIG.with(|c| serde_json::to_string(&*c.borrow()).unwrap_or_else(|_| "{}".to_string()))
}
