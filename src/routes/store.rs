//! `/api/store/*`: keeps the in-memory store and localStorage in step.
//!
//! The bridge posts the whole of localStorage once on page load and drains
//! the pending writes after every request.

use std::collections::BTreeMap;

use crate::routes::util::error_fragment;
use crate::store;

// ── POST /api/store/hydrate ────────────────────────────────────────

/// Handle POST /api/store/hydrate
/// Body: JSON object of every localStorage entry. Values that are not
/// strings are stored as their JSON text.
pub fn handle_hydrate_post(body: &str) -> String {
    let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_str(body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "hydrate body is not a JSON object");
            return error_fragment(&format!("Hydrate failed: {}", e));
        }
    };
    let count = entries.len();
    store::with_store_mut(|s| {
        s.hydrate(entries.into_iter().map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, value)
        }))
    });
    tracing::debug!(count, "store hydrated");
    "ok".to_string()
}

// ── GET /api/store/pending ─────────────────────────────────────────

/// Handle GET /api/store/pending
/// JSON array of `{key, value}` writes since the last call.
pub fn handle_pending_get(_query: &str) -> String {
    let pending = store::with_store_mut(|s| s.take_pending());
    serde_json::to_string(&pending).unwrap_or_else(|_| "[]".to_string())
}
