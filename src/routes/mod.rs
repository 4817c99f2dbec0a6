//! Route handlers. Each takes the raw query or form body, mutates the
//! relevant state, and returns an HTML fragment for HTMX to swap in.

pub mod characters;
pub mod dice;
pub mod encounters;
pub mod grid;
pub mod log;
pub mod sessions;
pub mod settings;
pub mod store;
pub mod util;

use crate::config;
use crate::error::Result;
use crate::game::session::{Session, SessionId};

/// Open the dungeon named by the `{slug}` route parameter.
pub(crate) fn open_session(slug: &str) -> Result<Session> {
    let id = SessionId::parse(slug)?;
    let roster_size = config::current().default_roster_size;
    crate::store::with_store(|s| Session::open(s, id, roster_size))
}

/// `hx-vals` attribute payload: a JSON object, HTML-escaped for a
/// single-quoted attribute.
pub(crate) fn hx_vals(pairs: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    util::escape_html(&serde_json::Value::Object(map).to_string())
}

/// Reset every thread-local so tests start from an empty worker.
#[cfg(test)]
pub(crate) fn reset_all() {
    crate::store::reset_store();
    crate::game::ui::reset_views();
    crate::dice::reset_rolls();
    config::replace(config::CompanionConfig::default());
}
