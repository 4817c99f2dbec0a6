//! `/api/config` and `/api/theme`.

use crate::config;
use crate::routes::util::{error_fragment, get_param, parse_form_body};
use crate::store::{self, KvStore};

const THEME_KEY: &str = "theme";

fn current_theme() -> String {
    store::with_store(|s| s.get(THEME_KEY)).unwrap_or_else(|| "light".to_string())
}

fn render_theme_toggle(theme: &str) -> String {
    let dark = theme == "dark";
    format!(
        r#"<button id="theme-toggle" type="button" class="py-1 px-3 rounded border border-stone-600 text-sm" aria-label="Toggle dark mode" hx-post="/api/theme" hx-swap="outerHTML">{}</button><script>document.documentElement.classList.toggle('dark', {});</script>"#,
        if dark { "&#x2600; Light" } else { "&#x263E; Dark" },
        dark
    )
}

// ── GET/POST /api/config ───────────────────────────────────────────

pub fn handle_config_get(_query: &str) -> String {
    config::export_json()
}

/// Handle POST /api/config
/// Body: JSON config. Missing fields take their defaults.
pub fn handle_config_post(body: &str) -> String {
    match config::import_json(body) {
        Ok(()) => config::export_json(),
        Err(e) => {
            tracing::warn!(error = %e, "config rejected");
            error_fragment(&format!("Config rejected: {}", e))
        }
    }
}

// ── GET/POST /api/theme ────────────────────────────────────────────

pub fn handle_theme_get(_query: &str) -> String {
    render_theme_toggle(&current_theme())
}

/// Handle POST /api/theme
/// Body params: theme={dark|light}, or nothing to flip the current theme.
pub fn handle_theme_post(body: &str) -> String {
    let params = parse_form_body(body);
    let next = match get_param(&params, "theme") {
        Some(t @ ("dark" | "light")) => t.to_string(),
        Some(other) => return error_fragment(&format!("Unknown theme {}", other)),
        None if current_theme() == "dark" => "light".to_string(),
        None => "dark".to_string(),
    };
    store::with_store_mut(|s| s.set(THEME_KEY, next.clone()));
    render_theme_toggle(&next)
}
