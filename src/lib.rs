//! Four Against Darkness companion, served from inside the browser.
//!
//! Exports `handle_request(method, path, query, body)` for the Service Worker
//! bridge to call. Uses `matchit` for URL routing, the same router
//! engine that powers Axum. Every response is an HTML fragment for HTMX,
//! except the store and config routes, which speak JSON to the bridge.
//!
//! Dungeon data lives in an in-memory mirror of localStorage (`store`);
//! the bridge hydrates it on page load and flushes `/api/store/pending`
//! after each request.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod dice;
pub mod error;
pub mod game;
pub mod routes;
pub mod store;

pub use error::{CompanionError, Result};

/// Install the panic hook and route `tracing` to the browser console.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` : HTTP method ("GET" or "POST")
/// * `path`   : URL path (e.g., "/api/dungeon/abc123/grid")
/// * `query`  : Query string (e.g., "?channel=abc123-room&ticket=3")
/// * `body`   : Request body (form data or JSON). Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    let mut router = matchit::Router::new();

    // Global routes
    router.insert("/api/sessions", "sessions").ok();
    router.insert("/api/sessions/new", "sessions_new").ok();
    router.insert("/api/store/hydrate", "store_hydrate").ok();
    router.insert("/api/store/pending", "store_pending").ok();
    router.insert("/api/config", "config").ok();
    router.insert("/api/theme", "theme").ok();
    router.insert("/api/dice/roll", "dice_roll").ok();
    router.insert("/api/dice/reveal", "dice_reveal").ok();

    // Per-dungeon routes
    router.insert("/api/dungeon/{slug}/grid", "grid").ok();
    router.insert("/api/dungeon/{slug}/characters", "characters").ok();
    router.insert("/api/dungeon/{slug}/encounters", "encounters").ok();
    router.insert("/api/dungeon/{slug}/log", "log").ok();
    router.insert("/api/dungeon/{slug}/import-candidates", "import_candidates").ok();
    router.insert("/api/dungeon/{slug}/export", "export").ok();
    router.insert("/api/dungeon/{slug}/import", "import").ok();

    match router.at(path) {
        Ok(matched) => {
            let slug = matched.params.get("slug").unwrap_or("");
            tracing::trace!(method, path, route = *matched.value, "request");
            match (*matched.value, method) {
                ("sessions", "GET") => routes::sessions::handle_list_get(query),
                ("sessions_new", "POST") => routes::sessions::handle_new_post(body),
                ("store_hydrate", "POST") => routes::store::handle_hydrate_post(body),
                ("store_pending", "GET") => routes::store::handle_pending_get(query),
                ("config", "GET") => routes::settings::handle_config_get(query),
                ("config", "POST") => routes::settings::handle_config_post(body),
                ("theme", "GET") => routes::settings::handle_theme_get(query),
                ("theme", "POST") => routes::settings::handle_theme_post(body),
                ("dice_roll", "POST") => routes::dice::handle_roll_post(body),
                ("dice_reveal", "GET") => routes::dice::handle_reveal_get(query),

                ("grid", "GET") => routes::grid::handle_get(slug, query),
                ("grid", "POST") => routes::grid::handle_post(slug, body),
                ("characters", "GET") => routes::characters::handle_get(slug, query),
                ("characters", "POST") => routes::characters::handle_post(slug, body),
                ("encounters", "GET") => routes::encounters::handle_get(slug, query),
                ("encounters", "POST") => routes::encounters::handle_post(slug, body),
                ("log", "GET") => routes::log::handle_get(slug, query),
                ("log", "POST") => routes::log::handle_post(slug, body),
                ("import_candidates", "GET") => {
                    routes::characters::handle_import_candidates_get(slug, query)
                }
                ("export", "GET") => routes::sessions::handle_export_get(slug, query),
                ("import", "POST") => routes::sessions::handle_import_post(slug, body),

                _ => method_not_allowed(),
            }
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    r#"<span class="text-red-600">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-red-600">405 — method not allowed</span>"#.to_string()
}
