//! Dungeon selection, creation, and whole-dungeon backup files.

use crate::config;
use crate::game::session::{Session, SessionId};
use crate::game::ui;
use crate::routes::util::{error_fragment, get_param, parse_form_body, render_error};
use crate::routes::open_session;
use crate::store;

// ── GET /api/sessions ──────────────────────────────────────────────

/// Handle GET /api/sessions
/// Lists every dungeon with anything stored, plus a button for a new one.
pub fn handle_list_get(_query: &str) -> String {
    let sessions = store::with_store(|s| store::list_sessions(s));
    let mut html = String::with_capacity(1024);
    html.push_str(r#"<div id="sessions" class="p-3 text-stone-700">"#);
    html.push_str(
        r##"<button type="button" class="py-2 px-4 rounded bg-stone-700 text-amber-50 font-bold hover:bg-emerald-600" hx-post="/api/sessions/new" hx-target="#sessions" hx-swap="beforeend">New dungeon</button>"##,
    );
    if sessions.is_empty() {
        html.push_str(r#"<p class="text-sm italic mt-2">No saved dungeons</p>"#);
    } else {
        html.push_str(r#"<ul class="mt-2">"#);
        for id in &sessions {
            html.push_str(&format!(
                r#"<li><a class="underline hover:text-emerald-600" href="/dungeon/{0}">{0}</a></li>"#,
                id
            ));
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");
    html
}

// ── POST /api/sessions/new ─────────────────────────────────────────

/// Handle POST /api/sessions/new
/// Picks an unused slug and navigates to it. Nothing is stored until the
/// first edit.
pub fn handle_new_post(_body: &str) -> String {
    let len = config::current().slug_length;
    let taken = store::with_store(|s| store::list_sessions(s));
    let id = SessionId::generate_unused(&mut rand::thread_rng(), len, &taken);
    tracing::debug!(slug = id.as_str(), "new dungeon");
    format!(
        r#"<script>window.location.href = '/dungeon/{}';</script>"#,
        id
    )
}

// ── GET /api/dungeon/{slug}/export ─────────────────────────────────

/// Handle GET /api/dungeon/{slug}/export
/// Returns a <script> tag that downloads the dungeon backup as a text file.
pub fn handle_export_get(slug: &str, _query: &str) -> String {
    let bundle = match open_session(slug).and_then(|s| s.export_bundle()) {
        Ok(b) => b,
        Err(e) => return render_error(&e),
    };
    format!(
        r#"<script>
(function() {{
  var b = new Blob(['{bundle}'], {{type: 'text/plain'}});
  var a = document.createElement('a');
  a.href = URL.createObjectURL(b);
  a.download = 'dungeon-{slug}.txt';
  a.click();
  URL.revokeObjectURL(a.href);
}})();
</script>"#,
        bundle = bundle,
        slug = slug
    )
}

// ── POST /api/dungeon/{slug}/import ────────────────────────────────

/// Handle POST /api/dungeon/{slug}/import
/// Accepts `bundle={base64}` or the raw bundle as body. All five documents
/// of the dungeon are overwritten.
pub fn handle_import_post(slug: &str, body: &str) -> String {
    let params = parse_form_body(body);
    let encoded = get_param(&params, "bundle").unwrap_or(body.trim());
    if encoded.is_empty() {
        return error_fragment("Import failed: empty backup");
    }
    let result = SessionId::parse(slug)
        .and_then(|id| Session::import_bundle(id, encoded))
        .and_then(|session| {
            store::with_store_mut(|s| session.save_all(s))?;
            Ok(session)
        });
    match result {
        Ok(session) => {
            ui::with_view_mut(&session.id, |v| *v = Default::default());
            tracing::debug!(slug, "dungeon restored from backup");
            r#"<span class="text-emerald-600">Dungeon imported successfully</span>"#.to_string()
        }
        Err(e) => {
            tracing::warn!(slug, error = %e, "backup import failed");
            error_fragment(&format!("Import failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{characters, grid, reset_all};

    fn bundle_of(script: &str) -> String {
        let start = script.find("Blob(['").unwrap() + "Blob(['".len();
        let end = script[start..].find('\'').unwrap();
        script[start..start + end].to_string()
    }

    #[test]
    fn list_shows_stored_dungeons() {
        reset_all();
        assert!(handle_list_get("").contains("No saved dungeons"));
        grid::handle_post("crypt", "action=pointer_down&row=0&col=0");
        characters::handle_post("tower", "action=life_up&slot=0");
        let html = handle_list_get("");
        assert!(html.contains(r#"href="/dungeon/crypt""#));
        assert!(html.contains(r#"href="/dungeon/tower""#));
        assert!(html.contains(r##"hx-target="#sessions""##));
        reset_all();
    }

    #[test]
    fn new_redirects_to_fresh_slug() {
        reset_all();
        let html = handle_new_post("");
        let start = html.find("/dungeon/").unwrap() + "/dungeon/".len();
        let slug: String = html[start..].chars().take_while(|c| *c != '\'').collect();
        assert_eq!(slug.len(), 8);
        assert!(SessionId::parse(&slug).is_ok());
        // Nothing stored yet
        assert!(store::with_store(|s| store::list_sessions(s)).is_empty());
        reset_all();
    }

    #[test]
    fn new_lengthens_slug_when_short_ones_are_taken() {
        reset_all();
        let mut config = config::current();
        config.slug_length = 1;
        config::replace(config);
        for c in "0123456789abcdefghijklmnopqrstuvwxyz".chars() {
            characters::handle_post(&c.to_string(), "action=life_up&slot=0");
        }
        let html = handle_new_post("");
        let start = html.find("/dungeon/").unwrap() + "/dungeon/".len();
        let slug: String = html[start..].chars().take_while(|c| *c != '\'').collect();
        assert_eq!(slug.len(), 2);
        reset_all();
    }

    #[test]
    fn export_then_import_into_other_slug() {
        reset_all();
        grid::handle_post("from", "action=pointer_down&row=2&col=2");
        characters::handle_post("from", "action=set_field&slot=0&field=name&value=Ada");
        let script = handle_export_get("from", "");
        assert!(script.contains("dungeon-from.txt"));
        let bundle = bundle_of(&script);

        let html = handle_import_post("to", &format!("bundle={}", bundle));
        assert!(html.contains("successfully"));
        let to = open_session("to").unwrap();
        assert!(to.grid.cell(2, 2).unwrap().filled);
        assert_eq!(to.characters[0].name, "Ada");
        assert_eq!(to.characters[0].key.as_deref(), Some("characters-to"));
        reset_all();
    }

    #[test]
    fn import_rejects_garbage() {
        reset_all();
        assert!(handle_import_post("to", "bundle=%21%21").contains("Import failed"));
        assert!(handle_import_post("to", "").contains("empty backup"));
        assert!(handle_import_post("a b", "bundle=abc").contains("invalid dungeon slug"));
        assert!(store::with_store(|s| store::list_sessions(s)).is_empty());
        reset_all();
    }
}
