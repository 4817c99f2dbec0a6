//! `/api/dungeon/{slug}/encounters`: the encounter roster.
//!
//! Stored oldest first, shown newest first with 1-based numbers matching
//! the markers placed on the map.

use crate::error::{CompanionError, Result};
use crate::game::encounter::{Encounter, EncounterField, EncounterStatus, EncounterType};
use crate::game::session::Session;
use crate::game::ui::{self, SessionView};
use crate::routes::util::{escape_html, get_param, parse_form_body, render_error, require, require_usize};
use crate::routes::{hx_vals, open_session};
use crate::store;

const INPUT_CLASS: &str = "w-full border rounded px-2 py-1 text-sm text-stone-700 border-stone-600";
const BUTTON_CLASS: &str = "py-1 px-2 rounded border border-stone-600 bg-amber-50 hover:bg-amber-100 text-sm";

/// Lets the map toolbar refresh its encounter picker.
const CHANGED_EVENT: &str = "<script>htmx.trigger(document.body, 'encounters-changed')</script>";

fn post(url: &str, pairs: &[(&str, &str)]) -> String {
    format!(
        r##"hx-post="{}" hx-vals='{}' hx-target="#encounters" hx-swap="outerHTML""##,
        url,
        hx_vals(pairs)
    )
}

fn status_class(status: EncounterStatus) -> &'static str {
    match status {
        EncounterStatus::Alive => "text-red-600",
        EncounterStatus::Fled => "text-amber-600",
        EncounterStatus::Bribed => "text-yellow-600",
        EncounterStatus::Defeated => "text-emerald-600 line-through",
    }
}

fn render_select(html: &mut String, url: &str, action: &str, index: &str, options: &[&str], current: &str) {
    html.push_str(&format!(
        r#"<select name="value" class="border rounded px-2 py-1 text-sm" hx-trigger="change" {}>"#,
        post(url, &[("action", action), ("index", index)])
    ));
    for option in options {
        let selected = if *option == current { " selected" } else { "" };
        html.push_str(&format!(r#"<option value="{0}"{1}>{0}</option>"#, option, selected));
    }
    html.push_str("</select>");
}

/// Number of monsters, or the boss's life. Shown on collapsed cards too.
fn render_count_track(html: &mut String, url: &str, idx: &str, e: &Encounter) {
    let label = if e.kind == EncounterType::Boss { "Life" } else { "Count" };
    html.push_str(&format!(
        r#"<div class="text-sm mt-2"><span class="text-xs font-bold">{} ({})</span><div class="flex flex-wrap gap-1">"#,
        label,
        e.ticked()
    ));
    for (i, ticked) in e.count.iter().enumerate() {
        html.push_str(&format!(
            r#"<input type="checkbox" class="accent-red-600"{} {}>"#,
            if *ticked { " checked" } else { "" },
            post(url, &[("action", "toggle_count"), ("index", idx), ("box", &i.to_string())])
        ));
    }
    html.push_str("</div></div>");
}

fn render_encounter(html: &mut String, url: &str, view: &SessionView, index: usize, e: &Encounter) {
    let idx = index.to_string();
    let editing = view.editing_encounters.contains(&index);
    let expanded = view.expanded_encounters.contains(&index);

    html.push_str(r#"<div class="p-3 rounded-lg border border-stone-600 bg-amber-50 text-stone-700">"#);
    html.push_str(r#"<div class="flex items-center justify-between gap-2">"#);
    html.push_str(&format!(
        r#"<button type="button" class="font-bold text-left" aria-expanded="{}" {}>{}. {} <span class="text-xs font-normal">{} L{}</span> <span class="text-xs {}">{}</span></button>"#,
        expanded,
        post(url, &[("action", "toggle_collapsed"), ("index", &idx)]),
        index + 1,
        escape_html(&e.name),
        e.kind.as_str(),
        e.level,
        status_class(e.status),
        e.status.as_str()
    ));
    html.push_str(&format!(
        r#"<button type="button" class="{}" {}>{}</button>"#,
        BUTTON_CLASS,
        post(url, &[("action", "toggle_edit"), ("index", &idx)]),
        if editing { "Done" } else { "Edit" }
    ));
    html.push_str("</div>");

    render_count_track(html, url, &idx, e);

    if !expanded {
        html.push_str("</div>");
        return;
    }

    if editing {
        html.push_str(r#"<div class="grid grid-cols-2 gap-2 mt-2">"#);
        for (field, label, value, numeric) in [
            ("name", "Name", e.name.clone(), false),
            ("level", "Level", e.level.to_string(), true),
            ("attacksPerRound", "Attacks per round", e.attacks_per_round.to_string(), true),
        ] {
            let kind = if numeric {
                r#"type="number" inputmode="numeric""#
            } else {
                r#"type="text""#
            };
            html.push_str(&format!(
                r#"<label class="block text-xs font-bold">{}<input {} name="value" value="{}" class="{}" hx-trigger="change" {}></label>"#,
                label,
                kind,
                escape_html(&value),
                INPUT_CLASS,
                post(url, &[("action", "set_field"), ("index", &idx), ("field", field)])
            ));
        }
        html.push_str(r#"<label class="block text-xs font-bold">Type"#);
        let types: Vec<&str> = EncounterType::ALL.iter().map(|t| t.as_str()).collect();
        render_select(html, url, "set_type", &idx, &types, e.kind.as_str());
        html.push_str("</label>");
        html.push_str("</div>");
    } else {
        html.push_str(&format!(
            r#"<div class="text-sm mt-2">Attacks per round: {}</div>"#,
            e.attacks_per_round
        ));
    }

    // Status is editable in both modes
    html.push_str(r#"<div class="text-sm mt-2 flex items-center gap-2"><span class="text-xs font-bold">Status</span>"#);
    let statuses: Vec<&str> = EncounterStatus::ALL.iter().map(|s| s.as_str()).collect();
    render_select(html, url, "set_status", &idx, &statuses, e.status.as_str());
    html.push_str("</div>");

    if editing {
        html.push_str(&format!(
            r#"<label class="block text-xs font-bold mt-2">Notes<textarea name="value" rows="3" class="{}" hx-trigger="change" {}>{}</textarea></label>"#,
            INPUT_CLASS,
            post(url, &[("action", "set_field"), ("index", &idx), ("field", "notes")]),
            escape_html(&e.notes)
        ));
    } else if !e.notes.is_empty() {
        html.push_str(&format!(
            r#"<p class="mt-2 text-sm whitespace-pre-wrap">{}</p>"#,
            escape_html(&e.notes)
        ));
    }
    html.push_str("</div>");
}

/// The full `#encounters` roster.
pub fn render_roster(session: &Session, view: &SessionView) -> String {
    let url = format!("/api/dungeon/{}/encounters", session.id);
    let mut html = String::with_capacity(4096);
    html.push_str(r#"<div id="encounters">"#);
    html.push_str(&format!(
        r#"<button type="button" class="{} mb-2" {}>Add encounter</button>"#,
        BUTTON_CLASS,
        post(&url, &[("action", "add")])
    ));
    if session.encounters.is_empty() {
        html.push_str(r#"<p class="text-sm italic">No encounters yet</p>"#);
    }
    html.push_str(r#"<div class="grid grid-cols-1 gap-2">"#);
    for (index, e) in session.encounters.iter().enumerate().rev() {
        render_encounter(&mut html, &url, view, index, e);
    }
    html.push_str("</div></div>");
    html
}

fn apply_action(
    session: &mut Session,
    view: &mut SessionView,
    action: &str,
    params: &[(String, String)],
) -> Result<bool> {
    if action == "add" {
        session.encounters.push(Encounter::default());
        return Ok(true);
    }

    let index = require_usize(params, "index")?;
    let e = session.encounter_mut(index)?;
    match action {
        "toggle_edit" => {
            view.toggle_encounter_edit(index);
            return Ok(false);
        }
        "toggle_collapsed" => {
            view.toggle_encounter_collapsed(index);
            return Ok(false);
        }
        "set_field" => {
            let field: EncounterField = require(params, "field")?.parse()?;
            e.set_field(field, get_param(params, "value").unwrap_or(""));
        }
        "set_type" => e.kind = require(params, "value")?.parse()?,
        "set_status" => e.status = require(params, "value")?.parse()?,
        "toggle_count" => e.toggle_count(require_usize(params, "box")?)?,
        other => {
            return Err(CompanionError::UnknownValue {
                what: "encounter action",
                value: other.to_string(),
            });
        }
    }
    Ok(true)
}

// ── GET /api/dungeon/{slug}/encounters ─────────────────────────────

pub fn handle_get(slug: &str, _query: &str) -> String {
    match open_session(slug) {
        Ok(session) => ui::with_view_mut(&session.id, |v| render_roster(&session, v)),
        Err(e) => render_error(&e),
    }
}

// ── POST /api/dungeon/{slug}/encounters ────────────────────────────

/// Handle POST /api/dungeon/{slug}/encounters
/// Body params:
///   - action=add
///   - action={toggle_edit|toggle_collapsed}&index={i}
///   - action=set_field&index={i}&field={name|level|attacksPerRound|notes}&value={v}
///   - action=set_type&index={i}&value={Minion|Vermin|Boss}
///   - action=set_status&index={i}&value={Alive|Fled|Bribed|Defeated}
///   - action=toggle_count&index={i}&box={j}
pub fn handle_post(slug: &str, body: &str) -> String {
    let params = parse_form_body(body);
    let action = get_param(&params, "action").unwrap_or("");
    let mut session = match open_session(slug) {
        Ok(s) => s,
        Err(e) => return render_error(&e),
    };
    let id = session.id.clone();

    let result = ui::with_view_mut(&id, |v| apply_action(&mut session, v, action, &params))
        .and_then(|dirty| {
            if dirty {
                tracing::debug!(slug, action, "encounters edited");
                store::with_store_mut(|s| session.save_encounters(s))?;
            }
            Ok(())
        });
    if let Err(e) = result {
        return render_error(&e);
    }
    let mut html = ui::with_view_mut(&id, |v| render_roster(&session, v));
    if action == "add" {
        html.push_str(CHANGED_EVENT);
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::reset_all;
    use crate::store::KvStore;

    fn reopen(slug: &str) -> Session {
        open_session(slug).unwrap()
    }

    #[test]
    fn add_appends_default_encounter() {
        reset_all();
        let html = handle_post("abc", "action=add");
        assert!(html.contains("1. New Encounter"));
        assert!(html.contains("encounters-changed"));
        let s = reopen("abc");
        assert_eq!(s.encounters.len(), 1);
        assert_eq!(s.encounters[0], Encounter::default());
        reset_all();
    }

    #[test]
    fn displayed_newest_first() {
        reset_all();
        handle_post("abc", "action=add");
        handle_post("abc", "action=add");
        handle_post("abc", "action=set_field&index=1&field=name&value=Goblins");
        let html = handle_get("abc", "");
        let second = html.find("2. Goblins").unwrap();
        let first = html.find("1. New Encounter").unwrap();
        assert!(second < first);
        reset_all();
    }

    #[test]
    fn collapsed_until_toggled() {
        reset_all();
        handle_post("abc", "action=add");
        let collapsed = handle_get("abc", "");
        assert!(!collapsed.contains("Attacks per round"));
        assert!(collapsed.contains("Count (0)"));
        assert_eq!(collapsed.matches(r#"type="checkbox""#).count(), 21);
        let html = handle_post("abc", "action=toggle_collapsed&index=0");
        assert!(html.contains("Attacks per round: 1"));
        assert_eq!(html.matches(r#"type="checkbox""#).count(), 21);
        reset_all();
    }

    #[test]
    fn sparse_stored_roster_renders_full_track() {
        reset_all();
        store::with_store_mut(|s| {
            s.set(
                "encounters-abc",
                r#"[{"name":"Orc","type":"Minion","status":"Alive"}]"#.to_string(),
            )
        });
        let html = handle_post("abc", "action=toggle_collapsed&index=0");
        assert!(html.contains("1. Orc"));
        assert!(html.contains("L1"));
        assert!(html.contains("Attacks per round: 1"));
        assert_eq!(html.matches(r#"type="checkbox""#).count(), 21);
        handle_post("abc", "action=toggle_count&index=0&box=20");
        assert!(reopen("abc").encounters[0].count[20]);
        reset_all();
    }

    #[test]
    fn edits_persist() {
        reset_all();
        handle_post("abc", "action=add");
        handle_post("abc", "action=set_field&index=0&field=level&value=x");
        handle_post("abc", "action=set_field&index=0&field=attacksPerRound&value=3");
        handle_post("abc", "action=set_type&index=0&value=Boss");
        handle_post("abc", "action=set_status&index=0&value=Bribed");
        handle_post("abc", "action=toggle_count&index=0&box=4");
        let e = reopen("abc").encounters[0].clone();
        assert_eq!(e.level, 0);
        assert_eq!(e.attacks_per_round, 3);
        assert_eq!(e.kind, EncounterType::Boss);
        assert_eq!(e.status, EncounterStatus::Bribed);
        assert!(e.count[4]);
        assert_eq!(e.ticked(), 1);
        reset_all();
    }

    #[test]
    fn rejects_unknown_values() {
        reset_all();
        handle_post("abc", "action=add");
        assert!(handle_post("abc", "action=set_type&index=0&value=Dragon").contains("unknown encounter type"));
        assert!(handle_post("abc", "action=set_status&index=0&value=Asleep").contains("unknown encounter status"));
        assert!(handle_post("abc", "action=toggle_count&index=0&box=21").contains("unknown count box"));
        assert!(handle_post("abc", "action=toggle_edit&index=3").contains("no encounter at index 3"));
        reset_all();
    }
}
