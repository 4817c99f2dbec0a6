//! `/api/dungeon/{slug}/characters` and the character migration picker.
//!
//! Every action re-renders the whole `#characters` roster except the two
//! combat rolls, which only swap their own result slot.

use crate::config;
use crate::dice::DieKind;
use crate::error::{CompanionError, Result};
use crate::game::character::{Character, CharacterField};
use crate::game::migration;
use crate::game::session::Session;
use crate::game::ui::{self, SessionView};
use crate::routes::dice::{render_channel, start_roll};
use crate::routes::util::{
    escape_html, get_param, parse_form_body, parse_query, render_error, require, require_usize,
};
use crate::routes::{hx_vals, open_session};
use crate::store;

const MIGRATE_CONFIRM: &str = "The character will be removed from the original dungeon and the current slot will be entirely rewritten. Are you sure you want to migrate the character?";

const INPUT_CLASS: &str = "w-full border rounded px-2 py-1 text-sm text-stone-700 border-stone-600";
const BUTTON_CLASS: &str = "py-1 px-2 rounded border border-stone-600 bg-amber-50 hover:bg-amber-100 text-sm";

fn roll_channel(session: &Session, kind: &str, slot: usize) -> String {
    format!("{}-{}-{}", session.id, kind, slot)
}

/// `hx-post` attributes that swap the whole roster.
fn roster_post(url: &str, pairs: &[(&str, &str)]) -> String {
    format!(
        r##"hx-post="{}" hx-vals='{}' hx-target="#characters" hx-swap="outerHTML""##,
        url,
        hx_vals(pairs)
    )
}

fn render_field_input(html: &mut String, url: &str, slot: &str, field: &str, label: &str, value: &str, numeric: bool) {
    let kind = if numeric {
        r#"type="number" inputmode="numeric""#
    } else {
        r#"type="text""#
    };
    html.push_str(&format!(
        r#"<label class="block text-xs font-bold">{label}<input {kind} name="value" value="{value}" class="{class}" hx-trigger="change" {post}></label>"#,
        label = label,
        kind = kind,
        value = escape_html(value),
        class = INPUT_CLASS,
        post = roster_post(url, &[("action", "set_field"), ("slot", slot), ("field", field)]),
    ));
}

fn render_roll(html: &mut String, session: &Session, slot: usize, label: &str, kind: &str, modifier: i64) {
    let url = format!("/api/dungeon/{}/characters", session.id);
    let channel = roll_channel(session, kind, slot);
    let action = format!("roll_{}", kind);
    let slot = slot.to_string();
    html.push_str(&format!(
        r##"<div class="flex items-center gap-2 text-sm"><button type="button" class="{class}" hx-post="{url}" hx-vals='{vals}' hx-target="#roll-{channel}" hx-swap="outerHTML">{label}</button><span>Result: {result} ({modifier:+})</span></div>"##,
        class = BUTTON_CLASS,
        url = url,
        vals = hx_vals(&[("action", &action), ("slot", &slot)]),
        channel = channel,
        label = label,
        result = render_channel(&channel, config::current().roll_delay_ms),
        modifier = modifier,
    ));
}

fn render_card(html: &mut String, session: &Session, view: &SessionView, slot: usize, c: &Character) {
    let url = format!("/api/dungeon/{}/characters", session.id);
    let editing = view.editing_characters.contains(&slot);
    let s = slot.to_string();

    html.push_str(r#"<div class="p-3 rounded-lg border border-stone-600 bg-amber-50 text-stone-700">"#);

    // Header
    html.push_str(r#"<div class="flex items-center justify-between mb-2">"#);
    html.push_str(&format!(
        r#"<span class="font-bold">{} <span class="font-normal">{}</span> <span class="text-xs">Level: {}</span></span>"#,
        escape_html(&c.name),
        escape_html(&c.class),
        c.level
    ));
    html.push_str(&format!(
        r#"<button type="button" class="{}" {}>{}</button>"#,
        BUTTON_CLASS,
        roster_post(&url, &[("action", "toggle_edit"), ("slot", &s)]),
        if editing { "Done" } else { "Edit" }
    ));
    html.push_str("</div>");

    if editing {
        html.push_str(r#"<div class="grid grid-cols-2 gap-2 mb-2">"#);
        render_field_input(html, &url, &s, "name", "Name", &c.name, false);
        render_field_input(html, &url, &s, "class", "Class", &c.class, false);
        for (field, label, value) in [
            ("level", "Level", c.level),
            ("gold", "Gold", c.gold),
            ("attack", "Attack", c.attack),
            ("defense", "Defense", c.defense),
            ("fullLife", "Full life", c.full_life),
            ("currentLife", "Current life", c.current_life),
        ] {
            render_field_input(html, &url, &s, field, label, &value.to_string(), true);
        }
        html.push_str("</div>");
        html.push_str(&format!(
            r##"<div class="mb-2"><button type="button" class="{}" hx-get="/api/dungeon/{}/import-candidates?slot={}" hx-target="#import-{}" hx-swap="innerHTML">Import character</button><div id="import-{}"></div></div>"##,
            BUTTON_CLASS, session.id, slot, slot, slot
        ));
    } else {
        html.push_str(&format!(
            r#"<div class="grid grid-cols-3 gap-2 text-sm mb-2"><span>Gold: {}</span><span>Attack: {}</span><span>Defense: {}</span></div>"#,
            c.gold, c.attack, c.defense
        ));
    }

    // Life
    html.push_str(&format!(
        r#"<div class="flex items-center gap-2 text-sm mb-2"><button type="button" class="{cls}" aria-label="Lose life" {down}>&#x2212;</button><span>Life: {cur} / {full}</span><button type="button" class="{cls}" aria-label="Gain life" {up}>+</button></div>"#,
        cls = BUTTON_CLASS,
        down = roster_post(&url, &[("action", "life_down"), ("slot", &s)]),
        up = roster_post(&url, &[("action", "life_up"), ("slot", &s)]),
        cur = c.current_life,
        full = c.full_life,
    ));

    render_roll(html, session, slot, "Attack", "attack", c.attack);
    render_roll(html, session, slot, "Defense", "defense", c.defense);

    // Equipment
    html.push_str(r#"<div class="mt-2 text-sm"><span class="text-xs font-bold">Equipment</span><ul>"#);
    for item in &c.equipment {
        html.push_str(&format!(
            r#"<li class="flex items-center justify-between">{}<button type="button" class="text-red-600 px-2" aria-label="Remove item" {}>&#x2715;</button></li>"#,
            escape_html(item),
            roster_post(&url, &[("action", "delete_equipment"), ("slot", &s), ("name", item)])
        ));
    }
    html.push_str("</ul>");
    html.push_str(&format!(
        r#"<form class="flex gap-2 mt-1" {}><input type="text" name="value" placeholder="New item" class="{}"><button type="submit" class="{}">Add</button></form>"#,
        roster_post(&url, &[("action", "add_equipment"), ("slot", &s)]),
        INPUT_CLASS,
        BUTTON_CLASS
    ));
    html.push_str("</div>");

    // Spells
    html.push_str(r#"<div class="mt-2 text-sm"><span class="text-xs font-bold">Spells</span>"#);
    for (i, spell) in c.spells.iter().enumerate() {
        let idx = i.to_string();
        html.push_str(r#"<div class="flex flex-wrap items-center gap-1">"#);
        if editing {
            html.push_str(&format!(
                r#"<input type="text" name="value" value="{}" class="{}" hx-trigger="change" {}>"#,
                escape_html(&spell.name),
                INPUT_CLASS,
                roster_post(&url, &[("action", "set_spell_name"), ("slot", &s), ("spell", &idx)])
            ));
            html.push_str(&format!(
                r#"<input type="number" inputmode="numeric" min="0" name="value" value="{}" class="w-16 border rounded px-2 py-1 text-sm" hx-trigger="change" {}>"#,
                spell.slots,
                roster_post(&url, &[("action", "set_spell_slots"), ("slot", &s), ("spell", &idx)])
            ));
        } else {
            html.push_str(&format!(r#"<span class="mr-1">{}</span>"#, escape_html(&spell.name)));
        }
        for (j, checked) in spell.checked_slots.iter().enumerate() {
            html.push_str(&format!(
                r#"<input type="checkbox" class="accent-emerald-600"{} {}>"#,
                if *checked { " checked" } else { "" },
                roster_post(
                    &url,
                    &[("action", "toggle_spell_slot"), ("slot", &s), ("spell", &idx), ("box", &j.to_string())]
                )
            ));
        }
        html.push_str("</div>");
    }
    if editing {
        html.push_str(&format!(
            r#"<form class="flex gap-2 mt-1" {}><input type="text" name="name" placeholder="Spell" class="{}"><input type="number" inputmode="numeric" min="0" name="slots" value="1" class="w-16 border rounded px-2 py-1 text-sm"><button type="submit" class="{}">Add</button></form>"#,
            roster_post(&url, &[("action", "add_spell"), ("slot", &s)]),
            INPUT_CLASS,
            BUTTON_CLASS
        ));
    }
    html.push_str("</div>");

    // Notes
    if editing {
        html.push_str(&format!(
            r#"<label class="block text-xs font-bold mt-2">Notes<textarea name="value" rows="3" class="{}" hx-trigger="change" {}>{}</textarea></label>"#,
            INPUT_CLASS,
            roster_post(&url, &[("action", "set_field"), ("slot", &s), ("field", "notes")]),
            escape_html(&c.notes)
        ));
    } else if !c.notes.is_empty() {
        html.push_str(&format!(
            r#"<p class="mt-2 text-sm whitespace-pre-wrap">{}</p>"#,
            escape_html(&c.notes)
        ));
    }

    html.push_str("</div>");
}

/// The full `#characters` roster.
pub fn render_roster(session: &Session, view: &SessionView) -> String {
    let url = format!("/api/dungeon/{}/characters", session.id);
    let mut html = String::with_capacity(8192);
    html.push_str(r#"<div id="characters"><div class="grid grid-cols-1 md:grid-cols-2 gap-3">"#);
    for (slot, c) in session.characters.iter().enumerate() {
        render_card(&mut html, session, view, slot, c);
    }
    html.push_str("</div>");
    html.push_str(&format!(
        r#"<button type="button" class="{} mt-2" {}>Add character</button>"#,
        BUTTON_CLASS,
        roster_post(&url, &[("action", "add_character")])
    ));
    html.push_str("</div>");
    html
}

/// Apply a roster action. Returns whether the roster document changed.
fn apply_action(
    session: &mut Session,
    view: &mut SessionView,
    action: &str,
    params: &[(String, String)],
) -> Result<bool> {
    if action == "add_character" {
        let key = session.id.roster_key();
        session.characters.push(Character::new_blank(&key));
        return Ok(true);
    }

    let slot = require_usize(params, "slot")?;
    if action == "import" {
        let candidate = require(params, "candidate")?;
        let (source_key, id) = candidate
            .split_once('|')
            .ok_or(CompanionError::MissingParam("candidate"))?;
        store::with_store_mut(|s| migration::migrate_character(s, session, slot, source_key, id))?;
        view.editing_characters.remove(&slot);
        return Ok(false);
    }

    let c = session.character_mut(slot)?;
    match action {
        "toggle_edit" => {
            view.toggle_character_edit(slot);
            return Ok(false);
        }
        "set_field" => {
            let field: CharacterField = require(params, "field")?.parse()?;
            c.set_field(field, get_param(params, "value").unwrap_or(""));
        }
        "life_up" => c.increment_life(),
        "life_down" => c.decrement_life(),
        "add_equipment" => return Ok(c.add_equipment(get_param(params, "value").unwrap_or(""))),
        "delete_equipment" => c.delete_equipment(require(params, "name")?),
        "add_spell" => {
            let slots = require_usize(params, "slots").unwrap_or(0);
            return Ok(c.add_spell(get_param(params, "name").unwrap_or(""), slots));
        }
        "set_spell_name" => {
            let spell = c.spell_mut(require_usize(params, "spell")?)?;
            spell.name = get_param(params, "value").unwrap_or("").to_string();
        }
        "set_spell_slots" => {
            let spell = c.spell_mut(require_usize(params, "spell")?)?;
            spell.resize(require_usize(params, "value").unwrap_or(0));
        }
        "toggle_spell_slot" => {
            let spell = c.spell_mut(require_usize(params, "spell")?)?;
            spell.toggle_slot(require_usize(params, "box")?);
        }
        other => {
            return Err(CompanionError::UnknownValue {
                what: "character action",
                value: other.to_string(),
            });
        }
    }
    Ok(true)
}

// ── GET /api/dungeon/{slug}/characters ─────────────────────────────

pub fn handle_get(slug: &str, _query: &str) -> String {
    match open_session(slug) {
        Ok(session) => ui::with_view_mut(&session.id, |v| render_roster(&session, v)),
        Err(e) => render_error(&e),
    }
}

// ── POST /api/dungeon/{slug}/characters ────────────────────────────

/// Handle POST /api/dungeon/{slug}/characters
/// Body params:
///   - action=add_character
///   - action=toggle_edit&slot={n}
///   - action=set_field&slot={n}&field={name}&value={v}
///   - action={life_up|life_down}&slot={n}
///   - action=add_equipment&slot={n}&value={item}
///   - action=delete_equipment&slot={n}&name={item}
///   - action=add_spell&slot={n}&name={spell}&slots={k}
///   - action={set_spell_name|set_spell_slots}&slot={n}&spell={i}&value={v}
///   - action=toggle_spell_slot&slot={n}&spell={i}&box={j}
///   - action={roll_attack|roll_defense}&slot={n}  → result slot only
///   - action=import&slot={n}&candidate={roster key}|{character id}
pub fn handle_post(slug: &str, body: &str) -> String {
    let params = parse_form_body(body);
    let action = get_param(&params, "action").unwrap_or("");
    let mut session = match open_session(slug) {
        Ok(s) => s,
        Err(e) => return render_error(&e),
    };

    if let Some(kind) = action.strip_prefix("roll_") {
        return match handle_roll(&mut session, kind, &params) {
            Ok(html) => html,
            Err(e) => render_error(&e),
        };
    }

    let id = session.id.clone();
    let result = ui::with_view_mut(&id, |v| apply_action(&mut session, v, action, &params))
        .and_then(|dirty| {
            if dirty {
                tracing::debug!(slug, action, "roster edited");
                store::with_store_mut(|s| session.save_characters(s))?;
            }
            Ok(())
        });
    if let Err(e) = result {
        return render_error(&e);
    }
    ui::with_view_mut(&id, |v| render_roster(&session, v))
}

fn handle_roll(session: &mut Session, kind: &str, params: &[(String, String)]) -> Result<String> {
    if kind != "attack" && kind != "defense" {
        return Err(CompanionError::UnknownValue {
            what: "character action",
            value: format!("roll_{}", kind),
        });
    }
    let slot = require_usize(params, "slot")?;
    session.character_mut(slot)?;
    let channel = roll_channel(session, kind, slot);
    Ok(start_roll(&channel, DieKind::D6, config::current().roll_delay_ms))
}

// ── GET /api/dungeon/{slug}/import-candidates ──────────────────────

/// Handle GET /api/dungeon/{slug}/import-candidates?slot={n}
/// Picker listing characters from every other dungeon.
pub fn handle_import_candidates_get(slug: &str, query: &str) -> String {
    let params = parse_query(query);
    let slot = match require_usize(&params, "slot") {
        Ok(s) => s,
        Err(e) => return render_error(&e),
    };
    let session = match open_session(slug) {
        Ok(s) => s,
        Err(e) => return render_error(&e),
    };
    if slot >= session.characters.len() {
        return render_error(&CompanionError::SlotOutOfRange(slot));
    }
    let candidates = store::with_store(|s| migration::import_candidates(s, &session.id));
    if candidates.is_empty() {
        return r#"<span class="text-sm italic">No characters in other dungeons</span>"#.to_string();
    }

    let mut html = String::with_capacity(1024);
    html.push_str(&format!(
        r##"<form class="flex gap-2 mt-1" hx-post="/api/dungeon/{}/characters" hx-vals='{}' hx-target="#characters" hx-swap="outerHTML" hx-confirm="{}"><select name="candidate" class="{}">"##,
        session.id,
        hx_vals(&[("action", "import"), ("slot", &slot.to_string())]),
        escape_html(MIGRATE_CONFIRM),
        INPUT_CLASS
    ));
    for candidate in &candidates {
        let value = format!(
            "{}|{}",
            candidate.source.roster_key(),
            candidate.character.id.as_deref().unwrap_or("")
        );
        html.push_str(&format!(
            r#"<option value="{}">{}</option>"#,
            escape_html(&value),
            escape_html(&candidate.label())
        ));
    }
    html.push_str(&format!(
        r#"</select><button type="submit" class="{}">Migrate</button></form>"#,
        BUTTON_CLASS
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice;
    use crate::routes::reset_all;
    use crate::store::KvStore;

    fn reopen(slug: &str) -> Session {
        open_session(slug).unwrap()
    }

    #[test]
    fn get_renders_default_roster() {
        reset_all();
        let html = handle_get("abc123", "");
        assert!(html.contains(r#"id="characters""#));
        assert_eq!(html.matches("Level: 1").count(), 4);
        assert!(html.contains("bandage"));
        assert!(html.contains("Life: 0 / 0"));
        assert!(store::with_store_mut(|s| s.take_pending()).is_empty());
        reset_all();
    }

    #[test]
    fn set_field_is_lenient_and_unclamped() {
        reset_all();
        handle_post("abc", "action=set_field&slot=0&field=name&value=Ragnar");
        handle_post("abc", "action=set_field&slot=0&field=level&value=abc");
        handle_post("abc", "action=set_field&slot=0&field=fullLife&value=5");
        handle_post("abc", "action=set_field&slot=0&field=currentLife&value=99");
        handle_post("abc", "action=set_field&slot=1&field=defence&value=12.7");
        let s = reopen("abc");
        assert_eq!(s.characters[0].name, "Ragnar");
        assert_eq!(s.characters[0].level, 0);
        assert_eq!(s.characters[0].current_life, 99);
        assert_eq!(s.characters[1].defense, 12);
        reset_all();
    }

    #[test]
    fn life_buttons_clamp() {
        reset_all();
        handle_post("abc", "action=set_field&slot=2&field=fullLife&value=2");
        for _ in 0..4 {
            handle_post("abc", "action=life_up&slot=2");
        }
        assert_eq!(reopen("abc").characters[2].current_life, 2);
        for _ in 0..4 {
            handle_post("abc", "action=life_down&slot=2");
        }
        assert_eq!(reopen("abc").characters[2].current_life, 0);
        reset_all();
    }

    #[test]
    fn equipment_add_and_delete() {
        reset_all();
        handle_post("abc", "action=add_equipment&slot=0&value=+rope+");
        handle_post("abc", "action=add_equipment&slot=0&value=rope");
        handle_post("abc", "action=add_equipment&slot=0&value=+++");
        assert_eq!(reopen("abc").characters[0].equipment, vec!["bandage", "rope", "rope"]);
        handle_post("abc", "action=delete_equipment&slot=0&name=rope");
        assert_eq!(reopen("abc").characters[0].equipment, vec!["bandage"]);
        reset_all();
    }

    #[test]
    fn spells_resize_and_toggle() {
        reset_all();
        handle_post("abc", "action=add_spell&slot=0&name=Fireball&slots=2");
        handle_post("abc", "action=toggle_spell_slot&slot=0&spell=0&box=1");
        handle_post("abc", "action=set_spell_slots&slot=0&spell=0&value=3");
        handle_post("abc", "action=set_spell_name&slot=0&spell=0&value=Blessing");
        let spell = reopen("abc").characters[0].spells[0].clone();
        assert_eq!(spell.name, "Blessing");
        assert_eq!(spell.slots, 3);
        assert_eq!(spell.checked_slots, vec![true, false, true]);
        assert!(handle_post("abc", "action=toggle_spell_slot&slot=0&spell=5&box=0").contains("no spell"));
        reset_all();
    }

    #[test]
    fn stored_spell_without_slot_array_is_usable() {
        reset_all();
        store::with_store_mut(|s| {
            s.set(
                "characters-abc",
                r#"[{"name":"Bob","spells":[{"name":"Sleep","slots":2}]}]"#.to_string(),
            )
        });
        let html = handle_get("abc", "");
        assert_eq!(html.matches("accent-emerald-600").count(), 2);
        handle_post("abc", "action=toggle_spell_slot&slot=0&spell=0&box=1");
        let spell = reopen("abc").characters[0].spells[0].clone();
        assert_eq!(spell.checked_slots, vec![true, false]);
        reset_all();
    }

    #[test]
    fn toggle_edit_is_view_only() {
        reset_all();
        let html = handle_post("abc", "action=toggle_edit&slot=1");
        assert!(html.contains("Done"));
        assert!(html.contains("Import character"));
        assert!(html.contains(r##"hx-target="#import-1""##));
        assert!(store::with_store_mut(|s| s.take_pending()).is_empty());
        let html = handle_post("abc", "action=toggle_edit&slot=1");
        assert!(!html.contains("Done"));
        reset_all();
    }

    #[test]
    fn attack_roll_waits_roll_delay() {
        reset_all();
        let html = handle_post("abc", "action=roll_attack&slot=0");
        assert!(html.contains(r#"id="roll-abc-attack-0""#));
        assert!(html.contains("load delay:500ms"));
        assert!(dice::with_rolls(|r| r.is_pending("abc-attack-0")));
        // Roster re-render keeps the pending slot alive
        assert!(handle_get("abc", "").contains("channel=abc-attack-0"));
        assert!(handle_post("abc", "action=roll_defense&slot=9").contains("no character in slot 9"));
        reset_all();
    }

    #[test]
    fn add_character_grows_roster() {
        reset_all();
        handle_post("abc", "action=add_character");
        let s = reopen("abc");
        assert_eq!(s.characters.len(), 5);
        assert_eq!(s.characters[4].key.as_deref(), Some("characters-abc"));
        reset_all();
    }

    #[test]
    fn migration_through_routes() {
        reset_all();
        handle_post("old", "action=set_field&slot=1&field=name&value=Ada");
        handle_post("old", "action=set_field&slot=1&field=class&value=Wizard");
        let ada_id = reopen("old").characters[1].id.clone().unwrap();

        let picker = handle_import_candidates_get("new", "?slot=0");
        assert!(picker.contains("Ada Wizard Level: 1"));
        assert!(picker.contains("hx-confirm"));
        assert!(!handle_import_candidates_get("old", "?slot=0").contains("Ada"));

        let body = format!("action=import&slot=0&candidate=characters-old%7C{}", ada_id);
        let html = handle_post("new", &body);
        assert!(html.contains("Ada"));

        let new = reopen("new");
        assert_eq!(new.characters[0].name, "Ada");
        assert_eq!(new.characters[0].id.as_deref(), Some(ada_id.as_str()));
        assert_eq!(new.characters[0].key.as_deref(), Some("characters-new"));
        let old = reopen("old");
        assert_eq!(old.characters[1].name, "Name");
        assert_eq!(old.characters[1].id.as_deref(), Some(ada_id.as_str()));
        reset_all();
    }

    #[test]
    fn empty_picker_and_errors() {
        reset_all();
        assert!(handle_import_candidates_get("abc", "?slot=0").contains("No characters"));
        assert!(handle_import_candidates_get("abc", "?slot=7").contains("no character in slot 7"));
        assert!(handle_post("abc", "action=set_field&slot=4&field=name&value=x").contains("no character in slot 4"));
        assert!(handle_post("abc", "action=set_field&slot=0&field=hp&value=1").contains("unknown character field"));
        assert!(handle_post("abc", "action=import&slot=0&candidate=characters-zzz%7Cnope").contains("no longer in"));
        reset_all();
    }
}
