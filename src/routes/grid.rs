//! `/api/dungeon/{slug}/grid`: the dungeon map and its toolbar.
//!
//! Pointer events are delegated from the map container to a small inline
//! helper that posts `action`, `row` and `col`. The response is always the
//! whole `#dungeon-grid` panel.

use crate::dice::DieKind;
use crate::error::{CompanionError, Result};
use crate::game::editor::{EditOutcome, GridEditor, ToolMode};
use crate::game::grid::{Cell, Orientation};
use crate::game::session::Session;
use crate::game::ui;
use crate::routes::dice::render_map_roller;
use crate::routes::util::{get_param, parse_form_body, render_error, require, require_usize};
use crate::routes::{hx_vals, open_session};
use crate::store;

const POINTER_SCRIPT: &str = r#"<script>
window.dungeonGridEvent = function (slug, action, ev) {
  var g = window.dungeonGridState || (window.dungeonGridState = {down: false, last: null});
  var mode = ev.currentTarget.dataset.mode;
  var cell = ev.target.closest ? ev.target.closest('[data-r]') : null;
  var values = {action: action};
  if (action === 'pointer_up' || action === 'pointer_leave') {
    if (!g.down) return;
    g.down = false;
    g.last = null;
  } else {
    if (!cell) return;
    var key = cell.dataset.r + ',' + cell.dataset.c;
    if (action === 'click' && mode !== 'character') return;
    if (action === 'pointer_down') {
      if (mode === 'character') return;
      ev.preventDefault();
      g.down = true;
      g.last = key;
    }
    if (action === 'pointer_enter') {
      if (!g.down || g.last === key) return;
      g.last = key;
    }
    values.row = cell.dataset.r;
    values.col = cell.dataset.c;
  }
  htmx.ajax('POST', '/api/dungeon/' + slug + '/grid', {values: values, target: '#dungeon-grid', swap: 'outerHTML'});
};
</script>"#;

fn door_class(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Top => "top-0 left-1/4 w-1/2 h-1",
        Orientation::Right => "right-0 top-1/4 h-1/2 w-1",
        Orientation::Bottom => "bottom-0 left-1/4 w-1/2 h-1",
        Orientation::Left => "left-0 top-1/4 h-1/2 w-1",
    }
}

fn render_cell(html: &mut String, row: usize, col: usize, cell: &Cell, party_here: bool) {
    let bg = if cell.filled { "bg-stone-700" } else { "bg-amber-50" };
    html.push_str(&format!(
        r#"<div data-r="{}" data-c="{}" class="relative aspect-square border border-stone-300 {}">"#,
        row, col, bg
    ));
    if let Some(door) = cell.door {
        html.push_str(&format!(
            r#"<span class="absolute bg-amber-600 {}" title="door ({})"></span>"#,
            door_class(door),
            door
        ));
    }
    if let Some(n) = cell.encounter {
        html.push_str(&format!(
            r#"<span class="absolute inset-0 flex items-center justify-center text-xs font-bold text-red-600">{}</span>"#,
            n
        ));
    }
    if party_here {
        html.push_str(
            r#"<span class="absolute inset-0 flex items-center justify-center text-emerald-600" title="party">&#x265E;</span>"#,
        );
    }
    html.push_str("</div>");
}

fn render_toolbar(html: &mut String, session: &Session, editor: &GridEditor) {
    let slug = session.id.as_str();
    let url = format!("/api/dungeon/{}/grid", slug);

    html.push_str(r#"<div class="flex flex-wrap items-center gap-2 mb-2">"#);
    for mode in ToolMode::ALL {
        let active = if mode == editor.mode {
            "bg-stone-700 text-amber-50"
        } else {
            "bg-amber-50 text-stone-700 hover:bg-amber-100"
        };
        html.push_str(&format!(
            r##"<button type="button" class="py-1 px-3 rounded border border-stone-600 text-sm capitalize {active}" hx-post="{url}" hx-vals='{vals}' hx-target="#dungeon-grid" hx-swap="outerHTML">{mode}</button>"##,
            active = active,
            url = url,
            vals = hx_vals(&[("action", "mode"), ("value", mode.as_str())]),
            mode = mode,
        ));
    }

    if editor.mode == ToolMode::Door {
        html.push_str(&format!(
            r##"<button type="button" class="py-1 px-3 rounded border border-stone-600 text-sm" hx-post="{}" hx-vals='{}' hx-target="#dungeon-grid" hx-swap="outerHTML">Door: {} &#x21BB;</button>"##,
            url,
            hx_vals(&[("action", "rotate_door")]),
            editor.door
        ));
    }

    if editor.mode == ToolMode::Encounter {
        if session.encounters.is_empty() {
            html.push_str(r#"<span class="text-sm italic">Add an encounter first</span>"#);
        } else {
            html.push_str(&format!(
                r##"<select name="value" class="border rounded px-2 py-1 text-sm" hx-post="{}" hx-vals='{}' hx-trigger="change" hx-target="#dungeon-grid" hx-swap="outerHTML">"##,
                url,
                hx_vals(&[("action", "select_encounter")])
            ));
            for (i, encounter) in session.encounters.iter().enumerate() {
                let n = i + 1;
                let selected = if n == editor.selected_encounter { " selected" } else { "" };
                html.push_str(&format!(
                    r#"<option value="{}"{}>{}. {}</option>"#,
                    n,
                    selected,
                    n,
                    super::util::escape_html(&encounter.name)
                ));
            }
            html.push_str("</select>");
        }
    }

    if session.position.is_some() {
        html.push_str(&format!(
            r##"<button type="button" class="py-1 px-3 rounded border border-stone-600 text-sm" hx-post="{}" hx-vals='{}' hx-target="#dungeon-grid" hx-swap="outerHTML">Clear party</button>"##,
            url,
            hx_vals(&[("action", "clear_position")])
        ));
    }
    html.push_str("</div>");

    html.push_str(r#"<div class="flex flex-wrap gap-4 mb-2">"#);
    html.push_str(&render_map_roller(&format!("{}-room", slug), DieKind::D66, "Roll for room"));
    html.push_str(&render_map_roller(&format!("{}-contents", slug), DieKind::TwoD6, "Roll for contents"));
    html.push_str(&render_map_roller(&format!("{}-outcome", slug), DieKind::D6, "Define the outcome"));
    html.push_str("</div>");
}

/// The full `#dungeon-grid` panel.
pub fn render_panel(session: &Session, editor: &GridEditor) -> String {
    let slug = session.id.as_str();
    let mut html = String::with_capacity(64 * 1024);

    html.push_str(&format!(
        r#"<div id="dungeon-grid" hx-get="/api/dungeon/{slug}/grid" hx-trigger="encounters-changed from:body" hx-swap="outerHTML">"#,
        slug = slug
    ));
    render_toolbar(&mut html, session, editor);

    html.push_str(&format!(
        r#"<div class="grid select-none cursor-crosshair" style="grid-template-columns: repeat({cols}, minmax(0, 1fr))" data-mode="{mode}" onmousedown="dungeonGridEvent('{slug}', 'pointer_down', event)" onmouseover="dungeonGridEvent('{slug}', 'pointer_enter', event)" onmouseup="dungeonGridEvent('{slug}', 'pointer_up', event)" onmouseleave="dungeonGridEvent('{slug}', 'pointer_leave', event)" onclick="dungeonGridEvent('{slug}', 'click', event)">"#,
        cols = session.grid.col_count(),
        mode = editor.mode,
        slug = slug,
    ));
    for (r, row) in session.grid.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let party_here = session
                .position
                .is_some_and(|p| p.row == r && p.col == c);
            render_cell(&mut html, r, c, cell, party_here);
        }
    }
    html.push_str("</div>");
    html.push_str(POINTER_SCRIPT);
    html.push_str("</div>");
    html
}

fn apply_action(
    editor: &mut GridEditor,
    session: &mut Session,
    action: &str,
    params: &[(String, String)],
) -> Result<EditOutcome> {
    let roster_len = session.encounters.len();
    let cell = || -> Result<(usize, usize)> {
        Ok((require_usize(params, "row")?, require_usize(params, "col")?))
    };
    match action {
        "mode" => {
            editor.set_mode(require(params, "value")?.parse()?);
            Ok(EditOutcome::default())
        }
        "rotate_door" => {
            editor.rotate_door();
            Ok(EditOutcome::default())
        }
        "select_encounter" => {
            editor.select_encounter(require_usize(params, "value")?, roster_len);
            Ok(EditOutcome::default())
        }
        "pointer_down" => {
            let (r, c) = cell()?;
            editor.pointer_down(&mut session.grid, roster_len, r, c)
        }
        "pointer_enter" => {
            let (r, c) = cell()?;
            editor.pointer_enter(&mut session.grid, r, c)
        }
        "pointer_up" | "pointer_leave" => {
            editor.pointer_up();
            Ok(EditOutcome::default())
        }
        "click" => {
            let (r, c) = cell()?;
            editor.click(&session.grid, r, c)
        }
        "clear_position" => Ok(EditOutcome {
            grid_changed: false,
            position: Some(None),
        }),
        other => Err(CompanionError::UnknownValue {
            what: "grid action",
            value: other.to_string(),
        }),
    }
}

fn persist(session: &mut Session, outcome: EditOutcome) -> Result<()> {
    if outcome.grid_changed {
        store::with_store_mut(|s| session.save_grid(s))?;
    }
    if let Some(position) = outcome.position {
        session.position = position;
        store::with_store_mut(|s| session.save_position(s))?;
    }
    Ok(())
}

// ── GET /api/dungeon/{slug}/grid ───────────────────────────────────

pub fn handle_get(slug: &str, _query: &str) -> String {
    match open_session(slug) {
        Ok(session) => ui::with_view_mut(&session.id, |v| render_panel(&session, &v.editor)),
        Err(e) => render_error(&e),
    }
}

// ── POST /api/dungeon/{slug}/grid ──────────────────────────────────

/// Handle POST /api/dungeon/{slug}/grid
/// Body params:
///   - action=mode&value={draw|erase|door|character|encounter}
///   - action=rotate_door
///   - action=select_encounter&value={n}   → 1-based encounter number
///   - action={pointer_down|pointer_enter|click}&row={r}&col={c}
///   - action={pointer_up|pointer_leave}
///   - action=clear_position
pub fn handle_post(slug: &str, body: &str) -> String {
    let params = parse_form_body(body);
    let action = get_param(&params, "action").unwrap_or("");
    let mut session = match open_session(slug) {
        Ok(s) => s,
        Err(e) => return render_error(&e),
    };
    let id = session.id.clone();

    let outcome = ui::with_view_mut(&id, |v| apply_action(&mut v.editor, &mut session, action, &params));
    let result = outcome.and_then(|o| {
        if o.grid_changed || o.position.is_some() {
            tracing::debug!(slug, action, grid_changed = o.grid_changed, "map edited");
        }
        persist(&mut session, o)
    });
    if let Err(e) = result {
        return render_error(&e);
    }
    ui::with_view_mut(&id, |v| render_panel(&session, &v.editor))
}
