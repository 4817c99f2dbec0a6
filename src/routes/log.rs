//! `/api/dungeon/{slug}/log`: the adventure log.

use chrono::Utc;

use crate::error::{CompanionError, Result};
use crate::game::adventure_log;
use crate::game::session::Session;
use crate::game::ui::{self, SessionView};
use crate::routes::util::{escape_html, get_param, parse_form_body, render_error};
use crate::routes::{hx_vals, open_session};
use crate::store;

const BUTTON_CLASS: &str = "py-1 px-2 rounded border border-stone-600 bg-amber-50 hover:bg-amber-100 text-sm";

fn post(url: &str, pairs: &[(&str, &str)]) -> String {
    format!(
        r##"hx-post="{}" hx-vals='{}' hx-target="#adventure-log" hx-swap="outerHTML""##,
        url,
        hx_vals(pairs)
    )
}

/// The full `#adventure-log` panel.
pub fn render_log(session: &Session, view: &SessionView) -> String {
    let url = format!("/api/dungeon/{}/log", session.id);
    let mut html = String::with_capacity(4096);
    html.push_str(r#"<div id="adventure-log">"#);
    html.push_str(&format!(
        r#"<form class="flex flex-col gap-2 mb-3" {}><textarea name="text" rows="2" placeholder="What happened?" class="w-full border rounded px-2 py-1 text-sm border-stone-600"></textarea><button type="submit" class="{} w-fit">Add entry</button></form>"#,
        post(&url, &[("action", "add")]),
        BUTTON_CLASS
    ));

    for entry in &session.log {
        let id = entry.id.to_string();
        html.push_str(r#"<div class="p-2 mb-2 rounded border border-stone-300 bg-amber-50 text-stone-700">"#);
        html.push_str(&format!(
            r#"<time class="block text-xs text-stone-500" datetime="{0}">{0}</time>"#,
            escape_html(&entry.timestamp)
        ));
        match view.log_drafts.get(&entry.id) {
            Some(draft) => {
                let area = format!("log-draft-{}", id);
                html.push_str(&format!(
                    r#"<textarea id="{area}" name="text" rows="3" class="w-full border rounded px-2 py-1 text-sm border-stone-600" hx-post="{url}" hx-vals='{vals}' hx-trigger="keyup changed delay:300ms" hx-swap="none">{text}</textarea>"#,
                    area = area,
                    url = url,
                    vals = hx_vals(&[("action", "draft"), ("id", &id)]),
                    text = escape_html(draft),
                ));
                html.push_str(&format!(
                    r##"<div class="flex gap-2 mt-1"><button type="button" class="{cls}" hx-include="#{area}" {save}>Save</button><button type="button" class="{cls}" {cancel}>Cancel</button></div>"##,
                    cls = BUTTON_CLASS,
                    area = area,
                    save = post(&url, &[("action", "save"), ("id", &id)]),
                    cancel = post(&url, &[("action", "cancel"), ("id", &id)]),
                ));
            }
            None => {
                html.push_str(&format!(
                    r#"<p class="text-sm whitespace-pre-wrap">{}</p>"#,
                    escape_html(&entry.text)
                ));
                html.push_str(&format!(
                    r#"<div class="flex gap-2 mt-1"><button type="button" class="{cls}" {edit}>Edit</button><button type="button" class="{cls} text-red-600" {delete}>Delete</button></div>"#,
                    cls = BUTTON_CLASS,
                    edit = post(&url, &[("action", "begin_edit"), ("id", &id)]),
                    delete = post(&url, &[("action", "delete"), ("id", &id)]),
                ));
            }
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn entry_id(params: &[(String, String)]) -> Result<i64> {
    get_param(params, "id")
        .and_then(|v| v.trim().parse().ok())
        .ok_or(CompanionError::MissingParam("id"))
}

/// Apply a log action. Returns whether the stored log changed.
fn apply_action(
    session: &mut Session,
    view: &mut SessionView,
    action: &str,
    params: &[(String, String)],
) -> Result<bool> {
    match action {
        "add" => {
            let text = get_param(params, "text").unwrap_or("");
            Ok(adventure_log::add_entry(&mut session.log, text, Utc::now()).is_some())
        }
        "begin_edit" => {
            view.begin_log_edit(&session.log, entry_id(params)?)?;
            Ok(false)
        }
        "draft" => {
            view.set_log_draft(entry_id(params)?, get_param(params, "text").unwrap_or(""));
            Ok(false)
        }
        "save" => {
            let id = entry_id(params)?;
            if let Some(text) = get_param(params, "text") {
                view.set_log_draft(id, text);
            }
            view.save_log_edit(&mut session.log, id)
        }
        "cancel" => {
            view.cancel_log_edit(entry_id(params)?);
            Ok(false)
        }
        "delete" => {
            let id = entry_id(params)?;
            adventure_log::delete_entry(&mut session.log, id)?;
            view.cancel_log_edit(id);
            Ok(true)
        }
        other => Err(CompanionError::UnknownValue {
            what: "log action",
            value: other.to_string(),
        }),
    }
}

// ── GET /api/dungeon/{slug}/log ────────────────────────────────────

pub fn handle_get(slug: &str, _query: &str) -> String {
    match open_session(slug) {
        Ok(session) => ui::with_view_mut(&session.id, |v| render_log(&session, v)),
        Err(e) => render_error(&e),
    }
}

// ── POST /api/dungeon/{slug}/log ───────────────────────────────────

/// Handle POST /api/dungeon/{slug}/log
/// Body params:
///   - action=add&text={entry}
///   - action={begin_edit|cancel|delete}&id={entry id}
///   - action=draft&id={entry id}&text={draft}   → draft buffer only
///   - action=save&id={entry id}[&text={draft}]
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
                tracing::debug!(slug, action, "log edited");
                store::with_store_mut(|s| session.save_log(s))?;
            }
            Ok(())
        });
    if let Err(e) = result {
        return render_error(&e);
    }
    ui::with_view_mut(&id, |v| render_log(&session, v))
}
