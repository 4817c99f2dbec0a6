//! `/api/dice/*` routes and the roller fragments shared by the map toolbar
//! and the character sheets.
//!
//! A roll is a two-step exchange: `roll` (or a sheet action) opens a ticket
//! on a channel and returns a placeholder that fires `reveal` after the
//! configured delay. Only the live ticket of a channel ever shows a value.

use crate::config;
use crate::dice::{self, DieKind, RollTicket};
use crate::routes::util::{error_fragment, get_param, missing_param, parse_form_body, parse_query, render_error};

const MAX_CHANNEL_LEN: usize = 96;

/// Channels end up in element ids and query strings.
pub fn valid_channel(channel: &str) -> bool {
    !channel.is_empty()
        && channel.len() <= MAX_CHANNEL_LEN
        && channel
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn result_id(channel: &str) -> String {
    format!("roll-{}", channel)
}

/// Placeholder that asks for the reveal of `ticket` after `delay_ms`.
fn render_pending(channel: &str, ticket: RollTicket, delay_ms: u32) -> String {
    let trigger = if delay_ms == 0 {
        "load".to_string()
    } else {
        format!("load delay:{}ms", delay_ms)
    };
    format!(
        r#"<span id="{id}" class="font-bold animate-pulse" hx-get="/api/dice/reveal?channel={channel}&amp;ticket={ticket}" hx-trigger="{trigger}" hx-swap="outerHTML">&#x2026;</span>"#,
        id = result_id(channel),
        channel = channel,
        ticket = ticket.0,
        trigger = trigger,
    )
}

fn render_value(channel: &str, value: Option<u8>) -> String {
    let text = value.map(|v| v.to_string()).unwrap_or_default();
    format!(
        r#"<span id="{}" class="font-bold">{}</span>"#,
        result_id(channel),
        text
    )
}

/// Current state of a channel's result slot: pending placeholder, last
/// revealed value, or empty.
pub fn render_channel(channel: &str, delay_ms: u32) -> String {
    let (pending, shown) = dice::with_rolls(|r| (r.pending_ticket(channel), r.displayed(channel)));
    match pending {
        Some(ticket) => render_pending(channel, ticket, delay_ms),
        None => render_value(channel, shown),
    }
}

/// Open a ticket on `channel` and return its delayed placeholder.
pub fn start_roll(channel: &str, kind: DieKind, delay_ms: u32) -> String {
    let ticket = dice::with_rolls_mut(|r| r.begin(channel, kind));
    tracing::debug!(channel, kind = kind.as_str(), ticket = ticket.0, delay_ms, "roll started");
    render_pending(channel, ticket, delay_ms)
}

/// One of the map toolbar rollers: title button plus result slot.
pub fn render_map_roller(channel: &str, kind: DieKind, title: &str) -> String {
    let vals = super::hx_vals(&[("kind", kind.as_str()), ("channel", channel)]);
    format!(
        r##"<div class="flex items-center gap-2"><button type="button" class="py-1 px-3 rounded bg-amber-50 border border-stone-600 hover:bg-amber-100 text-sm font-bold" title="{title}" hx-post="/api/dice/roll" hx-vals='{vals}' hx-target="#{id}" hx-swap="outerHTML">{title} ({kind})</button>{result}</div>"##,
        title = title,
        vals = vals,
        id = result_id(channel),
        kind = kind.as_str(),
        result = render_channel(channel, 0),
    )
}

// ── POST /api/dice/roll ────────────────────────────────────────────

/// Handle POST /api/dice/roll
/// Body params: kind={d6|2d6|d66}&channel={name}
///
/// Rolls on an empty channel are revealed at once. When a result is
/// already showing it is cleared and the new one appears after the
/// redraw delay.
pub fn handle_roll_post(body: &str) -> String {
    let params = parse_form_body(body);
    let channel = match get_param(&params, "channel") {
        Some(c) if valid_channel(c) => c,
        _ => return missing_param("channel"),
    };
    let kind: DieKind = match get_param(&params, "kind").unwrap_or("").parse() {
        Ok(k) => k,
        Err(e) => return render_error(&e),
    };
    let showing = dice::with_rolls(|r| r.displayed(channel).is_some());
    let delay = if showing {
        config::current().redraw_delay_ms
    } else {
        0
    };
    start_roll(channel, kind, delay)
}

// ── GET /api/dice/reveal ───────────────────────────────────────────

/// Handle GET /api/dice/reveal?channel={name}&ticket={n}
/// A stale ticket renders the channel as it currently stands.
pub fn handle_reveal_get(query: &str) -> String {
    let params = parse_query(query);
    let channel = match get_param(&params, "channel") {
        Some(c) if valid_channel(c) => c,
        _ => return missing_param("channel"),
    };
    let ticket = match get_param(&params, "ticket").and_then(|t| t.parse::<u64>().ok()) {
        Some(t) => RollTicket(t),
        None => return error_fragment("Missing or invalid ticket parameter"),
    };
    let mut rng = rand::thread_rng();
    match dice::with_rolls_mut(|r| r.reveal(channel, ticket, &mut rng)) {
        Some(value) => {
            tracing::debug!(channel, ticket = ticket.0, value, "roll revealed");
            render_value(channel, Some(value))
        }
        None => render_channel(channel, config::current().redraw_delay_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::reset_all;

    fn ticket_of(html: &str) -> String {
        let start = html.find("ticket=").unwrap() + "ticket=".len();
        html[start..].chars().take_while(|c| c.is_ascii_digit()).collect()
    }

    #[test]
    fn first_map_roll_reveals_immediately() {
        reset_all();
        let html = handle_roll_post("kind=d66&channel=abc-room");
        assert!(html.contains(r#"hx-trigger="load""#));
        assert!(html.contains(r#"id="roll-abc-room""#));
        reset_all();
    }

    #[test]
    fn reroll_waits_redraw_delay() {
        reset_all();
        let pending = handle_roll_post("kind=d6&channel=abc-outcome");
        let t = ticket_of(&pending);
        handle_reveal_get(&format!("?channel=abc-outcome&ticket={}", t));

        let html = handle_roll_post("kind=d6&channel=abc-outcome");
        assert!(html.contains("load delay:200ms"));
        // Old result cleared while the new one is pending
        assert_eq!(dice::with_rolls(|r| r.displayed("abc-outcome")), None);
        reset_all();
    }

    #[test]
    fn reveal_renders_value_in_range() {
        reset_all();
        let pending = handle_roll_post("kind=2d6&channel=abc-contents");
        let t = ticket_of(&pending);
        let html = handle_reveal_get(&format!("?channel=abc-contents&ticket={}", t));
        let shown = dice::with_rolls(|r| r.displayed("abc-contents")).unwrap();
        assert!((2..=12).contains(&shown));
        assert!(html.contains(&format!(">{}</span>", shown)));
        reset_all();
    }

    #[test]
    fn stale_reveal_does_not_overwrite() {
        reset_all();
        let first = ticket_of(&handle_roll_post("kind=d6&channel=c"));
        let second = ticket_of(&handle_roll_post("kind=d6&channel=c"));
        let html = handle_reveal_get(&format!("?channel=c&ticket={}", first));
        // Still pending on the newer ticket
        assert!(html.contains(&format!("ticket={}", second)));
        assert_eq!(dice::with_rolls(|r| r.displayed("c")), None);
        reset_all();
    }

    #[test]
    fn rejects_bad_input() {
        reset_all();
        assert!(handle_roll_post("kind=d20&channel=c").contains("unknown die"));
        assert!(handle_roll_post("kind=d6&channel=<x>").contains("channel"));
        assert!(handle_reveal_get("?channel=c").contains("ticket"));
        reset_all();
    }

    #[test]
    fn map_roller_has_title_and_slot() {
        reset_all();
        let html = render_map_roller("abc-room", DieKind::D66, "Roll for room");
        assert!(html.contains("Roll for room (d66)"));
        assert!(html.contains(r##"hx-target="#roll-abc-room""##));
        reset_all();
    }
}
