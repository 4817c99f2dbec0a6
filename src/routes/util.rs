//! Shared URL/form parsing and HTML helpers for route handlers.

use crate::error::{CompanionError, Result};

/// Parse URL-encoded form body into key-value pairs.
/// Handles `key=value&key2=value2` format (from HTMX POST bodies).
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((percent_decode(key), percent_decode(val)))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Decoded bytes are reassembled as
/// UTF-8 so multi-byte characters in names and notes survive.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| core::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(val) => {
                        out.push(val);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a query string into key-value pairs.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let q = query.strip_prefix('?').unwrap_or(query);
    parse_form_body(q)
}

/// Helper to get a value by key from a list of key-value pairs.
pub fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Get a non-negative integer parameter.
pub fn get_usize(params: &[(String, String)], key: &str) -> Option<usize> {
    get_param(params, key).and_then(|s| s.trim().parse().ok())
}

/// A parameter the action cannot do without.
pub fn require<'a>(params: &'a [(String, String)], key: &'static str) -> Result<&'a str> {
    get_param(params, key).ok_or(CompanionError::MissingParam(key))
}

pub fn require_usize(params: &[(String, String)], key: &'static str) -> Result<usize> {
    get_usize(params, key).ok_or(CompanionError::MissingParam(key))
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for a single-quoted JS string inside an HTML attribute.
pub fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\x22"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '&' => out.push_str("\\x26"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Red inline message shown in place of a panel.
pub fn error_fragment(message: &str) -> String {
    format!(
        r#"<span class="text-red-600">{}</span>"#,
        escape_html(message)
    )
}

pub fn render_error(err: &CompanionError) -> String {
    tracing::warn!(error = %err, "request failed");
    error_fragment(&err.to_string())
}

pub fn missing_param(name: &str) -> String {
    error_fragment(&format!("Missing or invalid {} parameter", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_body_works() {
        let pairs = parse_form_body("slot=2&action=set_field&field=name&value=Bob");
        assert_eq!(pairs.len(), 4);
        assert_eq!(get_param(&pairs, "slot"), Some("2"));
        assert_eq!(get_param(&pairs, "value"), Some("Bob"));
        assert_eq!(get_usize(&pairs, "slot"), Some(2));
        assert_eq!(get_usize(&pairs, "value"), None);
    }

    #[test]
    fn require_reports_missing_key() {
        let pairs = parse_form_body("row=3&col=x");
        assert_eq!(require_usize(&pairs, "row").unwrap(), 3);
        assert!(matches!(require_usize(&pairs, "col"), Err(CompanionError::MissingParam("col"))));
        assert!(require(&pairs, "action").is_err());
    }

    #[test]
    fn parse_form_body_empty() {
        assert!(parse_form_body("").is_empty());
        assert!(parse_form_body("&&").is_empty());
    }

    #[test]
    fn percent_decode_plus_as_space() {
        assert_eq!(percent_decode("hello+world"), "hello world");
    }

    #[test]
    fn percent_decode_hex() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
    }

    #[test]
    fn percent_decode_utf8() {
        assert_eq!(percent_decode("Bj%C3%B6rn"), "Björn");
    }

    #[test]
    fn percent_decode_malformed() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn parse_query_strips_prefix() {
        let pairs = parse_query("?kind=d66");
        assert_eq!(get_param(&pairs, "kind"), Some("d66"));
    }

    #[test]
    fn escapes() {
        assert_eq!(escape_html(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
        assert_eq!(escape_js("it's"), "it\\'s");
    }

    #[test]
    fn error_fragment_escapes() {
        let html = error_fragment("bad <slug>");
        assert!(html.contains("text-red-600"));
        assert!(html.contains("&lt;slug&gt;"));
    }
}
