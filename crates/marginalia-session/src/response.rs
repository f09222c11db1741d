// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response normalization — turns whatever the recognition service sent back
// into plain text.
//
// ## Pipeline
//
// 1. Strip a leading code fence (with optional language tag) and a trailing one
// 2. JSON object or array: take `text` (first element carrying it for arrays)
// 3. Malformed JSON: pull the `"text": "..."` field out with a regex, closing
//    quote optional so a truncated body still yields its text; no field means
//    no text
// 4. Anything else is taken literally
// 5. Trim; an empty result means "no text"

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static FENCE_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("static regex"));
static FENCE_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n?[ \t]*```\s*$").expect("static regex"));
static TEXT_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.)*)"?"#).expect("static regex"));

/// Normalize a raw service response to plain, trimmed text.
pub fn normalize_response(raw: &str) -> String {
    let body = strip_fences(raw);
    let body = body.trim();

    let text = if body.starts_with('{') || body.starts_with('[') {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => text_field(&value).unwrap_or_default(),
            Err(err) => {
                debug!(%err, "Response is not valid JSON; scanning for a text field");
                TEXT_FIELD_RE
                    .captures(body)
                    .map(|caps| unescape(&caps[1]))
                    .unwrap_or_default()
            }
        }
    } else {
        body.to_string()
    };

    text.trim().to_string()
}

fn strip_fences(raw: &str) -> String {
    let opened = FENCE_OPEN_RE.replace(raw, "");
    FENCE_CLOSE_RE.replace(&opened, "").into_owned()
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("text").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(|item| {
            item.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
        }),
        _ => None,
    }
}

/// Undo the JSON escapes a truncated response can still carry.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
