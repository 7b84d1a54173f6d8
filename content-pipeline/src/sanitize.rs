//! Recursive sanitization of generated output
//!
//! Model replies are untrusted text. Before an agent's output enters the
//! shared context or the final artifact, every string leaf is stripped of
//! injectable markup. The pass is idempotent: sanitizing already-sanitized
//! output is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static JAVASCRIPT_URI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript\s*:").unwrap());
static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(^|\s)on\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());

/// Strip `<script>` blocks, `javascript:` URIs and inline `on*=` event
/// handler attributes from one string, case-insensitively.
///
/// The replacements repeat until a pass leaves the string unchanged:
/// deleting a span can join its surroundings into a new match (e.g. an
/// `on*=` attribute spliced into the middle of `javascript:`), so a single
/// pass is not enough to remove everything. Every replacement only deletes,
/// so the loop terminates.
pub fn sanitize_text(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let pass = SCRIPT_BLOCK.replace_all(&current, "");
        let pass = JAVASCRIPT_URI.replace_all(&pass, "");
        let pass = EVENT_HANDLER.replace_all(&pass, "");
        if pass == current {
            return current;
        }
        current = pass.into_owned();
    }
}

/// Sanitize every string leaf of a JSON-like value.
///
/// Arrays are mapped element-wise, objects key-wise preserving key order,
/// and non-string leaves pass through unchanged.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}
