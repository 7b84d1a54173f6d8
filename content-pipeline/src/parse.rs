//! Parsing of semi-structured model replies
//!
//! Two tiers: strict JSON extraction ([`extract_json`] + [`require_fields`])
//! and the heuristic line-scanning fallbacks agents use when the reply is
//! not machine-parseable. The fallbacks are deliberately simple, pure
//! functions: recovering structure from free text is inherently fragile and
//! each helper documents exactly what it promises.

use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Extract the first JSON object embedded in `text`.
///
/// Scans for the first `{` and walks to its balanced closing brace
/// (string-aware, so braces inside string literals don't count), then
/// parses that span. If no balanced span parses, falls back to parsing the
/// entire reply as JSON. Fails with a `Parse` error otherwise.
pub fn extract_json(text: &str) -> Result<Value> {
    if let Some(span) = first_object_span(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    serde_json::from_str(text.trim())
        .map_err(|e| PipelineError::Parse(format!("no parseable JSON object in reply: {}", e)))
}

/// Locate the first balanced `{...}` span in `text`
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Check that every named field is present and non-null on `value`,
/// failing with a `Validation` error naming the first missing field
pub fn require_fields(value: &Value, fields: &[&str]) -> Result<()> {
    for &field in fields {
        match value.get(field) {
            Some(v) if !v.is_null() => {}
            _ => return Err(PipelineError::Validation(field.to_string())),
        }
    }
    Ok(())
}

/// Heuristic fallback: collect a bulleted list following a keyword line.
///
/// Scans line by line; once a line contains `keyword` (case-insensitive),
/// collects subsequent lines starting with `-`, `*` or `N.` until a blank
/// line ends the section. Returns an empty vec when the keyword never
/// appears or no bullets follow it.
pub fn extract_list_after_keyword(text: &str, keyword: &str) -> Vec<String> {
    let keyword = keyword.to_lowercase();
    let mut capturing = false;
    let mut items = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if capturing {
            if trimmed.is_empty() {
                break;
            }
            if let Some(item) = strip_bullet(trimmed) {
                items.push(item.to_string());
            }
        } else if trimmed.to_lowercase().contains(&keyword) {
            capturing = true;
        }
    }

    items
}

/// Strip a leading `-`, `*` or `N.` bullet marker, returning the item text
fn strip_bullet(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
        return Some(rest.trim());
    }
    // Numbered bullets: "1. item", "12. item"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix('.') {
            return Some(rest.trim());
        }
    }
    None
}

/// One recovered outline section
#[derive(Debug, Clone, PartialEq)]
pub struct HeadedSection {
    pub heading: String,
    pub points: Vec<String>,
}

/// Default section headings used when a reply contains no `##` headings
pub const DEFAULT_SECTION_HEADINGS: [&str; 3] = ["Introduction", "Main Content", "Conclusion"];

/// Heuristic fallback: recover an outline from `##`-style headings.
///
/// Each `##` heading opens a section; bulleted lines beneath it become the
/// section's points. Text with no `##` headings yields exactly three
/// default sections titled "Introduction", "Main Content" and "Conclusion"
/// with no points, so the outline shape is always complete.
pub fn extract_headed_sections(text: &str) -> Vec<HeadedSection> {
    let mut sections: Vec<HeadedSection> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("##") {
            sections.push(HeadedSection {
                heading: heading.trim_start_matches('#').trim().to_string(),
                points: Vec::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            if let Some(point) = strip_bullet(trimmed) {
                section.points.push(point.to_string());
            }
        }
    }

    if sections.is_empty() {
        return DEFAULT_SECTION_HEADINGS
            .iter()
            .map(|h| HeadedSection {
                heading: h.to_string(),
                points: Vec::new(),
            })
            .collect();
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_round_trips_embedded_objects() {
        let object = json!({
            "industry": "martech",
            "trends": ["personalization", "automation"],
            "depth": {"nested": true, "brace_in_string": "a { b } c"}
        });
        let text = format!(
            "Here is my analysis of the market.\n\n{}\n\nLet me know if you need more.",
            serde_json::to_string_pretty(&object).unwrap()
        );
        let extracted = extract_json(&text).unwrap();
        assert_eq!(extracted, object);
    }

    #[test]
    fn extract_json_parses_whole_reply_when_no_prose() {
        let value = extract_json(r#"{"title": "Post"}"#).unwrap();
        assert_eq!(value["title"], "Post");
    }

    #[test]
    fn extract_json_fails_on_plain_prose() {
        let err = extract_json("I could not produce structured output.").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn require_fields_names_missing_field() {
        let value = json!({"title": "x", "body": null});
        let err = require_fields(&value, &["title", "body"]).unwrap_err();
        match err {
            PipelineError::Validation(field) => assert_eq!(field, "body"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn list_capture_starts_at_keyword_and_stops_at_blank() {
        let text = "Summary first.\n\nKey trends this year:\n- AI everywhere\n* Voice search\n3. Zero-click results\n\n- unrelated bullet";
        let items = extract_list_after_keyword(text, "trends");
        assert_eq!(
            items,
            vec!["AI everywhere", "Voice search", "Zero-click results"]
        );
    }

    #[test]
    fn list_capture_is_empty_without_keyword() {
        assert!(extract_list_after_keyword("nothing relevant here", "competitors").is_empty());
    }

    #[test]
    fn headed_sections_follow_markdown_headings() {
        let text = "## Opening\n- hook the reader\n\n## Deep Dive\n- data\n- examples";
        let sections = extract_headed_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Opening");
        assert_eq!(sections[1].points, vec!["data", "examples"]);
    }

    #[test]
    fn headed_sections_default_to_three_documented_headings() {
        let sections = extract_headed_sections("no headings in this reply at all");
        assert_eq!(sections.len(), 3);
        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Introduction", "Main Content", "Conclusion"]);
    }
}
