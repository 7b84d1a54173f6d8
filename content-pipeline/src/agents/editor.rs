//! Content editor agent: polishes the writer's draft and records the
//! changes it made

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::invoker::Invoker;
use crate::model::WorkflowRequest;
use crate::parse::{extract_json, extract_list_after_keyword, require_fields};

use super::{AgentContext, AgentId, ContentAgent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditedDraft {
    pub title: String,
    pub body: String,
    pub summary: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

pub struct ContentEditor {
    invoker: Arc<Invoker>,
}

impl ContentEditor {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["title", "body", "summary"])?;
    let edited: EditedDraft = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("edited draft shape: {}", e)))?;
    Ok(serde_json::to_value(edited).unwrap_or(Value::Null))
}

/// Recovery treats the whole reply as the edited body. Title comes from the
/// first non-empty line and the summary from the leading text.
fn fallback(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }
    let title = trimmed
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .unwrap_or("Edited Draft")
        .to_string();
    let summary: String = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(200)
        .collect();
    let edited = EditedDraft {
        title,
        body: trimmed.to_string(),
        summary,
        changes: extract_list_after_keyword(reply, "change"),
    };
    serde_json::to_value(edited).ok()
}

#[async_trait]
impl ContentAgent for ContentEditor {
    fn id(&self) -> AgentId {
        AgentId::ContentEditor
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        let guidelines = request
            .brand_guidelines
            .as_ref()
            .map(|g| serde_json::to_string_pretty(g).unwrap_or_default())
            .unwrap_or_else(|| "(none)".to_string());
        format!(
            "You are a content editor. Edit the draft below for clarity, flow and \
             correctness while preserving its meaning and structure.\n\n\
             Brand guidelines:\n{guidelines}\n\n\
             Draft:\n{draft}\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"title\": string, \"body\": string, \"summary\": string, \
             \"changes\": [string] (what you changed and why)}}",
            guidelines = guidelines,
            draft = context.context_block(AgentId::ContentWriter),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let changes = output["changes"].as_array().map(Vec::len).unwrap_or(0);
        Some(format!("{} edits", changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_keeps_the_change_log() {
        let reply = json!({
            "title": "T",
            "body": "Edited body.",
            "summary": "S",
            "changes": ["tightened the intro", "fixed passive voice"]
        })
        .to_string();
        let value = parse(&reply).unwrap();
        assert_eq!(value["changes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn fallback_uses_the_reply_as_the_body() {
        let reply = "# Better Title\n\nThe polished article text continues here.";
        let value = fallback(reply).unwrap();
        assert_eq!(value["title"], "Better Title");
        assert!(value["body"].as_str().unwrap().contains("polished article"));
        assert!(value["summary"].as_str().unwrap().chars().count() <= 200);
    }

    #[test]
    fn fallback_rejects_a_blank_reply() {
        assert!(fallback("   \n  ").is_none());
    }
}
