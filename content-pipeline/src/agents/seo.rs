//! SEO optimization agent: keyword targets and meta copy derived from the
//! strategy

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
pub struct SeoRecommendations {
    #[serde(default)]
    pub primary_keywords: Vec<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    pub meta_description: String,
    #[serde(default)]
    pub title_suggestion: Option<String>,
}

pub struct SeoOptimizer {
    invoker: Arc<Invoker>,
}

impl SeoOptimizer {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["primary_keywords", "meta_description"])?;
    let seo: SeoRecommendations = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("seo recommendations shape: {}", e)))?;
    Ok(serde_json::to_value(seo).unwrap_or(Value::Null))
}

fn fallback(reply: &str) -> Option<Value> {
    let meta_description: String = reply
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(155)
        .collect();
    let seo = SeoRecommendations {
        primary_keywords: extract_list_after_keyword(reply, "keyword"),
        secondary_keywords: Vec::new(),
        meta_description,
        title_suggestion: None,
    };
    serde_json::to_value(seo).ok()
}

#[async_trait]
impl ContentAgent for SeoOptimizer {
    fn id(&self) -> AgentId {
        AgentId::AiSeoOptimizer
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        let requested = if request.keywords.is_empty() {
            "none provided".to_string()
        } else {
            request.keywords.join(", ")
        };
        format!(
            "You are an SEO specialist. Optimize search targeting for content about \
             \"{topic}\". Keywords requested by the brief: {requested}.\n\n\
             Content strategy:\n{strategy}\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"primary_keywords\": [string], \"secondary_keywords\": [string], \
             \"meta_description\": string (under 160 chars), \"title_suggestion\": string}}",
            topic = request.topic,
            requested = requested,
            strategy = context.context_block(AgentId::ContentStrategist),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let primary = output["primary_keywords"]
            .as_array()
            .map(Vec::len)
            .unwrap_or(0);
        Some(format!("{} primary keywords", primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_requires_meta_description() {
        let reply = json!({"primary_keywords": ["ai marketing"]}).to_string();
        let err = parse(&reply).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(f) if f == "meta_description"));
    }

    #[test]
    fn fallback_truncates_meta_description() {
        let reply = format!("Suggested keywords:\n- ai marketing\n\n{}", "word ".repeat(100));
        let value = fallback(&reply).unwrap();
        assert_eq!(value["primary_keywords"], json!(["ai marketing"]));
        assert!(value["meta_description"].as_str().unwrap().chars().count() <= 155);
    }
}
