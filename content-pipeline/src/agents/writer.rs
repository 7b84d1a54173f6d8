//! Content writer agent: produces the full draft.
//!
//! Fallback is disabled for this agent: a heuristically recovered draft is
//! worse than failing the workflow, so parse failures propagate as fatal.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::invoker::Invoker;
use crate::model::WorkflowRequest;
use crate::parse::{extract_json, require_fields};

use super::{AgentContext, AgentId, ContentAgent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub summary: String,
}

pub struct ContentWriter {
    invoker: Arc<Invoker>,
}

impl ContentWriter {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["title", "body", "summary"])?;
    let draft: Draft = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("draft shape: {}", e)))?;
    if draft.body.trim().is_empty() {
        return Err(PipelineError::Validation("body".to_string()));
    }
    Ok(serde_json::to_value(draft).unwrap_or(Value::Null))
}

#[async_trait]
impl ContentAgent for ContentWriter {
    fn id(&self) -> AgentId {
        AgentId::ContentWriter
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        let tone = request.tone.as_deref().unwrap_or("professional");
        let voice = request
            .brand_guidelines
            .as_ref()
            .and_then(|g| g.voice.as_deref())
            .unwrap_or("clear and direct");
        format!(
            "You are a senior content writer. Write a complete {content_type} piece about \
             \"{topic}\" for {audience}. Tone: {tone}. Brand voice: {voice}.\n\n\
             Follow this strategy exactly:\n{strategy}\n\n\
             Work in these SEO targets naturally:\n{seo}\n\n\
             Reply with a single JSON object, no prose outside it, with these fields:\n\
             {{\"title\": string, \"body\": string (full piece, markdown allowed), \
             \"summary\": string (120-160 chars)}}",
            content_type = request.content_type.as_str(),
            topic = request.topic,
            audience = request.audience,
            tone = tone,
            voice = voice,
            strategy = context.context_block(AgentId::ContentStrategist),
            seo = context.context_block(AgentId::AiSeoOptimizer),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    // Default fallback_parse returns None, so failures here are fatal

    fn summarize(&self, output: &Value) -> Option<String> {
        let words = output["body"]
            .as_str()
            .map(|b| b.split_whitespace().count())
            .unwrap_or(0);
        Some(format!("{} words", words))
    }
}
