//! Audience analysis agent: personas, pain points and channel preferences
//! built on top of the market research

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
pub struct AudienceProfile {
    #[serde(default)]
    pub personas: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub preferred_channels: Vec<String>,
    pub tone_recommendation: String,
}

pub struct AudienceAnalyzer {
    invoker: Arc<Invoker>,
}

impl AudienceAnalyzer {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["personas", "pain_points", "tone_recommendation"])?;
    let profile: AudienceProfile = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("audience profile shape: {}", e)))?;
    Ok(serde_json::to_value(profile).unwrap_or(Value::Null))
}

fn fallback(reply: &str) -> Option<Value> {
    let profile = AudienceProfile {
        personas: extract_list_after_keyword(reply, "persona"),
        pain_points: extract_list_after_keyword(reply, "pain"),
        preferred_channels: extract_list_after_keyword(reply, "channel"),
        tone_recommendation: "professional and approachable".to_string(),
    };
    serde_json::to_value(profile).ok()
}

#[async_trait]
impl ContentAgent for AudienceAnalyzer {
    fn id(&self) -> AgentId {
        AgentId::AudienceAnalyzer
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        format!(
            "You are an audience analyst. Profile the audience \"{audience}\" for content \
             about \"{topic}\". Goals: {goals}.\n\n\
             Market research from the previous step:\n{research}\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"personas\": [string], \"pain_points\": [string], \
             \"preferred_channels\": [string], \"tone_recommendation\": string}}",
            audience = request.audience,
            topic = request.topic,
            goals = request.goals,
            research = context.context_block(AgentId::MarketResearcher),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let personas = output["personas"].as_array().map(Vec::len).unwrap_or(0);
        Some(format!("{} personas", personas))
    }
}
