//! Landing page specialist: restructures the edited piece into a
//! conversion-oriented page

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::invoker::Invoker;
use crate::model::WorkflowRequest;
use crate::parse::{extract_headed_sections, extract_json, require_fields};

use super::strategy::OutlineSection;
use super::{AgentContext, AgentId, ContentAgent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingPage {
    pub headline: String,
    #[serde(default)]
    pub subheadline: Option<String>,
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
    pub call_to_action: String,
}

pub struct LandingPageSpecialist {
    invoker: Arc<Invoker>,
}

impl LandingPageSpecialist {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["headline", "call_to_action"])?;
    let page: LandingPage = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("landing page shape: {}", e)))?;
    Ok(serde_json::to_value(page).unwrap_or(Value::Null))
}

fn fallback(reply: &str) -> Option<Value> {
    let headline = reply
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())?
        .to_string();
    let sections = extract_headed_sections(reply)
        .into_iter()
        .map(|s| OutlineSection {
            heading: s.heading,
            points: s.points,
        })
        .collect();
    let page = LandingPage {
        headline,
        subheadline: None,
        sections,
        call_to_action: "Get started today".to_string(),
    };
    serde_json::to_value(page).ok()
}

#[async_trait]
impl ContentAgent for LandingPageSpecialist {
    fn id(&self) -> AgentId {
        AgentId::LandingPageSpecialist
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        format!(
            "You are a landing page specialist. Turn the article below into a landing \
             page for {audience} with goal: {goals}.\n\n\
             Article:\n{article}\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"headline\": string, \"subheadline\": string, \
             \"sections\": [{{\"heading\": string, \"points\": [string]}}], \
             \"call_to_action\": string}}",
            audience = request.audience,
            goals = request.goals,
            article = context.context_block(AgentId::ContentEditor),
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let sections = output["sections"].as_array().map(Vec::len).unwrap_or(0);
        Some(format!("{} sections", sections))
    }
}
