//! Market research agent: industry landscape, trends, competitors and
//! opportunities for the requested topic

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
pub struct MarketResearch {
    pub industry_overview: String,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
}

pub struct MarketResearcher {
    invoker: Arc<Invoker>,
}

impl MarketResearcher {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["industry_overview", "trends"])?;
    let research: MarketResearch = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("market research shape: {}", e)))?;
    Ok(serde_json::to_value(research).unwrap_or(Value::Null))
}

/// Best-effort recovery: overview from the first paragraph, lists scraped
/// from bulleted sections after their keywords
fn fallback(reply: &str) -> Option<Value> {
    let overview = reply
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("No overview available")
        .to_string();
    let research = MarketResearch {
        industry_overview: overview,
        trends: extract_list_after_keyword(reply, "trend"),
        competitors: extract_list_after_keyword(reply, "competitor"),
        opportunities: extract_list_after_keyword(reply, "opportunit"),
    };
    serde_json::to_value(research).ok()
}

#[async_trait]
impl ContentAgent for MarketResearcher {
    fn id(&self) -> AgentId {
        AgentId::MarketResearcher
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, _context: &AgentContext) -> String {
        format!(
            "You are a market research analyst. Research the market for content about \
             \"{topic}\" aimed at {audience}. Campaign goals: {goals}.\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"industry_overview\": string, \"trends\": [string], \
             \"competitors\": [string], \"opportunities\": [string]}}",
            topic = request.topic,
            audience = request.audience,
            goals = request.goals,
        )
    }

    fn parse_reply(&self, reply: &str) -> Result<Value> {
        parse(reply)
    }

    fn fallback_parse(&self, reply: &str) -> Option<Value> {
        fallback(reply)
    }

    fn summarize(&self, output: &Value) -> Option<String> {
        let trends = output["trends"].as_array().map(Vec::len).unwrap_or(0);
        let competitors = output["competitors"].as_array().map(Vec::len).unwrap_or(0);
        Some(format!("{} trends, {} competitors", trends, competitors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_accepts_embedded_json() {
        let reply = format!(
            "Here is the research:\n{}",
            json!({
                "industry_overview": "Growing martech sector",
                "trends": ["AI assist", "first-party data"],
                "competitors": ["Acme"],
                "opportunities": []
            })
        );
        let value = parse(&reply).unwrap();
        assert_eq!(value["industry_overview"], "Growing martech sector");
        assert_eq!(value["trends"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn strict_parse_requires_overview() {
        let reply = json!({"trends": ["x"]}).to_string();
        let err = parse(&reply).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(f) if f == "industry_overview"));
    }

    #[test]
    fn fallback_scrapes_bulleted_sections() {
        let reply = "The sector is consolidating rapidly.\n\n\
                     Key trends:\n- AI copywriting\n- Privacy-first analytics\n\n\
                     Competitors:\n1. Acme\n2. Globex";
        let value = fallback(reply).unwrap();
        assert_eq!(value["industry_overview"], "The sector is consolidating rapidly.");
        assert_eq!(
            value["trends"],
            json!(["AI copywriting", "Privacy-first analytics"])
        );
        assert_eq!(value["competitors"], json!(["Acme", "Globex"]));
    }
}
