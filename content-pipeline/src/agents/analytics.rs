//! Performance analyst: predicted engagement, KPIs to track and follow-up
//! recommendations for the finished piece

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
pub struct PerformanceForecast {
    pub predicted_engagement: String,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub struct PerformanceAnalyst {
    invoker: Arc<Invoker>,
}

impl PerformanceAnalyst {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self { invoker }
    }
}

fn parse(reply: &str) -> Result<Value> {
    let value = extract_json(reply)?;
    require_fields(&value, &["predicted_engagement", "recommendations"])?;
    let forecast: PerformanceForecast = serde_json::from_value(value)
        .map_err(|e| PipelineError::Parse(format!("performance forecast shape: {}", e)))?;
    Ok(serde_json::to_value(forecast).unwrap_or(Value::Null))
}

fn fallback(reply: &str) -> Option<Value> {
    let forecast = PerformanceForecast {
        predicted_engagement: "not estimated".to_string(),
        kpis: extract_list_after_keyword(reply, "kpi"),
        recommendations: extract_list_after_keyword(reply, "recommend"),
    };
    serde_json::to_value(forecast).ok()
}

#[async_trait]
impl ContentAgent for PerformanceAnalyst {
    fn id(&self) -> AgentId {
        AgentId::PerformanceAnalyst
    }

    fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String {
        format!(
            "You are a content performance analyst. Forecast how the piece below will \
             perform against goal \"{goals}\" and suggest what to measure.\n\n\
             Final piece:\n{article}\n\n\
             Reply with a single JSON object, no prose, with these fields:\n\
             {{\"predicted_engagement\": string (low/medium/high with one-line rationale), \
             \"kpis\": [string], \"recommendations\": [string]}}",
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
        let recs = output["recommendations"]
            .as_array()
            .map(Vec::len)
            .unwrap_or(0);
        Some(format!("{} recommendations", recs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_requires_an_engagement_estimate() {
        let reply = json!({"recommendations": ["publish on Tuesday"]}).to_string();
        let err = parse(&reply).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(f) if f == "predicted_engagement"));
    }

    #[test]
    fn fallback_scrapes_kpis_and_recommendations() {
        let reply = "KPIs worth tracking:\n- organic sessions\n- time on page\n\n\
                     Recommendations:\n- refresh quarterly";
        let value = fallback(reply).unwrap();
        assert_eq!(value["predicted_engagement"], "not estimated");
        assert_eq!(value["kpis"], json!(["organic sessions", "time on page"]));
        assert_eq!(value["recommendations"], json!(["refresh quarterly"]));
    }
}
