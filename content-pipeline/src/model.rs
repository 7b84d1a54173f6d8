//! Core data model: the content brief, per-agent run state and the
//! aggregated final artifact

use chrono::{DateTime, Utc};
use content_pipeline_sdk::{AgentStatus, WorkflowStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::AgentId;
use crate::quality::QualityReport;

/// Supported content types; each selects a different agent pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Blog,
    Social,
    Landing,
    Email,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Social => "social",
            ContentType::Landing => "landing",
            ContentType::Email => "email",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blog" => Ok(ContentType::Blog),
            "social" => Ok(ContentType::Social),
            "landing" => Ok(ContentType::Landing),
            "email" => Ok(ContentType::Email),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// The content brief. Immutable once a workflow starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub topic: String,
    pub audience: String,
    pub goals: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub brand_guidelines: Option<BrandGuidelines>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// Brand constraints carried through prompts and quality scoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandGuidelines {
    pub voice: Option<String>,
    #[serde(default)]
    pub approved_terms: Vec<String>,
    #[serde(default)]
    pub disallowed_terms: Vec<String>,
}

/// Execution record for one agent within a workflow.
/// Owned exclusively by the engine; mutated only while the workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunState {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    pub progress: u8,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl AgentRunState {
    pub fn pending(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Pending,
            progress: 0,
            start_time: None,
            end_time: None,
            output: None,
            error: None,
        }
    }
}

/// Full workflow state snapshot returned by `status()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub status: WorkflowStatus,
    pub progress: u8,
    pub current_agent: Option<AgentId>,
    pub agents: Vec<AgentRunState>,
    pub content: Option<FinalContent>,
    pub quality: Option<QualityReport>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Aggregated deliverable assembled after all agents succeed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalContent {
    pub title: String,
    pub body: String,
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Platform-specific variants from the social specialist, if present
    #[serde(default)]
    pub social_posts: Vec<PlatformVariant>,
    /// Landing-page rendition from the landing specialist, if present
    #[serde(default)]
    pub landing_page: Option<Value>,
}

/// One platform-specific adaptation of the main content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformVariant {
    pub platform: String,
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// A human decision recorded against a completed workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub feedback: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approved,
    Rejected,
    RevisionRequested,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Approved => "approved",
            DecisionKind::Rejected => "rejected",
            DecisionKind::RevisionRequested => "revision_requested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_case_insensitively() {
        assert_eq!("Blog".parse::<ContentType>().unwrap(), ContentType::Blog);
        assert_eq!("LANDING".parse::<ContentType>().unwrap(), ContentType::Landing);
        assert!("brochure".parse::<ContentType>().is_err());
    }

    #[test]
    fn request_deserializes_with_optional_fields_absent() {
        let json = r#"{
            "topic": "AI Marketing",
            "audience": "B2B marketers",
            "goals": "thought leadership",
            "content_type": "blog"
        }"#;
        let request: WorkflowRequest = serde_json::from_str(json).unwrap();
        assert!(request.tone.is_none());
        assert!(request.keywords.is_empty());
        assert!(request.platforms.is_empty());
    }
}
