//! Agent implementations and dispatch
//!
//! Each pipeline step is a [`ContentAgent`]: it composes a prompt from the
//! brief plus upstream outputs, invokes the model through the retrying
//! [`Invoker`], parses the reply strictly and falls back to heuristic
//! extraction where its policy allows, then sanitizes the result. Agents
//! are registered in an [`AgentRegistry`] lookup table; the engine only
//! ever dispatches by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use content_pipeline_sdk::{
    log_agent_complete, log_agent_failed, log_agent_fallback, log_agent_start,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::invoker::Invoker;
use crate::model::{ContentType, WorkflowRequest};
use crate::sanitize::sanitize_value;

mod analytics;
mod audience;
mod editor;
mod landing;
mod market_research;
mod seo;
mod social;
mod strategy;
mod writer;

pub use analytics::PerformanceAnalyst;
pub use audience::AudienceAnalyzer;
pub use editor::ContentEditor;
pub use landing::LandingPageSpecialist;
pub use market_research::MarketResearcher;
pub use seo::SeoOptimizer;
pub use social::SocialMediaSpecialist;
pub use strategy::ContentStrategist;
pub use writer::ContentWriter;

/// Identifier for each of the nine pipeline agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentId {
    MarketResearcher,
    AudienceAnalyzer,
    ContentStrategist,
    AiSeoOptimizer,
    ContentWriter,
    ContentEditor,
    SocialMediaSpecialist,
    LandingPageSpecialist,
    PerformanceAnalyst,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::MarketResearcher => "market-researcher",
            AgentId::AudienceAnalyzer => "audience-analyzer",
            AgentId::ContentStrategist => "content-strategist",
            AgentId::AiSeoOptimizer => "ai-seo-optimizer",
            AgentId::ContentWriter => "content-writer",
            AgentId::ContentEditor => "content-editor",
            AgentId::SocialMediaSpecialist => "social-media-specialist",
            AgentId::LandingPageSpecialist => "landing-page-specialist",
            AgentId::PerformanceAnalyst => "performance-analyst",
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one pipeline step
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub name: &'static str,
    pub estimated_duration: Duration,
    pub dependencies: &'static [AgentId],
}

/// Descriptor table. Dependency lists are declared so that the pipeline
/// builders below always return a valid topological order.
pub fn descriptor_for(id: AgentId) -> AgentDescriptor {
    use AgentId::*;
    let (name, secs, dependencies): (&'static str, u64, &'static [AgentId]) = match id {
        MarketResearcher => ("Market Researcher", 30, &[]),
        AudienceAnalyzer => ("Audience Analyzer", 25, &[MarketResearcher]),
        ContentStrategist => (
            "Content Strategist",
            35,
            &[MarketResearcher, AudienceAnalyzer],
        ),
        AiSeoOptimizer => ("AI SEO Optimizer", 20, &[ContentStrategist]),
        ContentWriter => ("Content Writer", 60, &[ContentStrategist, AiSeoOptimizer]),
        ContentEditor => ("Content Editor", 30, &[ContentWriter]),
        SocialMediaSpecialist => ("Social Media Specialist", 20, &[ContentEditor]),
        LandingPageSpecialist => ("Landing Page Specialist", 25, &[ContentEditor]),
        PerformanceAnalyst => ("Performance Analyst", 15, &[ContentEditor]),
    };
    AgentDescriptor {
        id,
        name,
        estimated_duration: Duration::from_secs(secs),
        dependencies,
    }
}

/// Build the ordered agent list for a content type. Dependencies always
/// precede dependents in the returned list.
pub fn pipeline_for(content_type: ContentType) -> Vec<AgentDescriptor> {
    use AgentId::*;
    let mut ids = vec![
        MarketResearcher,
        AudienceAnalyzer,
        ContentStrategist,
        AiSeoOptimizer,
        ContentWriter,
        ContentEditor,
    ];
    match content_type {
        ContentType::Landing => ids.push(LandingPageSpecialist),
        ContentType::Social => ids.push(SocialMediaSpecialist),
        ContentType::Blog | ContentType::Email => {}
    }
    ids.push(PerformanceAnalyst);

    ids.into_iter().map(descriptor_for).collect()
}

/// Read-only execution context handed to each agent: the immutable brief
/// plus the outputs of every completed upstream agent
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub previous_outputs: HashMap<AgentId, Value>,
}

impl AgentContext {
    pub fn new() -> Self {
        Self {
            previous_outputs: HashMap::new(),
        }
    }

    pub fn output_of(&self, id: AgentId) -> Option<&Value> {
        self.previous_outputs.get(&id)
    }

    /// Pretty-printed upstream output for prompt embedding, or a marker
    /// when the upstream agent did not run
    pub fn context_block(&self, id: AgentId) -> String {
        match self.output_of(id) {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
            None => "(not available)".to_string(),
        }
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Canary token that health-check replies must echo
const HEALTH_TOKEN: &str = "PONG";

/// One pipeline step. The default `execute` implements the shared
/// prompt -> invoke -> parse -> sanitize flow; implementations supply the
/// prompt, the strict parser and their fallback policy.
#[async_trait]
pub trait ContentAgent: Send + Sync {
    fn id(&self) -> AgentId;

    fn invoker(&self) -> &Invoker;

    /// Compose the prompt from the brief and upstream outputs
    fn build_prompt(&self, request: &WorkflowRequest, context: &AgentContext) -> String;

    /// Strict parse of the model reply into this agent's typed output
    fn parse_reply(&self, reply: &str) -> Result<Value>;

    /// Heuristic recovery when strict parsing fails. Returning `None`
    /// disables fallback for this agent and makes parse failures fatal.
    fn fallback_parse(&self, _reply: &str) -> Option<Value> {
        None
    }

    /// Short summary line for the completion log (e.g. "4 keywords")
    fn summarize(&self, _output: &Value) -> Option<String> {
        None
    }

    async fn execute(
        &self,
        workflow_id: &str,
        request: &WorkflowRequest,
        context: &AgentContext,
    ) -> Result<Value> {
        let id = self.id();
        let descriptor = descriptor_for(id);
        let started = Instant::now();
        log_agent_start!(workflow_id, id, descriptor.name);

        let prompt = self.build_prompt(request, context);
        let reply = match self.invoker().invoke(id.as_str(), &prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                log_agent_failed!(workflow_id, id, err);
                return Err(err);
            }
        };

        let output = match self.parse_reply(&reply) {
            Ok(value) => value,
            Err(err) if recoverable(&err) => match self.fallback_parse(&reply) {
                Some(value) => {
                    log_agent_fallback!(workflow_id, id, err);
                    value
                }
                None => {
                    log_agent_failed!(workflow_id, id, err);
                    return Err(err);
                }
            },
            Err(err) => {
                log_agent_failed!(workflow_id, id, err);
                return Err(err);
            }
        };

        let output = sanitize_value(output);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match self.summarize(&output) {
            Some(summary) => log_agent_complete!(workflow_id, id, elapsed_ms, summary),
            None => log_agent_complete!(workflow_id, id, elapsed_ms),
        }
        Ok(output)
    }

    /// Issue a trivial canary prompt and verify the echoed token
    async fn health_check(&self) -> Result<()> {
        let prompt = format!(
            "Health check for the {} agent. Reply with exactly the word {} and nothing else.",
            self.id(),
            HEALTH_TOKEN
        );
        let reply = self.invoker().invoke(self.id().as_str(), &prompt).await?;
        if reply.contains(HEALTH_TOKEN) {
            Ok(())
        } else {
            Err(PipelineError::Generation {
                agent: self.id().to_string(),
                message: format!("health check reply did not echo {}", HEALTH_TOKEN),
            })
        }
    }
}

/// Parse and validation failures may be recovered by fallback; anything
/// else propagates
fn recoverable(err: &PipelineError) -> bool {
    matches!(
        err,
        PipelineError::Parse(_) | PipelineError::Validation(_)
    )
}

/// Lookup table mapping agent ids to implementations. Pure dispatch plus
/// logging; holds no workflow state.
pub struct AgentRegistry {
    agents: HashMap<AgentId, Arc<dyn ContentAgent>>,
}

impl AgentRegistry {
    /// Register all nine agents against a shared invoker
    pub fn with_all_agents(invoker: Arc<Invoker>) -> Self {
        let mut agents: HashMap<AgentId, Arc<dyn ContentAgent>> = HashMap::new();
        let entries: Vec<Arc<dyn ContentAgent>> = vec![
            Arc::new(MarketResearcher::new(invoker.clone())),
            Arc::new(AudienceAnalyzer::new(invoker.clone())),
            Arc::new(ContentStrategist::new(invoker.clone())),
            Arc::new(SeoOptimizer::new(invoker.clone())),
            Arc::new(ContentWriter::new(invoker.clone())),
            Arc::new(ContentEditor::new(invoker.clone())),
            Arc::new(SocialMediaSpecialist::new(invoker.clone())),
            Arc::new(LandingPageSpecialist::new(invoker.clone())),
            Arc::new(PerformanceAnalyst::new(invoker)),
        ];
        for agent in entries {
            agents.insert(agent.id(), agent);
        }
        Self { agents }
    }

    /// Build a registry from explicit implementations (used by tests)
    pub fn from_agents(entries: Vec<Arc<dyn ContentAgent>>) -> Self {
        let mut agents: HashMap<AgentId, Arc<dyn ContentAgent>> = HashMap::new();
        for agent in entries {
            agents.insert(agent.id(), agent);
        }
        Self { agents }
    }

    pub fn get(&self, id: AgentId) -> Result<Arc<dyn ContentAgent>> {
        self.agents
            .get(&id)
            .cloned()
            .ok_or_else(|| PipelineError::AgentNotFound(id.to_string()))
    }

    /// Dispatch one agent execution by id
    pub async fn execute(
        &self,
        id: AgentId,
        workflow_id: &str,
        request: &WorkflowRequest,
        context: &AgentContext,
    ) -> Result<Value> {
        let agent = self.get(id)?;
        agent.execute(workflow_id, request, context).await
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(pipeline: &[AgentDescriptor], id: AgentId) -> usize {
        pipeline.iter().position(|d| d.id == id).unwrap()
    }

    #[test]
    fn every_pipeline_respects_declared_dependencies() {
        for content_type in [
            ContentType::Blog,
            ContentType::Social,
            ContentType::Landing,
            ContentType::Email,
        ] {
            let pipeline = pipeline_for(content_type);
            assert!(!pipeline.is_empty());
            for (i, descriptor) in pipeline.iter().enumerate() {
                for dep in descriptor.dependencies {
                    let dep_index = pipeline.iter().position(|d| d.id == *dep);
                    assert!(
                        matches!(dep_index, Some(j) if j < i),
                        "{:?}: dependency {} of {} not satisfied earlier in the list",
                        content_type,
                        dep,
                        descriptor.id
                    );
                }
            }
        }
    }

    #[test]
    fn blog_pipeline_is_the_seven_core_agents() {
        let pipeline = pipeline_for(ContentType::Blog);
        let ids: Vec<AgentId> = pipeline.iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                AgentId::MarketResearcher,
                AgentId::AudienceAnalyzer,
                AgentId::ContentStrategist,
                AgentId::AiSeoOptimizer,
                AgentId::ContentWriter,
                AgentId::ContentEditor,
                AgentId::PerformanceAnalyst,
            ]
        );
        assert!(!ids.contains(&AgentId::LandingPageSpecialist));
        assert!(!ids.contains(&AgentId::SocialMediaSpecialist));
    }

    #[test]
    fn landing_pipeline_adds_the_specialist_after_the_editor() {
        let pipeline = pipeline_for(ContentType::Landing);
        assert_eq!(pipeline.len(), 8);
        let editor = index_of(&pipeline, AgentId::ContentEditor);
        let specialist = index_of(&pipeline, AgentId::LandingPageSpecialist);
        assert!(specialist > editor);
    }

    #[test]
    fn social_pipeline_adds_the_social_specialist() {
        let pipeline = pipeline_for(ContentType::Social);
        let ids: Vec<AgentId> = pipeline.iter().map(|d| d.id).collect();
        assert!(ids.contains(&AgentId::SocialMediaSpecialist));
        assert!(!ids.contains(&AgentId::LandingPageSpecialist));
    }

    #[test]
    fn agent_ids_serialize_kebab_case() {
        let json = serde_json::to_string(&AgentId::AiSeoOptimizer).unwrap();
        assert_eq!(json, "\"ai-seo-optimizer\"");
        let back: AgentId = serde_json::from_str("\"market-researcher\"").unwrap();
        assert_eq!(back, AgentId::MarketResearcher);
    }
}
