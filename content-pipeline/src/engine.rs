//! Workflow engine: the per-request state machine
//!
//! One [`WorkflowEngine`] instance exclusively owns the state of one
//! workflow run. It drives the content-type pipeline strictly sequentially,
//! one agent in flight at a time, aborting the whole run on the first agent
//! failure. Distinct workflows run as independent tasks under the
//! [`PipelineRuntime`]; the only shared state is the [`WorkflowStore`],
//! whose keys are namespaced by workflow id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use content_pipeline_sdk::{
    log_decision, log_workflow_complete, log_workflow_failed, log_workflow_start, AgentStatus,
    WorkflowStatus,
};
use serde_json::Value;
use uuid::Uuid;

use crate::agents::{pipeline_for, AgentContext, AgentDescriptor, AgentId, AgentRegistry};
use crate::error::{PipelineError, Result};
use crate::model::{
    AgentRunState, Decision, DecisionKind, FinalContent, PlatformVariant, WorkflowRequest,
    WorkflowState,
};
use crate::quality::{score_content, QualityReport};
use crate::store::WorkflowStore;

/// Return the first declared dependency of `descriptor` that has not
/// completed, if any. Pipelines are built dependency-ordered so this should
/// never fire; it is checked anyway so a miswired pipeline fails loudly
/// instead of feeding an agent stale context.
pub fn unmet_dependency(
    agents: &[AgentRunState],
    descriptor: &AgentDescriptor,
) -> Option<AgentId> {
    descriptor
        .dependencies
        .iter()
        .copied()
        .find(|dep| {
            !agents
                .iter()
                .any(|a| a.agent_id == *dep && a.status == AgentStatus::Completed)
        })
}

pub struct WorkflowEngine {
    id: String,
    request: WorkflowRequest,
    pipeline: Vec<AgentDescriptor>,
    registry: Arc<AgentRegistry>,
    store: WorkflowStore,
    state: Mutex<WorkflowState>,
}

impl WorkflowEngine {
    pub fn new(
        request: WorkflowRequest,
        registry: Arc<AgentRegistry>,
        store: WorkflowStore,
    ) -> Self {
        let pipeline = pipeline_for(request.content_type);
        Self::with_pipeline(request, pipeline, registry, store)
    }

    fn with_pipeline(
        request: WorkflowRequest,
        pipeline: Vec<AgentDescriptor>,
        registry: Arc<AgentRegistry>,
        store: WorkflowStore,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let agents = pipeline
            .iter()
            .map(|d| AgentRunState::pending(d.id))
            .collect();
        let state = WorkflowState {
            id: id.clone(),
            status: WorkflowStatus::Pending,
            progress: 0,
            current_agent: None,
            agents,
            content: None,
            quality: None,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        };
        Self {
            id,
            request,
            pipeline,
            registry,
            store,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Read-only snapshot of the current workflow state
    pub fn status(&self) -> WorkflowState {
        self.with_state(|s| s.clone())
    }

    /// Drive the pipeline to a terminal state. Errors are also recorded on
    /// the workflow state, so callers that fire-and-forget lose nothing.
    pub async fn run(&self) -> Result<()> {
        let started = Instant::now();
        let total = self.pipeline.len();
        log_workflow_start!(&self.id, self.request.content_type.as_str(), total);
        self.with_state(|s| s.status = WorkflowStatus::Running);

        let mut context = AgentContext::new();

        for (index, descriptor) in self.pipeline.iter().enumerate() {
            if let Some(dep) = unmet_dependency(&self.status().agents, descriptor) {
                let err = PipelineError::Dependency {
                    agent: descriptor.id.to_string(),
                    dependency: dep.to_string(),
                };
                self.fail(Some(descriptor.id), &err);
                return Err(err);
            }

            self.with_state(|s| {
                s.current_agent = Some(descriptor.id);
                let agent = &mut s.agents[index];
                agent.status = AgentStatus::Running;
                agent.start_time = Some(Utc::now());
            });

            match self
                .registry
                .execute(descriptor.id, &self.id, &self.request, &context)
                .await
            {
                Ok(output) => {
                    if let Err(err) =
                        self.store
                            .save_agent_output(&self.id, descriptor.id.as_str(), output.clone())
                    {
                        self.fail(Some(descriptor.id), &err);
                        return Err(err);
                    }
                    context.previous_outputs.insert(descriptor.id, output.clone());
                    self.with_state(|s| {
                        let agent = &mut s.agents[index];
                        agent.status = AgentStatus::Completed;
                        agent.progress = 100;
                        agent.end_time = Some(Utc::now());
                        agent.output = Some(output);
                        // Equal-weighted share per agent, monotonically non-decreasing
                        s.progress = ((index + 1) * 100 / total) as u8;
                    });
                }
                Err(err) => {
                    self.with_state(|s| {
                        let agent = &mut s.agents[index];
                        agent.status = AgentStatus::Failed;
                        agent.end_time = Some(Utc::now());
                        agent.error = Some(err.to_string());
                    });
                    self.fail(Some(descriptor.id), &err);
                    return Err(err);
                }
            }
        }

        let content = aggregate_content(&self.request, &context);
        let quality = score_content(&content, self.request.brand_guidelines.as_ref());
        let persisted = self
            .store
            .save_final_content(&self.id, serde_json::to_value(&content).unwrap_or(Value::Null))
            .and_then(|_| {
                self.store.save_quality_report(
                    &self.id,
                    serde_json::to_value(&quality).unwrap_or(Value::Null),
                )
            });
        if let Err(err) = persisted {
            self.fail(None, &err);
            return Err(err);
        }

        let overall = quality.overall;
        self.with_state(|s| {
            s.status = WorkflowStatus::Completed;
            s.progress = 100;
            s.current_agent = None;
            s.content = Some(content);
            s.quality = Some(quality);
            s.end_time = Some(Utc::now());
        });
        log_workflow_complete!(&self.id, started.elapsed().as_millis() as u64, overall);
        Ok(())
    }

    fn fail(&self, agent: Option<AgentId>, err: &PipelineError) {
        self.with_state(|s| {
            s.status = WorkflowStatus::Failed;
            s.current_agent = None;
            s.error = Some(err.to_string());
            s.end_time = Some(Utc::now());
        });
        log_workflow_failed!(&self.id, agent.map(|a| a.to_string()), err);
    }

    fn require_completed(&self) -> Result<WorkflowState> {
        let state = self.status();
        if state.status != WorkflowStatus::Completed {
            return Err(PipelineError::WorkflowState(format!(
                "workflow {} is {:?}, expected completed",
                self.id, state.status
            )));
        }
        Ok(state)
    }

    pub fn content(&self) -> Result<FinalContent> {
        let state = self.require_completed()?;
        state
            .content
            .ok_or_else(|| PipelineError::WorkflowState("completed without content".to_string()))
    }

    pub fn quality(&self) -> Result<QualityReport> {
        let state = self.require_completed()?;
        state
            .quality
            .ok_or_else(|| PipelineError::WorkflowState("completed without quality".to_string()))
    }

    pub fn approve(&self, feedback: &str) -> Result<Decision> {
        self.record_decision(DecisionKind::Approved, feedback)
    }

    pub fn reject(&self, feedback: &str) -> Result<Decision> {
        self.record_decision(DecisionKind::Rejected, feedback)
    }

    pub fn request_revision(&self, feedback: &str) -> Result<Decision> {
        self.record_decision(DecisionKind::RevisionRequested, feedback)
    }

    fn record_decision(&self, kind: DecisionKind, feedback: &str) -> Result<Decision> {
        self.require_completed()?;
        let decision = Decision {
            kind,
            feedback: feedback.to_string(),
            recorded_at: Utc::now(),
        };
        let value = serde_json::to_value(&decision).unwrap_or(Value::Null);
        match kind {
            DecisionKind::RevisionRequested => self.store.save_revision_request(&self.id, value)?,
            _ => self.store.save_approval(&self.id, value)?,
        }
        log_decision!(&self.id, kind.as_str());
        Ok(decision)
    }
}

/// Assemble the final artifact from agent outputs. The editor's rendition
/// wins over the writer's draft; SEO keywords win over the brief's.
fn aggregate_content(request: &WorkflowRequest, context: &AgentContext) -> FinalContent {
    let writer = context.output_of(AgentId::ContentWriter);
    let editor = context.output_of(AgentId::ContentEditor);

    let field = |name: &str| -> String {
        editor
            .and_then(|v| v[name].as_str())
            .or_else(|| writer.and_then(|v| v[name].as_str()))
            .unwrap_or_default()
            .to_string()
    };

    let keywords = context
        .output_of(AgentId::AiSeoOptimizer)
        .and_then(|v| v["primary_keywords"].as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_else(|| request.keywords.clone());

    let social_posts: Vec<PlatformVariant> = context
        .output_of(AgentId::SocialMediaSpecialist)
        .and_then(|v| serde_json::from_value::<Vec<PlatformVariant>>(v["posts"].clone()).ok())
        .unwrap_or_default();

    FinalContent {
        title: field("title"),
        body: field("body"),
        summary: field("summary"),
        keywords,
        social_posts,
        landing_page: context.output_of(AgentId::LandingPageSpecialist).cloned(),
    }
}

/// Registry of running workflows, constructed once and handed to whatever
/// exposes the engine. No process-wide statics.
pub struct PipelineRuntime {
    registry: Arc<AgentRegistry>,
    store: WorkflowStore,
    workflows: Arc<Mutex<HashMap<String, Arc<WorkflowEngine>>>>,
}

impl PipelineRuntime {
    pub fn new(registry: Arc<AgentRegistry>, store: WorkflowStore) -> Self {
        Self {
            registry,
            store,
            workflows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Create a workflow engine without scheduling it (callers that want to
    /// await the run directly)
    pub fn create(&self, request: WorkflowRequest) -> Arc<WorkflowEngine> {
        let engine = Arc::new(WorkflowEngine::new(
            request,
            self.registry.clone(),
            self.store.clone(),
        ));
        self.workflows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(engine.id().to_string(), engine.clone());
        engine
    }

    /// Create a workflow and drive it on a background task, returning its id
    pub fn start(&self, request: WorkflowRequest) -> String {
        let engine = self.create(request);
        let id = engine.id().to_string();
        tokio::spawn(async move {
            // Failures are recorded on the workflow state and logged by run()
            let _ = engine.run().await;
        });
        id
    }

    pub fn get(&self, id: &str) -> Result<Arc<WorkflowEngine>> {
        self.workflows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::WorkflowState(format!("unknown workflow {}", id)))
    }
}
