//! Shared types for content-pipeline workflows: status enums, structured log
//! events and the logging macros used by the engine and agent code.
//!
//! Log events are serialized as single-line JSON to stderr behind the
//! `__CP_EVENT__:` sentinel so a supervising process (TUI, web front end,
//! log collector) can pick them out of the raw stream.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a whole workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// True once the workflow can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

/// Lifecycle status of a single agent run within a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Structured logging events emitted by running workflows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineLog {
    /// Workflow accepted and scheduled
    WorkflowStarted {
        workflow_id: String,
        content_type: String,
        agent_count: usize,
    },
    /// Workflow reached a terminal Completed state
    WorkflowCompleted {
        workflow_id: String,
        elapsed_ms: u64,
        overall_quality: f64,
    },
    /// Workflow aborted with an error
    WorkflowFailed {
        workflow_id: String,
        agent_id: Option<String>,
        error: String,
    },
    /// Agent started executing
    AgentStarted {
        workflow_id: String,
        agent_id: String,
        description: String,
    },
    /// Agent finished successfully
    AgentCompleted {
        workflow_id: String,
        agent_id: String,
        elapsed_ms: u64,
        summary: Option<String>,
    },
    /// Agent raised an unrecovered error
    AgentFailed {
        workflow_id: String,
        agent_id: String,
        error: String,
    },
    /// Agent recovered from a parse failure via its heuristic fallback.
    /// Output shape is valid but content quality may be degraded.
    AgentFallback {
        workflow_id: String,
        agent_id: String,
        reason: String,
    },
    /// One generation attempt inside the retry loop
    GenerationAttempt {
        agent_name: String,
        attempt: u32,
        max_attempts: u32,
        latency_ms: u64,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        error: Option<String>,
    },
    /// A decision (approve/reject/revision) was recorded on a workflow
    DecisionRecorded {
        workflow_id: String,
        decision: String,
    },
}

impl PipelineLog {
    /// Emit this event to stderr for supervisor parsing
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__CP_EVENT__:{}", json);
            // Force flush in concurrent contexts
            let _ = std::io::stderr().flush();
        }
    }
}

#[macro_export]
macro_rules! log_workflow_start {
    ($wid:expr, $content_type:expr, $count:expr) => {
        $crate::PipelineLog::WorkflowStarted {
            workflow_id: $wid.to_string(),
            content_type: $content_type.to_string(),
            agent_count: $count,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_workflow_complete {
    ($wid:expr, $elapsed_ms:expr, $quality:expr) => {
        $crate::PipelineLog::WorkflowCompleted {
            workflow_id: $wid.to_string(),
            elapsed_ms: $elapsed_ms,
            overall_quality: $quality,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_workflow_failed {
    ($wid:expr, $agent:expr, $error:expr) => {
        $crate::PipelineLog::WorkflowFailed {
            workflow_id: $wid.to_string(),
            agent_id: $agent,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_start {
    ($wid:expr, $agent:expr, $desc:expr) => {
        $crate::PipelineLog::AgentStarted {
            workflow_id: $wid.to_string(),
            agent_id: $agent.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_complete {
    ($wid:expr, $agent:expr, $elapsed_ms:expr) => {
        $crate::PipelineLog::AgentCompleted {
            workflow_id: $wid.to_string(),
            agent_id: $agent.to_string(),
            elapsed_ms: $elapsed_ms,
            summary: None,
        }
        .emit();
    };
    ($wid:expr, $agent:expr, $elapsed_ms:expr, $summary:expr) => {
        $crate::PipelineLog::AgentCompleted {
            workflow_id: $wid.to_string(),
            agent_id: $agent.to_string(),
            elapsed_ms: $elapsed_ms,
            summary: Some($summary.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_failed {
    ($wid:expr, $agent:expr, $error:expr) => {
        $crate::PipelineLog::AgentFailed {
            workflow_id: $wid.to_string(),
            agent_id: $agent.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_fallback {
    ($wid:expr, $agent:expr, $reason:expr) => {
        $crate::PipelineLog::AgentFallback {
            workflow_id: $wid.to_string(),
            agent_id: $agent.to_string(),
            reason: $reason.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_generation_attempt {
    ($agent:expr, $attempt:expr, $max:expr, $latency_ms:expr, $in_tok:expr, $out_tok:expr, $error:expr) => {
        $crate::PipelineLog::GenerationAttempt {
            agent_name: $agent.to_string(),
            attempt: $attempt,
            max_attempts: $max,
            latency_ms: $latency_ms,
            input_tokens: $in_tok,
            output_tokens: $out_tok,
            error: $error,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_decision {
    ($wid:expr, $decision:expr) => {
        $crate::PipelineLog::DecisionRecorded {
            workflow_id: $wid.to_string(),
            decision: $decision.to_string(),
        }
        .emit();
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_status_terminality() {
        assert!(!WorkflowStatus::Pending.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
    }

    #[test]
    fn log_event_serializes_with_type_tag() {
        let event = PipelineLog::AgentStarted {
            workflow_id: "wf-1".to_string(),
            agent_id: "market-researcher".to_string(),
            description: "Research the market".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"agent_started\""));
        assert!(json.contains("market-researcher"));
    }

    #[test]
    fn log_event_round_trips() {
        let event = PipelineLog::GenerationAttempt {
            agent_name: "content-writer".to_string(),
            attempt: 2,
            max_attempts: 3,
            latency_ms: 840,
            input_tokens: Some(1200),
            output_tokens: Some(450),
            error: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: PipelineLog = serde_json::from_str(&json).unwrap();
        match back {
            PipelineLog::GenerationAttempt { attempt, max_attempts, .. } => {
                assert_eq!(attempt, 2);
                assert_eq!(max_attempts, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
