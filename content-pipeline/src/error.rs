//! Error taxonomy for the pipeline engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// All failure modes surfaced by the engine and its components
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fatal startup-time configuration problem (missing credential, bad value)
    #[error("configuration error: {0}")]
    Config(String),

    /// The generation endpoint failed: timeout, non-2xx, malformed reply.
    /// Retried by the invoker before escalating.
    #[error("generation failed for {agent}: {message}")]
    Generation { agent: String, message: String },

    /// The model reply could not be parsed into structured output
    #[error("parse error: {0}")]
    Parse(String),

    /// Structured output parsed but a required field is missing
    #[error("validation error: missing required field '{0}'")]
    Validation(String),

    /// Dispatch requested for an unregistered agent id
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// An agent's declared prerequisite did not complete.
    /// Defensive: should not occur with a correctly built pipeline.
    #[error("dependency not satisfied for {agent}: {dependency} has not completed")]
    Dependency { agent: String, dependency: String },

    /// An operation was invoked on a workflow in the wrong state
    #[error("invalid workflow state: {0}")]
    WorkflowState(String),

    /// The workflow store rejected or could not serve a request
    #[error("store error: {0}")]
    Store(String),
}

impl PipelineError {
    /// True when the invoker should retry the failed call
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Generation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_errors_are_retryable() {
        let err = PipelineError::Generation {
            agent: "content-writer".to_string(),
            message: "503 from endpoint".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!PipelineError::Parse("bad json".to_string()).is_retryable());
        assert!(!PipelineError::Config("no key".to_string()).is_retryable());
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = PipelineError::Validation("trends".to_string());
        assert!(err.to_string().contains("'trends'"));
    }
}
