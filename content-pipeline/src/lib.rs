//! Content pipeline orchestration engine
//!
//! Accepts a content brief and runs it through a content-type-specific
//! pipeline of generation agents, each of which turns one model call into a
//! validated, sanitized, typed result consumed by later agents. The engine
//! tracks per-agent and overall progress, aborts on the first failure, then
//! aggregates the final artifact and scores its quality.

pub mod agents;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod model;
pub mod parse;
pub mod quality;
pub mod sanitize;
pub mod store;

pub use client::{Generation, GenerationBackend, MessagesClient};
pub use config::GeneratorConfig;
pub use engine::{PipelineRuntime, WorkflowEngine};
pub use error::{PipelineError, Result};
pub use invoker::{Invoker, RetryPolicy};
pub use model::{ContentType, FinalContent, WorkflowRequest, WorkflowState};
pub use quality::QualityReport;
pub use store::WorkflowStore;
