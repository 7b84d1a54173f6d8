//! HTTP client for the hosted Messages generation endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::{PipelineError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One completed generation: the reply text plus token accounting when the
/// endpoint reports it
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Seam between the invoker and the generation endpoint. The HTTP client
/// implements this; tests substitute mock backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, agent: &str, prompt: &str) -> Result<Generation>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

/// Messages API client. Holds the validated credential and model settings
/// from [`GeneratorConfig`]; one instance is shared by every agent.
pub struct MessagesClient {
    http: reqwest::Client,
    config: GeneratorConfig,
    system_prompt: Option<String>,
}

impl MessagesClient {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            system_prompt: None,
        }
    }

    /// Set a system prompt sent with every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }
}

#[async_trait]
impl GenerationBackend for MessagesClient {
    async fn generate(&self, agent: &str, prompt: &str) -> Result<Generation> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: self.system_prompt.as_deref(),
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Generation {
                agent: agent.to_string(),
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Generation {
                agent: agent.to_string(),
                message: format!("endpoint returned {}: {}", status, detail),
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| PipelineError::Generation {
                agent: agent.to_string(),
                message: format!("malformed response body: {}", e),
            })?;

        // The first text block is the reply; anything else is a hard error
        let text = parsed
            .content
            .iter()
            .find_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.clone()),
                ResponseBlock::Other => None,
            })
            .ok_or_else(|| PipelineError::Generation {
                agent: agent.to_string(),
                message: "response contained no text content block".to_string(),
            })?;

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((None, None));

        Ok(Generation {
            text,
            input_tokens,
            output_tokens,
        })
    }
}
