//! Retry/backoff wrapper around generation calls
//!
//! Every agent call goes through [`Invoker::invoke`]: a per-call timeout,
//! up to `max_attempts` tries with exponential backoff plus jitter between
//! them, and a structured log line per attempt. The retry loop itself is
//! the reusable [`with_retry`] combinator so tests and future call sites
//! share one implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use content_pipeline_sdk::log_generation_attempt;
use rand::Rng;

use crate::client::{Generation, GenerationBackend};
use crate::config::GeneratorConfig;
use crate::error::{PipelineError, Result};

/// Retry parameters for one class of call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `base_delay * 2^n` plus jitter
    pub base_delay: Duration,
    /// Upper bound on the random jitter added to each backoff sleep
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            base_delay: config.base_delay,
            max_jitter: Duration::from_millis(250),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let jitter_ms = if self.max_jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64)
        };
        self.base_delay * 2u32.saturating_pow(attempt) + Duration::from_millis(jitter_ms)
    }
}

/// Run `thunk` up to `policy.max_attempts` times, sleeping with exponential
/// backoff between failed attempts. Only retryable errors are retried; the
/// final error embeds the last failure's message and the agent name.
pub async fn with_retry<T, F, Fut>(agent: &str, policy: RetryPolicy, mut thunk: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_message = String::new();

    for attempt in 0..policy.max_attempts {
        match thunk(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                last_message = err.to_string();
                if attempt + 1 < policy.max_attempts {
                    tokio::time::sleep(policy.backoff_for(attempt)).await;
                }
            }
        }
    }

    Err(PipelineError::Generation {
        agent: agent.to_string(),
        message: format!(
            "exhausted {} attempts, last error: {}",
            policy.max_attempts, last_message
        ),
    })
}

/// Wraps a [`GenerationBackend`] with timeout, retry and attempt logging
pub struct Invoker {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
    policy: RetryPolicy,
}

impl Invoker {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &GeneratorConfig) -> Self {
        Self {
            backend,
            timeout: config.request_timeout,
            policy: RetryPolicy::from_config(config),
        }
    }

    /// Override the retry policy (used for fast-failing health checks)
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Issue one generation call with full retry/timeout handling and
    /// return the reply text
    pub async fn invoke(&self, agent: &str, prompt: &str) -> Result<String> {
        let generation = self.invoke_raw(agent, prompt).await?;
        Ok(generation.text)
    }

    async fn invoke_raw(&self, agent: &str, prompt: &str) -> Result<Generation> {
        let backend = self.backend.clone();
        let timeout = self.timeout;
        let max_attempts = self.policy.max_attempts;

        with_retry(agent, self.policy, move |attempt| {
            let backend = backend.clone();
            let agent = agent.to_string();
            let prompt = prompt.to_string();
            async move {
                let started = Instant::now();
                let outcome = match tokio::time::timeout(timeout, backend.generate(&agent, &prompt))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::Generation {
                        agent: agent.clone(),
                        message: format!("timed out after {:?}", timeout),
                    }),
                };
                let latency_ms = started.elapsed().as_millis() as u64;

                match &outcome {
                    Ok(generation) => {
                        log_generation_attempt!(
                            &agent,
                            attempt + 1,
                            max_attempts,
                            latency_ms,
                            generation.input_tokens,
                            generation.output_tokens,
                            None
                        );
                    }
                    Err(err) => {
                        log_generation_attempt!(
                            &agent,
                            attempt + 1,
                            max_attempts,
                            latency_ms,
                            None,
                            None,
                            Some(err.to_string())
                        );
                    }
                }

                outcome
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(&self, agent: &str, _prompt: &str) -> Result<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Generation {
                agent: agent.to_string(),
                message: "endpoint always fails".to_string(),
            })
        }
    }

    struct FlakyBackend {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl GenerationBackend for FlakyBackend {
        async fn generate(&self, agent: &str, _prompt: &str) -> Result<Generation> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(PipelineError::Generation {
                    agent: agent.to_string(),
                    message: "transient".to_string(),
                })
            } else {
                Ok(Generation {
                    text: "recovered".to_string(),
                    input_tokens: Some(1),
                    output_tokens: Some(1),
                })
            }
        }
    }

    fn test_config() -> GeneratorConfig {
        let mut config = GeneratorConfig::new(
            "sk-test".to_string(),
            "test-model".to_string(),
            256,
            0.5,
            5,
        )
        .unwrap();
        config.base_delay = Duration::from_millis(10);
        config
    }

    #[tokio::test]
    async fn exhausts_exactly_three_attempts_with_backoff() {
        let backend = Arc::new(FailingBackend {
            calls: AtomicU32::new(0),
        });
        let config = test_config();
        let invoker = Invoker::new(backend.clone(), &config).with_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_jitter: Duration::ZERO,
        });

        let started = Instant::now();
        let err = invoker.invoke("market-researcher", "prompt").await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        // Two inter-attempt sleeps: 10ms * 2^0 + 10ms * 2^1
        assert!(elapsed >= Duration::from_millis(30), "elapsed {:?}", elapsed);
        let text = err.to_string();
        assert!(text.contains("market-researcher"));
        assert!(text.contains("endpoint always fails"));
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let config = test_config();
        let invoker = Invoker::new(backend.clone(), &config).with_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        });

        let text = invoker.invoke("content-writer", "prompt").await.unwrap();
        assert_eq!(text, "recovered");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_escape_immediately() {
        struct ParseFailBackend;

        #[async_trait]
        impl GenerationBackend for ParseFailBackend {
            async fn generate(&self, _agent: &str, _prompt: &str) -> Result<Generation> {
                Err(PipelineError::Config("bad credential".to_string()))
            }
        }

        let config = test_config();
        let invoker = Invoker::new(Arc::new(ParseFailBackend), &config);
        let err = invoker.invoke("content-editor", "prompt").await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }
}
