use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::anthropic;
use std::time::Duration;

use crate::domain::{
    ports::{LlmResponse, LlmService},
    DomainError, UsageCounters,
};
use crate::infrastructure::config::LlmConfig;
use crate::infrastructure::retry::{with_retries, RetryPolicy};

use super::estimate_tokens;

pub struct AnthropicLlm {
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
    prompt_price_per_1k: f64,
    completion_price_per_1k: f64,
}

impl AnthropicLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            prompt_price_per_1k: 0.0,
            completion_price_per_1k: 0.0,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            retry: RetryPolicy::new(config.max_retries),
            prompt_price_per_1k: config.prompt_price_per_1k,
            completion_price_per_1k: config.completion_price_per_1k,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn prompt_once(&self, system: Option<&str>, prompt: &str) -> Result<String, DomainError> {
        let client = anthropic::Client::from_env();
        let mut builder = client.agent(&self.model);
        if let Some(system) = system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        tokio::time::timeout(self.timeout, agent.prompt(prompt))
            .await
            .map_err(|_| DomainError::timeout("completion call"))?
            .map_err(|e| DomainError::external(e.to_string()))
    }

    fn usage_for(&self, system: Option<&str>, prompt: &str, completion: &str) -> UsageCounters {
        let prompt_tokens = estimate_tokens(prompt) + system.map_or(0, estimate_tokens);
        let completion_tokens = estimate_tokens(completion);
        UsageCounters {
            prompt_tokens,
            completion_tokens,
            llm_calls: 1,
            embedding_calls: 0,
            cost: prompt_tokens as f64 / 1000.0 * self.prompt_price_per_1k
                + completion_tokens as f64 / 1000.0 * self.completion_price_per_1k,
        }
    }
}

#[async_trait]
impl LlmService for AnthropicLlm {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, DomainError> {
        let text = with_retries(&self.retry, "llm completion", || {
            self.prompt_once(None, prompt)
        })
        .await?;

        let usage = self.usage_for(None, prompt, &text);
        Ok(LlmResponse { text, usage })
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<LlmResponse, DomainError> {
        let text = with_retries(&self.retry, "llm completion", || {
            self.prompt_once(Some(system), prompt)
        })
        .await?;

        let usage = self.usage_for(Some(system), prompt, &text);
        Ok(LlmResponse { text, usage })
    }
}
