use crate::domain::{errors::DomainError, UsageCounters};
use async_trait::async_trait;

/// Completion text plus the usage the call incurred, so callers can fold
/// accounting into the owning session.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: UsageCounters,
}

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse, DomainError>;
    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<LlmResponse, DomainError>;
}
