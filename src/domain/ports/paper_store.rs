use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Paper};

#[async_trait]
pub trait PaperStore: Send + Sync {
    async fn register(&self, paper: &Paper) -> Result<(), DomainError>;
    async fn get(&self, id: Uuid) -> Result<Option<Paper>, DomainError>;

    /// Formatted citation for a paper; implementations fall back to a
    /// minimal citation when metadata is missing or the paper is unknown.
    async fn citation_for(&self, id: Uuid) -> Result<String, DomainError>;
}
