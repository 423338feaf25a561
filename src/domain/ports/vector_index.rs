use crate::domain::{errors::DomainError, mmr::Candidate, Chunk, Embedding};
use async_trait::async_trait;

/// Append-only store of chunk embeddings supporting plain similarity and
/// diversity-aware (MMR) retrieval.
///
/// Both queries are read-only and safe to run concurrently from multiple
/// sessions; implementations answer against a snapshot of the index taken
/// at query time. Growth happens only at the ingestion boundary.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn insert(&self, chunk: &Chunk) -> Result<(), DomainError>;

    /// Top `k` chunks by cosine similarity, descending. An empty index
    /// returns an empty result, not an error.
    async fn similarity(&self, query: &Embedding, k: usize)
        -> Result<Vec<Candidate>, DomainError>;

    /// Up to `k` chunks selected by Maximum Marginal Relevance with the
    /// given `lambda`. Deterministic for identical index contents and
    /// query; returns fewer than `k` when the pool runs out.
    async fn retrieve(
        &self,
        query: &Embedding,
        k: usize,
        lambda: f32,
    ) -> Result<Vec<Candidate>, DomainError>;
}
