use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{
    mmr::{self, Candidate},
    ports::VectorIndex,
    Chunk, DomainError, Embedding,
};

/// In-process index over a `RwLock`ed chunk list. Queries copy their
/// candidate pool out under the read guard, so a concurrent insert never
/// mutates a selection in progress.
pub struct InMemoryVectorIndex {
    chunks: RwLock<Vec<Chunk>>,
    min_similarity: f32,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            min_similarity: 0.0,
        }
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    fn scored_snapshot(&self, query: &Embedding) -> Result<Vec<Candidate>, DomainError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(chunks
            .iter()
            .map(|chunk| {
                let relevance = query.cosine_similarity(&chunk.embedding);
                Candidate::new(chunk.clone(), relevance)
            })
            .collect())
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn insert(&self, chunk: &Chunk) -> Result<(), DomainError> {
        let mut chunks = self
            .chunks
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        chunks.retain(|c| c.id != chunk.id);
        chunks.push(chunk.clone());
        Ok(())
    }

    async fn similarity(
        &self,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<Candidate>, DomainError> {
        let mut scored = self.scored_snapshot(query)?;

        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn retrieve(
        &self,
        query: &Embedding,
        k: usize,
        lambda: f32,
    ) -> Result<Vec<Candidate>, DomainError> {
        let scored = self.scored_snapshot(query)?;

        // Pool = everything above the similarity floor, unless that would
        // leave fewer than k candidates.
        let pool: Vec<Candidate> = scored
            .iter()
            .filter(|c| c.relevance >= self.min_similarity)
            .cloned()
            .collect();
        let pool = if pool.len() < k { scored } else { pool };

        Ok(mmr::select(pool, k, lambda))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn chunk(embedding: Vec<f32>) -> Chunk {
        Chunk::new(Uuid::new_v4(), "text", 0, Embedding::new(embedding))
    }

    #[tokio::test]
    async fn test_insert_and_similarity() {
        let index = InMemoryVectorIndex::new();
        index.insert(&chunk(vec![1.0, 0.0, 0.0])).await.unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = index.similarity(&query, 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!((results[0].relevance - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_reinserting_a_chunk_does_not_duplicate_it() {
        let index = InMemoryVectorIndex::new();
        let c = chunk(vec![1.0, 0.0]);
        index.insert(&c).await.unwrap();
        index.insert(&c).await.unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let results = index.similarity(&query, 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_not_error() {
        let index = InMemoryVectorIndex::new();
        let query = Embedding::new(vec![1.0, 0.0]);

        assert!(index.similarity(&query, 5).await.unwrap().is_empty());
        assert!(index.retrieve(&query, 5, 0.7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_never_returns_duplicates() {
        let index = InMemoryVectorIndex::new();
        for v in [
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.5, 0.5],
        ] {
            index.insert(&chunk(v)).await.unwrap();
        }

        let query = Embedding::new(vec![1.0, 0.0]);
        let picked = index.retrieve(&query, 4, 0.5).await.unwrap();
        let ids: HashSet<Uuid> = picked.iter().map(|c| c.chunk.id).collect();
        assert_eq!(ids.len(), picked.len());
    }

    #[tokio::test]
    async fn test_lambda_one_matches_similarity_order() {
        let index = InMemoryVectorIndex::new();
        for v in [
            vec![0.2, 1.0],
            vec![1.0, 0.0],
            vec![0.7, 0.7],
            vec![0.9, 0.2],
        ] {
            index.insert(&chunk(v)).await.unwrap();
        }

        let query = Embedding::new(vec![1.0, 0.0]);
        let ranked: Vec<Uuid> = index
            .similarity(&query, 4)
            .await
            .unwrap()
            .iter()
            .map(|c| c.chunk.id)
            .collect();
        let mmr_order: Vec<Uuid> = index
            .retrieve(&query, 4, 1.0)
            .await
            .unwrap()
            .iter()
            .map(|c| c.chunk.id)
            .collect();

        assert_eq!(ranked, mmr_order);
    }

    #[tokio::test]
    async fn test_similarity_floor_shrinks_the_pool() {
        let index = InMemoryVectorIndex::new().with_min_similarity(0.5);
        index.insert(&chunk(vec![1.0, 0.0])).await.unwrap();
        index.insert(&chunk(vec![0.95, 0.05])).await.unwrap();
        index.insert(&chunk(vec![0.0, 1.0])).await.unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        // k = 2 fits inside the above-floor pool, so the orthogonal chunk
        // is never considered.
        let picked = index.retrieve(&query, 2, 0.5).await.unwrap();
        assert!(picked.iter().all(|c| c.relevance >= 0.5));
    }
}
