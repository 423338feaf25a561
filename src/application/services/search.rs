use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{EmbeddingService, PaperStore, VectorIndex},
    DomainError, Paper,
};

/// How far past `limit` the chunk-level search reaches before hits are
/// grouped into papers.
const CHUNK_OVERFETCH: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct PaperHit {
    pub paper: Paper,
    pub score: f32,
    pub matched_chunks: usize,
}

/// Keyword-style paper discovery over the chunk index: embed the query,
/// similarity-search, group chunk hits by paper, optionally filter by a
/// publication-year range. Read-only, safe to call concurrently with
/// anything else.
pub struct PaperSearchService {
    embedding: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    papers: Arc<dyn PaperStore>,
}

impl PaperSearchService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        papers: Arc<dyn PaperStore>,
    ) -> Self {
        Self {
            embedding,
            index,
            papers,
        }
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        min_year: Option<i32>,
        max_year: Option<i32>,
        limit: usize,
    ) -> Result<Vec<PaperHit>, DomainError> {
        let limit = limit.max(1);
        let query_embedding = self.embedding.embed(query).await?;

        let candidates = self
            .index
            .similarity(&query_embedding, limit * CHUNK_OVERFETCH)
            .await?;

        // Best chunk score and hit count per paper.
        let mut by_paper: HashMap<Uuid, (f32, usize)> = HashMap::new();
        for candidate in &candidates {
            let entry = by_paper
                .entry(candidate.chunk.paper_id)
                .or_insert((f32::NEG_INFINITY, 0));
            entry.0 = entry.0.max(candidate.relevance);
            entry.1 += 1;
        }

        let mut hits = Vec::new();
        for (paper_id, (score, matched_chunks)) in by_paper {
            let Some(paper) = self.papers.get(paper_id).await? else {
                continue;
            };
            if !year_in_range(paper.year, min_year, max_year) {
                continue;
            }
            hits.push(PaperHit {
                paper,
                score,
                matched_chunks,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }
}

/// A paper with an unknown year is excluded once either bound is set.
fn year_in_range(year: Option<i32>, min_year: Option<i32>, max_year: Option<i32>) -> bool {
    if min_year.is_none() && max_year.is_none() {
        return true;
    }
    let Some(year) = year else {
        return false;
    };
    min_year.map_or(true, |min| year >= min) && max_year.map_or(true, |max| year <= max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mmr::Candidate;
    use crate::domain::{Chunk, Embedding};
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;

    struct FixedEmbedding;

    #[async_trait]
    impl EmbeddingService for FixedEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(vec![1.0, 0.0]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Ok(texts.iter().map(|_| Embedding::new(vec![1.0, 0.0])).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct StaticIndex(Vec<Candidate>);

    #[async_trait]
    impl VectorIndex for StaticIndex {
        async fn insert(&self, _chunk: &Chunk) -> Result<(), DomainError> {
            Ok(())
        }

        async fn similarity(
            &self,
            _query: &Embedding,
            k: usize,
        ) -> Result<Vec<Candidate>, DomainError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }

        async fn retrieve(
            &self,
            query: &Embedding,
            k: usize,
            _lambda: f32,
        ) -> Result<Vec<Candidate>, DomainError> {
            self.similarity(query, k).await
        }
    }

    struct MapStore(StdHashMap<Uuid, Paper>);

    #[async_trait]
    impl PaperStore for MapStore {
        async fn register(&self, _paper: &Paper) -> Result<(), DomainError> {
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<Paper>, DomainError> {
            Ok(self.0.get(&id).cloned())
        }

        async fn citation_for(&self, id: Uuid) -> Result<String, DomainError> {
            Ok(self
                .0
                .get(&id)
                .map(|p| p.citation())
                .unwrap_or_else(|| format!("Unknown source {id}")))
        }
    }

    fn candidate(paper_id: Uuid, relevance: f32) -> Candidate {
        let chunk = Chunk::new(paper_id, "text", 0, Embedding::new(vec![1.0, 0.0]));
        Candidate::new(chunk, relevance)
    }

    fn service(papers: Vec<Paper>, candidates: Vec<Candidate>) -> PaperSearchService {
        let map = papers.into_iter().map(|p| (p.id, p)).collect();
        PaperSearchService::new(
            Arc::new(FixedEmbedding),
            Arc::new(StaticIndex(candidates)),
            Arc::new(MapStore(map)),
        )
    }

    #[tokio::test]
    async fn test_groups_chunk_hits_by_paper() {
        let old = Paper::new("Old Result", "old1998").with_year(1998);
        let new = Paper::new("New Result", "new2023").with_year(2023);
        let candidates = vec![
            candidate(old.id, 0.9),
            candidate(old.id, 0.7),
            candidate(new.id, 0.8),
        ];

        let hits = service(vec![old, new], candidates)
            .search("query", None, None, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].paper.key, "old1998");
        assert_eq!(hits[0].matched_chunks, 2);
        assert!((hits[0].score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_year_range_filters_papers() {
        let old = Paper::new("Old Result", "old1998").with_year(1998);
        let new = Paper::new("New Result", "new2023").with_year(2023);
        let undated = Paper::new("Undated Draft", "undated");
        let candidates = vec![
            candidate(old.id, 0.9),
            candidate(new.id, 0.8),
            candidate(undated.id, 0.95),
        ];

        let hits = service(vec![old, new, undated], candidates)
            .search("query", Some(2000), None, 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.key, "new2023");
    }

    #[tokio::test]
    async fn test_empty_index_returns_no_hits() {
        let hits = service(Vec::new(), Vec::new())
            .search("query", None, None, 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
