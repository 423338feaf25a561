use futures::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::application::services::SummarizationWorker;
use crate::domain::{
    ports::{EmbeddingService, VectorIndex},
    Chunk, DomainError, Session, UsageCounters,
};

#[derive(Debug, Clone)]
pub struct GatherOptions {
    pub evidence_k: usize,
    pub lambda: f32,
    pub score_threshold: f32,
    pub max_concurrency: usize,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self {
            evidence_k: 10,
            lambda: 0.9,
            score_threshold: 0.0,
            max_concurrency: 4,
        }
    }
}

/// What one gather call did, for logging and job results. `scores` holds
/// every score the summarizer returned this call, kept or not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatherReport {
    pub retrieved: usize,
    pub skipped_existing: usize,
    pub summarized: usize,
    pub failed: usize,
    pub below_threshold: usize,
    pub kept: usize,
    pub scores: Vec<f32>,
}

/// Orchestrates one round of evidence gathering: embed the question,
/// retrieve a diverse candidate set, summarize candidates concurrently,
/// filter by score, and merge survivors into the session.
///
/// The session is only written after every summarization unit has settled,
/// so cancelling (dropping) an in-flight gather leaves it unchanged. Two
/// gathers cannot run against the same session at once: `&mut Session`
/// enforces it here, and the session registry enforces it at the tool and
/// worker boundaries.
pub struct EvidenceGatherer {
    embedding: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    summarizer: SummarizationWorker,
    defaults: GatherOptions,
}

impl EvidenceGatherer {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        summarizer: SummarizationWorker,
        defaults: GatherOptions,
    ) -> Self {
        Self {
            embedding,
            index,
            summarizer,
            defaults,
        }
    }

    pub fn defaults(&self) -> &GatherOptions {
        &self.defaults
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn gather(&self, session: &mut Session) -> Result<GatherReport, DomainError> {
        let options = self.defaults.clone();
        self.gather_with(session, &options).await
    }

    #[instrument(skip(self, session, options), fields(session_id = %session.id))]
    pub async fn gather_with(
        &self,
        session: &mut Session,
        options: &GatherOptions,
    ) -> Result<GatherReport, DomainError> {
        // No query vector, no retrieval: embedding failure aborts the call.
        let query = self.embedding.embed(&session.question).await?;

        let mut usage = UsageCounters {
            embedding_calls: 1,
            ..UsageCounters::default()
        };

        let candidates = self
            .index
            .retrieve(&query, options.evidence_k, options.lambda)
            .await?;

        let mut report = GatherReport {
            retrieved: candidates.len(),
            ..GatherReport::default()
        };

        let fresh: Vec<Chunk> = candidates
            .into_iter()
            .map(|c| c.chunk)
            .filter(|chunk| !session.has_chunk(chunk.id))
            .collect();
        report.skipped_existing = report.retrieved - fresh.len();

        let question = session.question.clone();
        let summaries: Vec<_> = fresh
            .iter()
            .map(|chunk| self.summarizer.summarize(chunk, question.as_str()))
            .collect();
        let results: Vec<_> = stream::iter(summaries)
            .buffer_unordered(options.max_concurrency.max(1))
        .collect()
        .await;

        for result in results {
            match result {
                Ok((context, call_usage)) => {
                    report.summarized += 1;
                    report.scores.push(context.score);
                    usage.add(&call_usage);

                    if context.score > options.score_threshold {
                        if session.merge_context(context) {
                            report.kept += 1;
                        } else {
                            report.skipped_existing += 1;
                        }
                    } else {
                        report.below_threshold += 1;
                    }
                }
                Err(e) => {
                    // One bad chunk never aborts its siblings.
                    warn!(error = %e, "summarization unit dropped");
                    report.failed += 1;
                }
            }
        }

        session.add_usage(&usage);

        tracing::info!(
            retrieved = report.retrieved,
            kept = report.kept,
            failed = report.failed,
            "evidence gathered"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mmr::Candidate;
    use crate::domain::ports::{LlmResponse, LlmService, PaperStore};
    use crate::domain::{Embedding, Paper};
    use async_trait::async_trait;
    use uuid::Uuid;

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

    struct StaticIndex(Vec<Chunk>);

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
            Ok(self
                .0
                .iter()
                .take(k)
                .map(|c| Candidate::new(c.clone(), 1.0))
                .collect())
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

    /// Replies with the score embedded in the chunk text as `score=N`;
    /// fails the unit when the text contains `fail`.
    struct ScriptedLlm;

    #[async_trait]
    impl LlmService for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<LlmResponse, DomainError> {
            self.complete_with_system("", prompt).await
        }

        async fn complete_with_system(
            &self,
            _system: &str,
            prompt: &str,
        ) -> Result<LlmResponse, DomainError> {
            if prompt.contains("fail") {
                return Err(DomainError::external("provider unavailable"));
            }

            let score = prompt
                .split("score=")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .unwrap_or("0");

            Ok(LlmResponse {
                text: format!(r#"{{"summary": "relevant bit", "score": {score}}}"#),
                usage: UsageCounters {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    llm_calls: 1,
                    embedding_calls: 0,
                    cost: 0.0,
                },
            })
        }
    }

    struct NoPapers;

    #[async_trait]
    impl PaperStore for NoPapers {
        async fn register(&self, _paper: &Paper) -> Result<(), DomainError> {
            Ok(())
        }

        async fn get(&self, _id: Uuid) -> Result<Option<Paper>, DomainError> {
            Ok(None)
        }

        async fn citation_for(&self, id: Uuid) -> Result<String, DomainError> {
            Ok(format!("Unknown source {id}"))
        }
    }

    fn gatherer(chunks: Vec<Chunk>) -> EvidenceGatherer {
        let summarizer = SummarizationWorker::new(
            Arc::new(ScriptedLlm),
            Arc::new(NoPapers),
            "summarize",
        );
        EvidenceGatherer::new(
            Arc::new(FixedEmbedding),
            Arc::new(StaticIndex(chunks)),
            summarizer,
            GatherOptions::default(),
        )
    }

    fn chunk_scoring(paper_id: Uuid, index: usize, score: i32) -> Chunk {
        Chunk::new(
            paper_id,
            format!("score={score} passage"),
            index,
            Embedding::new(vec![1.0, 0.0]),
        )
    }

    #[tokio::test]
    async fn test_threshold_zero_keeps_all_positive_scores() {
        let paper = Uuid::new_v4();
        let scores = [8, 7, 9, 3, 7, 2, 8, 6, 4, 8];
        let chunks: Vec<Chunk> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| chunk_scoring(paper, i, *s))
            .collect();

        let gatherer = gatherer(chunks);
        let mut session = Session::new("q");
        let report = gatherer.gather(&mut session).await.unwrap();

        assert_eq!(report.retrieved, 10);
        assert_eq!(report.kept, 10);
        assert_eq!(report.below_threshold, 0);
        assert_eq!(session.contexts().len(), 10);
    }

    #[tokio::test]
    async fn test_threshold_filter_is_strictly_greater_than() {
        let paper = Uuid::new_v4();
        let scores = [8, 7, 9, 3, 7, 2, 8, 6, 4, 8];
        let chunks: Vec<Chunk> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| chunk_scoring(paper, i, *s))
            .collect();

        let gatherer = gatherer(chunks);
        let mut session = Session::new("q");
        let options = GatherOptions {
            score_threshold: 5.0,
            ..GatherOptions::default()
        };
        let report = gatherer.gather_with(&mut session, &options).await.unwrap();

        // Of [8,7,9,3,7,2,8,6,4,8], exactly 7 entries are > 5.
        assert_eq!(report.kept, 7);
        assert_eq!(report.below_threshold, 3);
        assert!(session.contexts().iter().all(|c| c.score > 5.0));
    }

    #[tokio::test]
    async fn test_failed_unit_is_dropped_without_aborting_siblings() {
        let paper = Uuid::new_v4();
        let mut chunks = vec![
            chunk_scoring(paper, 0, 8),
            chunk_scoring(paper, 1, 7),
        ];
        chunks.push(Chunk::new(
            paper,
            "this one will fail",
            2,
            Embedding::new(vec![1.0, 0.0]),
        ));

        let gatherer = gatherer(chunks);
        let mut session = Session::new("q");
        let report = gatherer.gather(&mut session).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.kept, 2);
        assert_eq!(session.contexts().len(), 2);
    }

    #[tokio::test]
    async fn test_regather_is_idempotent() {
        let paper = Uuid::new_v4();
        let chunks = vec![chunk_scoring(paper, 0, 8), chunk_scoring(paper, 1, 6)];

        let gatherer = gatherer(chunks);
        let mut session = Session::new("q");

        let first = gatherer.gather(&mut session).await.unwrap();
        assert_eq!(first.kept, 2);

        let second = gatherer.gather(&mut session).await.unwrap();
        assert_eq!(second.kept, 0);
        assert_eq!(second.skipped_existing, 2);
        assert_eq!(session.contexts().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_gathers_nothing_successfully() {
        let gatherer = gatherer(Vec::new());
        let mut session = Session::new("q");
        let report = gatherer.gather(&mut session).await.unwrap();

        assert_eq!(report.retrieved, 0);
        assert_eq!(report.kept, 0);
        assert!(session.contexts().is_empty());
    }

    #[tokio::test]
    async fn test_usage_accumulates_on_session() {
        let paper = Uuid::new_v4();
        let gatherer = gatherer(vec![chunk_scoring(paper, 0, 9)]);
        let mut session = Session::new("q");
        gatherer.gather(&mut session).await.unwrap();

        assert_eq!(session.usage.embedding_calls, 1);
        assert_eq!(session.usage.llm_calls, 1);
        assert_eq!(session.usage.total_tokens(), 15);
    }
}
