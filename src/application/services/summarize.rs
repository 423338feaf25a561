use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{
    ports::{LlmService, PaperStore},
    Chunk, Context, DomainError, UsageCounters,
};

const MAX_SUMMARY_CHARS: usize = 1200;

/// The structured response every summarization call must honor.
#[derive(Debug, Deserialize)]
struct ChunkVerdict {
    summary: String,
    score: f64,
}

/// One retryable unit of evidence gathering: summarize a single chunk
/// against the question and let the model judge how well the chunk
/// answers it.
///
/// The score reflects the model's judgment of *this chunk answering this
/// question*, not generic semantic closeness, which is what separates the
/// pipeline from similarity-ranked retrieval.
pub struct SummarizationWorker {
    llm: Arc<dyn LlmService>,
    papers: Arc<dyn PaperStore>,
    system_prompt: String,
}

impl SummarizationWorker {
    pub fn new(
        llm: Arc<dyn LlmService>,
        papers: Arc<dyn PaperStore>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            papers,
            system_prompt: system_prompt.into(),
        }
    }

    /// Produces a fully formed `Context` or a typed failure for this chunk
    /// alone. Transport failures bubble up as transient errors (already
    /// retried inside the adapter); malformed model output is a schema
    /// violation and is not retried within the batch.
    pub async fn summarize(
        &self,
        chunk: &Chunk,
        question: &str,
    ) -> Result<(Context, UsageCounters), DomainError> {
        let prompt = self.build_prompt(chunk, question);
        let response = self.llm.complete_with_system(&self.system_prompt, &prompt).await?;

        let verdict = parse_verdict(&response.text)?;

        let key = self
            .papers
            .get(chunk.paper_id)
            .await?
            .map(|p| p.key)
            .unwrap_or_else(|| "source".to_string());
        let label = format!("{key} chunk {}", chunk.chunk_index);
        let citation = self.papers.citation_for(chunk.paper_id).await?;

        let context = Context::new(
            chunk.clone(),
            label,
            verdict.summary,
            verdict.score as f32,
            citation,
        );

        Ok((context, response.usage))
    }

    fn build_prompt(&self, chunk: &Chunk, question: &str) -> String {
        let mut prompt = format!("Question: {question}\n\nExcerpt:\n{}", chunk.text);
        if let Some(media) = &chunk.media {
            prompt.push_str(&format!("\n\n{}: {}", media.kind.as_str(), media.description));
        }
        prompt
    }
}

/// Validates the model output against the required schema. Anything that
/// fails to parse, misses a field, carries an empty summary, or scores
/// outside [0, 10] is a schema violation.
fn parse_verdict(text: &str) -> Result<ChunkVerdict, DomainError> {
    let body = extract_json_object(text)
        .ok_or_else(|| DomainError::schema("response contains no JSON object"))?;

    let mut verdict: ChunkVerdict = serde_json::from_str(body)
        .map_err(|e| DomainError::schema(format!("summary response: {e}")))?;

    verdict.summary = verdict.summary.trim().to_string();
    if verdict.summary.is_empty() {
        return Err(DomainError::schema("empty summary"));
    }
    if !(0.0..=10.0).contains(&verdict.score) {
        return Err(DomainError::schema(format!(
            "score {} outside [0, 10]",
            verdict.score
        )));
    }

    if verdict.summary.len() > MAX_SUMMARY_CHARS {
        let cut = verdict
            .summary
            .char_indices()
            .take_while(|(i, _)| *i < MAX_SUMMARY_CHARS)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        verdict.summary.truncate(cut);
    }

    Ok(verdict)
}

/// Models frequently wrap JSON in code fences or prose; take the outermost
/// braced object.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::LlmResponse;
    use crate::domain::{Embedding, Paper};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct CannedLlm(String);

    #[async_trait]
    impl LlmService for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<LlmResponse, DomainError> {
            Ok(LlmResponse {
                text: self.0.clone(),
                usage: UsageCounters::default(),
            })
        }

        async fn complete_with_system(
            &self,
            _system: &str,
            prompt: &str,
        ) -> Result<LlmResponse, DomainError> {
            self.complete(prompt).await
        }
    }

    struct SinglePaper(Paper);

    #[async_trait]
    impl PaperStore for SinglePaper {
        async fn register(&self, _paper: &Paper) -> Result<(), DomainError> {
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<Paper>, DomainError> {
            Ok((id == self.0.id).then(|| self.0.clone()))
        }

        async fn citation_for(&self, id: Uuid) -> Result<String, DomainError> {
            match self.get(id).await? {
                Some(paper) => Ok(paper.citation()),
                None => Ok(format!("Unknown source {id}")),
            }
        }
    }

    fn worker(response: &str) -> (SummarizationWorker, Chunk) {
        let paper = Paper::new("On Tests", "ontests").with_year(2024);
        let chunk = Chunk::new(paper.id, "chunk body", 3, Embedding::new(vec![1.0]));
        let worker = SummarizationWorker::new(
            Arc::new(CannedLlm(response.to_string())),
            Arc::new(SinglePaper(paper)),
            "summarize",
        );
        (worker, chunk)
    }

    #[tokio::test]
    async fn test_valid_response_builds_context() {
        let (worker, chunk) = worker(r#"{"summary": "The chunk explains X.", "score": 8}"#);
        let (context, _) = worker.summarize(&chunk, "what is X?").await.unwrap();

        assert_eq!(context.summary, "The chunk explains X.");
        assert_eq!(context.score, 8.0);
        assert_eq!(context.label, "ontests chunk 3");
        assert!(context.citation.contains("On Tests"));
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        let (worker, chunk) =
            worker("```json\n{\"summary\": \"Fine.\", \"score\": 5.5}\n```");
        let (context, _) = worker.summarize(&chunk, "q").await.unwrap();
        assert_eq!(context.score, 5.5);
    }

    #[tokio::test]
    async fn test_missing_score_is_schema_violation() {
        let (worker, chunk) = worker(r#"{"summary": "no score here"}"#);
        let err = worker.summarize(&chunk, "q").await.unwrap_err();
        assert!(matches!(err, DomainError::Schema(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_schema_violation() {
        let (worker, chunk) = worker(r#"{"summary": "too sure", "score": 11}"#);
        let err = worker.summarize(&chunk, "q").await.unwrap_err();
        assert!(matches!(err, DomainError::Schema(_)));
    }

    #[tokio::test]
    async fn test_empty_summary_is_schema_violation() {
        let (worker, chunk) = worker(r#"{"summary": "   ", "score": 4}"#);
        let err = worker.summarize(&chunk, "q").await.unwrap_err();
        assert!(matches!(err, DomainError::Schema(_)));
    }

    #[tokio::test]
    async fn test_non_json_response_is_schema_violation() {
        let (worker, chunk) = worker("I would rate this an 8 out of 10.");
        let err = worker.summarize(&chunk, "q").await.unwrap_err();
        assert!(matches!(err, DomainError::Schema(_)));
    }
}
