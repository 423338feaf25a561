use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Chunk;

/// One piece of gathered evidence: a chunk paired with a question-specific
/// summary and the relevance score the summarizer assigned to it.
///
/// Immutable once scored. The label is what the answer model cites inline;
/// the citation is the formatted bibliography entry behind that label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub chunk: Chunk,
    pub label: String,
    pub summary: String,
    pub score: f32,
    pub citation: String,
}

impl Context {
    pub fn new(
        chunk: Chunk,
        label: impl Into<String>,
        summary: impl Into<String>,
        score: f32,
        citation: impl Into<String>,
    ) -> Self {
        Self {
            chunk,
            label: label.into(),
            summary: summary.into(),
            score,
            citation: citation.into(),
        }
    }

    pub fn chunk_id(&self) -> Uuid {
        self.chunk.id
    }
}
