use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Context;

/// Cumulative accounting for every collaborator call made on behalf of a
/// session. Token counts are estimates when the provider does not report
/// usage; cost uses the configured per-1k rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub llm_calls: u64,
    pub embedding_calls: u64,
    pub cost: f64,
}

impl UsageCounters {
    pub fn add(&mut self, other: &UsageCounters) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.llm_calls += other.llm_calls;
        self.embedding_calls += other.embedding_calls;
        self.cost += other.cost;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibliographyEntry {
    pub label: String,
    pub citation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub bibliography: Vec<BibliographyEntry>,
    pub generated_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(text: impl Into<String>, bibliography: Vec<BibliographyEntry>) -> Self {
        Self {
            text: text.into(),
            bibliography,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Gathering,
    Answered,
}

/// Accumulated state of one question-answering interaction.
///
/// A session is owned by its caller for the lifetime of the conversation
/// and mutated in place by every gather/answer call. Contexts keep gather
/// completion order; duplicates by chunk id are merged, never appended.
/// Merging new evidence invalidates a previously generated answer: the
/// session drops back to `Gathering` rather than carrying an answer that
/// is missing evidence it now holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub question: String,
    contexts: Vec<Context>,
    pub answer: Option<Answer>,
    pub usage: UsageCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(question: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            contexts: Vec::new(),
            answer: None,
            usage: UsageCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn has_chunk(&self, chunk_id: Uuid) -> bool {
        self.contexts.iter().any(|c| c.chunk_id() == chunk_id)
    }

    /// Merges a fully formed context, deduplicating by chunk id.
    ///
    /// Returns `false` (and leaves the session untouched) when the chunk
    /// is already present. A successful merge clears any stored answer.
    pub fn merge_context(&mut self, context: Context) -> bool {
        if self.has_chunk(context.chunk_id()) {
            return false;
        }

        self.contexts.push(context);
        self.answer = None;
        self.updated_at = Utc::now();
        true
    }

    /// The top `max_sources` contexts by score descending; ties keep
    /// gather order (stable sort).
    pub fn top_contexts(&self, max_sources: usize) -> Vec<&Context> {
        let mut ranked: Vec<&Context> = self.contexts.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(max_sources);
        ranked
    }

    pub fn set_answer(&mut self, answer: Answer) {
        self.answer = Some(answer);
        self.updated_at = Utc::now();
    }

    pub fn add_usage(&mut self, delta: &UsageCounters) {
        self.usage.add(delta);
        self.updated_at = Utc::now();
    }

    pub fn state(&self) -> SessionState {
        if self.answer.is_some() {
            SessionState::Answered
        } else if self.contexts.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Gathering
        }
    }
}
