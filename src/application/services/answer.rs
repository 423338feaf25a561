use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::LlmService, Answer, BibliographyEntry, DomainError, Session,
};

/// Canonical response when a session holds no evidence at all.
pub const CANNOT_ANSWER: &str = "I cannot answer this question from the available evidence";

/// Turns a session's gathered evidence into a cited answer.
///
/// Reads at most `max_sources` contexts (highest score first, gather order
/// on ties), makes a single answer call, then builds the bibliography from
/// the citation labels the model actually used, deduplicated, in first-use
/// order. A failed answer call leaves the session's contexts intact.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    max_sources: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        llm: Arc<dyn LlmService>,
        system_prompt: impl Into<String>,
        max_sources: usize,
    ) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            max_sources,
        }
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn synthesize(
        &self,
        session: &mut Session,
        max_sources: Option<usize>,
    ) -> Result<Answer, DomainError> {
        let cap = max_sources.unwrap_or(self.max_sources);

        if session.contexts().is_empty() {
            let answer = Answer::new(CANNOT_ANSWER, Vec::new());
            session.set_answer(answer.clone());
            return Ok(answer);
        }

        let selected: Vec<(String, String, String)> = session
            .top_contexts(cap)
            .into_iter()
            .map(|c| (c.label.clone(), c.summary.clone(), c.citation.clone()))
            .collect();

        let prompt = build_prompt(&session.question, &selected);
        let response = self.llm.complete_with_system(&self.system_prompt, &prompt).await?;

        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::schema("empty answer from model"));
        }

        let bibliography = cited_entries(&text, &selected);
        let answer = Answer::new(text, bibliography);

        session.add_usage(&response.usage);
        session.set_answer(answer.clone());

        tracing::info!(
            sources = selected.len(),
            cited = answer.bibliography.len(),
            "answer synthesized"
        );

        Ok(answer)
    }
}

fn build_prompt(question: &str, selected: &[(String, String, String)]) -> String {
    let blocks = selected
        .iter()
        .map(|(label, summary, _)| format!("[{label}]\n{summary}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Question: {question}\n\nEvidence:\n\n{blocks}")
}

/// One bibliography entry per label the answer actually mentions, ordered
/// by first use.
fn cited_entries(answer: &str, selected: &[(String, String, String)]) -> Vec<BibliographyEntry> {
    let mut used: Vec<(usize, &str, &str)> = selected
        .iter()
        .filter_map(|(label, _, citation)| {
            answer
                .find(label.as_str())
                .map(|at| (at, label.as_str(), citation.as_str()))
        })
        .collect();
    used.sort_by_key(|(at, _, _)| *at);

    let mut seen = HashSet::new();
    used.into_iter()
        .filter(|(_, label, _)| seen.insert(*label))
        .map(|(_, label, citation)| BibliographyEntry {
            label: label.to_string(),
            citation: citation.to_string(),
        })
        .collect()
}
