use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::anthropic;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::application::{
    AnswerSynthesizer, EvidenceGatherer, PaperSearchService, SessionRegistry,
};
use crate::domain::DomainError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::tools::{GatherEvidenceTool, GenAnswerTool, PaperSearchTool};

const SEARCH_RESULT_LIMIT: usize = 10;

/// Multi-turn research agent: the model drives `paper_search`,
/// `gather_evidence`, and `gen_answer` over one session per question.
pub struct ResearchAgent {
    client: anthropic::Client,
    model: String,
    system_prompt: String,
    search: Arc<PaperSearchService>,
    gatherer: Arc<EvidenceGatherer>,
    synthesizer: Arc<AnswerSynthesizer>,
    sessions: Arc<SessionRegistry>,
    timeout: Duration,
    max_turns: usize,
}

impl ResearchAgent {
    pub fn new(
        config: &AppConfig,
        search: Arc<PaperSearchService>,
        gatherer: Arc<EvidenceGatherer>,
        synthesizer: Arc<AnswerSynthesizer>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            client: anthropic::Client::from_env(),
            model: config.config.llm.model.clone(),
            system_prompt: config.prompts.agent.system.clone(),
            search,
            gatherer,
            synthesizer,
            sessions,
            timeout: Duration::from_secs(config.config.llm.timeout_seconds * 10),
            max_turns: 12,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Runs the tool loop for one question against a fresh session and
    /// returns the final agent message.
    pub async fn ask(&self, question: &str) -> Result<String, DomainError> {
        let session_id = Uuid::new_v4();
        self.ask_in_session(question, session_id).await
    }

    /// Same as `ask`, but against a caller-chosen session so follow-up
    /// questions can reuse accumulated evidence.
    pub async fn ask_in_session(
        &self,
        question: &str,
        session_id: Uuid,
    ) -> Result<String, DomainError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(&self.system_prompt)
            .tool(PaperSearchTool::new(self.search.clone(), SEARCH_RESULT_LIMIT))
            .tool(GatherEvidenceTool::new(
                self.gatherer.clone(),
                self.sessions.clone(),
                session_id,
            ))
            .tool(GenAnswerTool::new(
                self.synthesizer.clone(),
                self.sessions.clone(),
                session_id,
            ))
            .build();

        tokio::time::timeout(self.timeout, agent.prompt(question).multi_turn(self.max_turns))
            .await
            .map_err(|_| DomainError::timeout("agent run"))?
            .map_err(|e| DomainError::external(format!("Agent failed: {e}")))
    }
}
