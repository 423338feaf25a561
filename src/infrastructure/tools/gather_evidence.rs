use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{EvidenceGatherer, SessionRegistry};

#[derive(Debug, thiserror::Error)]
#[error("Evidence gathering error: {0}")]
pub struct GatherEvidenceError(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub struct GatherEvidenceArgs {
    pub question: String,
}

/// Collects and scores evidence for the agent's session. Rejects a call
/// that overlaps another gather or answer on the same session instead of
/// queueing behind it.
pub struct GatherEvidenceTool {
    gatherer: Arc<EvidenceGatherer>,
    sessions: Arc<SessionRegistry>,
    session_id: Uuid,
}

impl GatherEvidenceTool {
    pub fn new(
        gatherer: Arc<EvidenceGatherer>,
        sessions: Arc<SessionRegistry>,
        session_id: Uuid,
    ) -> Self {
        Self {
            gatherer,
            sessions,
            session_id,
        }
    }
}

impl Tool for GatherEvidenceTool {
    const NAME: &'static str = "gather_evidence";

    type Error = GatherEvidenceError;
    type Args = GatherEvidenceArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Retrieve passages relevant to a question, summarize and score \
                          each one, and add the survivors to the session's evidence. Call \
                          again with a refined question to gather more."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to gather evidence for"
                    }
                },
                "required": ["question"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let handle = self
            .sessions
            .get_or_create(self.session_id, &args.question);
        let mut session = self
            .sessions
            .acquire(&handle)
            .map_err(|e| GatherEvidenceError(e.to_string()))?;

        // The session follows the latest gather question; evidence from
        // earlier questions stays merged.
        session.question = args.question.clone();

        let report = self
            .gatherer
            .gather(&mut session)
            .await
            .map_err(|e| GatherEvidenceError(e.to_string()))?;

        Ok(format!(
            "Gathered {} new pieces of evidence ({} candidates retrieved, {} already known, \
             {} below the score threshold, {} failed). Session now holds {} contexts.",
            report.kept,
            report.retrieved,
            report.skipped_existing,
            report.below_threshold,
            report.failed,
            session.contexts().len()
        ))
    }
}
