use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{AnswerSynthesizer, SessionRegistry};

#[derive(Debug, thiserror::Error)]
#[error("Answer generation error: {0}")]
pub struct GenAnswerError(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub struct GenAnswerArgs {
    pub max_sources: Option<usize>,
}

/// Produces the final cited answer from the session's evidence. Like
/// gathering, a call that overlaps another gather or answer on the same
/// session is rejected.
pub struct GenAnswerTool {
    synthesizer: Arc<AnswerSynthesizer>,
    sessions: Arc<SessionRegistry>,
    session_id: Uuid,
}

impl GenAnswerTool {
    pub fn new(
        synthesizer: Arc<AnswerSynthesizer>,
        sessions: Arc<SessionRegistry>,
        session_id: Uuid,
    ) -> Self {
        Self {
            synthesizer,
            sessions,
            session_id,
        }
    }
}

impl Tool for GenAnswerTool {
    const NAME: &'static str = "gen_answer";

    type Error = GenAnswerError;
    type Args = GenAnswerArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Generate the final answer with inline citations from the \
                          evidence gathered so far. Returns a fixed notice when the \
                          session holds no evidence."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "max_sources": {
                        "type": "integer",
                        "description": "Cap on how many top-scoring contexts to use"
                    }
                },
                "required": []
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let handle = self.sessions.get_or_create(self.session_id, "");
        let mut session = self
            .sessions
            .acquire(&handle)
            .map_err(|e| GenAnswerError(e.to_string()))?;

        let answer = self
            .synthesizer
            .synthesize(&mut session, args.max_sources)
            .await
            .map_err(|e| GenAnswerError(e.to_string()))?;

        let mut output = answer.text.clone();
        if !answer.bibliography.is_empty() {
            output.push_str("\n\nReferences:\n");
            for entry in &answer.bibliography {
                output.push_str(&format!("({}) {}\n", entry.label, entry.citation));
            }
        }

        Ok(output)
    }
}
