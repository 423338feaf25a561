use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::application::PaperSearchService;

#[derive(Debug, thiserror::Error)]
#[error("Paper search error: {0}")]
pub struct PaperSearchError(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub struct PaperSearchArgs {
    pub query: String,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// Corpus discovery tool. Read-only, so it is safe to run concurrently
/// with itself and with the session-bound tools.
pub struct PaperSearchTool {
    search: Arc<PaperSearchService>,
    limit: usize,
}

impl PaperSearchTool {
    pub fn new(search: Arc<PaperSearchService>, limit: usize) -> Self {
        Self { search, limit }
    }
}

impl Tool for PaperSearchTool {
    const NAME: &'static str = "paper_search";

    type Error = PaperSearchError;
    type Args = PaperSearchArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the paper corpus for documents relevant to a query, \
                          optionally restricted to a publication-year range."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    },
                    "min_year": {
                        "type": "integer",
                        "description": "Earliest publication year to include"
                    },
                    "max_year": {
                        "type": "integer",
                        "description": "Latest publication year to include"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let hits = self
            .search
            .search(&args.query, args.min_year, args.max_year, self.limit)
            .await
            .map_err(|e| PaperSearchError(e.to_string()))?;

        if hits.is_empty() {
            return Ok("No matching papers found.".to_string());
        }

        Ok(hits
            .iter()
            .map(|hit| {
                let year = hit
                    .paper
                    .year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "n.d.".to_string());
                format!(
                    "{} ({}) {} [score {:.2}, {} matching chunks]",
                    hit.paper.key, year, hit.paper.title, hit.score, hit.matched_chunks
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
