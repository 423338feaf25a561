use serde::Deserialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub redis_url: String,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub worker: WorkerConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub prompt_price_per_1k: f64,
    pub completion_price_per_1k: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// `memory` or `qdrant`.
    pub backend: String,
    pub qdrant_url: String,
    pub collection: String,
    /// Similarity floor for the MMR candidate pool.
    pub min_similarity: f32,
    /// How many candidates the qdrant backend fetches per MMR query.
    pub candidate_pool: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub evidence_k: usize,
    pub lambda: f32,
    pub score_threshold: f32,
    pub max_concurrency: usize,
    pub answer_max_sources: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub result_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            redis_url: "redis://localhost:6379".to_string(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            worker: WorkerConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-opus-20240229".to_string(),
            timeout_seconds: 60,
            max_retries: 3,
            prompt_price_per_1k: 0.0,
            completion_price_per_1k: 0.0,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_seconds: 30,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "paper_chunks".to_string(),
            min_similarity: 0.0,
            candidate_pool: 64,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            evidence_k: 10,
            lambda: 0.9,
            score_threshold: 0.0,
            max_concurrency: 4,
            answer_max_sources: 5,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            result_ttl_seconds: 3600,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub summarize: SummarizePrompt,
    pub answer: AnswerPrompt,
    pub agent: AgentPrompt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizePrompt {
    pub system: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnswerPrompt {
    pub system: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentPrompt {
    pub system: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            summarize: SummarizePrompt::default(),
            answer: AnswerPrompt::default(),
            agent: AgentPrompt::default(),
        }
    }
}

impl Default for SummarizePrompt {
    fn default() -> Self {
        Self {
            system: "You summarize excerpts from scientific papers for a specific question. \
                     Reply with a JSON object only: {\"summary\": \"...\", \"score\": N}. \
                     The summary is at most 100 words and covers only material relevant to \
                     the question. The score is a number from 0 to 10 rating how well this \
                     excerpt answers the question; 0 means irrelevant."
                .to_string(),
        }
    }
}

impl Default for AnswerPrompt {
    fn default() -> Self {
        Self {
            system: "You answer a question using only the supplied evidence blocks. Each \
                     block starts with a citation label in square brackets. Cite every claim \
                     inline with the label of the block supporting it, e.g. (smith2020 chunk 3). \
                     If the evidence does not support an answer, say so plainly."
                .to_string(),
        }
    }
}

impl Default for AgentPrompt {
    fn default() -> Self {
        Self {
            system: "You are a research assistant answering questions over a corpus of \
                     scientific papers. Use paper_search to find relevant papers, \
                     gather_evidence to collect and score passages for the question, and \
                     gen_answer to produce the final cited answer. Gather evidence before \
                     answering; gather again with a refined question when the evidence is weak."
                .to_string(),
        }
    }
}

/// Runtime configuration plus the prompt texts for the three LLM roles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads YAML from `path`; missing sections fall back to defaults.
    pub fn from_yaml_file(path: &str) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DomainError::validation(format!("config {path}: {e}")))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| DomainError::validation(format!("config {path}: {e}")))
    }

    /// `CONFIG_PATH` selects a YAML file; individual env vars override the
    /// connection endpoints.
    pub fn from_env() -> Result<Self, DomainError> {
        let mut app = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var("REDIS_URL") {
            app.config.redis_url = url;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            app.config.index.qdrant_url = url;
        }

        Ok(app)
    }
}
