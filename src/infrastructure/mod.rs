pub mod agent;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod paper_store;
pub mod queue;
pub mod retry;
pub mod tools;
pub mod vector_index;

pub use agent::ResearchAgent;
pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::TextEmbedding;
pub use llm::AnthropicLlm;
pub use paper_store::InMemoryPaperStore;
pub use queue::{
    keys, queues, AskQuestionJob, GatherEvidenceJob, GenerateAnswerJob, JobResult,
    PaperSearchJob, QueueJobStatus, RESULT_TTL_SECONDS,
};
pub use retry::{with_retries, RetryPolicy};
pub use tools::{GatherEvidenceTool, GenAnswerTool, PaperSearchTool};
pub use vector_index::{InMemoryVectorIndex, QdrantVectorIndex};
