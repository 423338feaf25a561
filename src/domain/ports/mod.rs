mod embedding;
mod llm;
mod paper_store;
mod vector_index;

pub use embedding::EmbeddingService;
pub use llm::{LlmResponse, LlmService};
pub use paper_store::PaperStore;
pub use vector_index::VectorIndex;
