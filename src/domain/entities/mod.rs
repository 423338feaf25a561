mod context;
mod embedding;
mod paper;
mod session;

pub use context::Context;
pub use embedding::Embedding;
pub use paper::{Chunk, ChunkMedia, MediaKind, Paper};
pub use session::{Answer, BibliographyEntry, Session, SessionState, UsageCounters};
