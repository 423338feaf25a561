mod answer;
mod evidence;
mod search;
mod summarize;

pub use answer::{AnswerSynthesizer, CANNOT_ANSWER};
pub use evidence::{EvidenceGatherer, GatherOptions, GatherReport};
pub use search::{PaperHit, PaperSearchService};
pub use summarize::SummarizationWorker;
