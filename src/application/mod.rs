//! Application layer - Use cases and orchestration.
//!
//! This module contains the services that orchestrate the evidence
//! pipeline over domain ports (traits) rather than concrete adapters:
//! gathering, summarization, answer synthesis, paper search, and the
//! per-session concurrency guard.

pub mod services;
pub mod sessions;

pub use services::{
    AnswerSynthesizer, EvidenceGatherer, GatherOptions, GatherReport, PaperHit,
    PaperSearchService, SummarizationWorker, CANNOT_ANSWER,
};
pub use sessions::{SessionHandle, SessionRegistry};
