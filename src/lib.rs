//! Cited question answering over a scientific-paper corpus.
//!
//! The pipeline gathers evidence with diversity-aware (MMR) retrieval,
//! summarizes and scores each passage against the question concurrently,
//! filters by relevance score, and synthesizes an answer with inline
//! citations and a bibliography. State accumulates in per-question
//! sessions guarded against concurrent mutation.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
