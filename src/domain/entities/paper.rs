use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bibliographic record for one document in the corpus.
///
/// Papers are registered by the ingestion pipeline, which also owns text
/// extraction and chunking. Everything here is optional except the title;
/// citation formatting degrades gracefully when fields are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    /// Short key used to build citation labels, e.g. `vaswani2017`.
    pub key: String,
}

impl Paper {
    pub fn new(title: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            doi: None,
            key: key.into(),
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Formatted citation string; falls back to the title alone when no
    /// other metadata is available.
    pub fn citation(&self) -> String {
        let mut parts = Vec::new();

        if !self.authors.is_empty() {
            parts.push(self.authors.join(", "));
        }
        if let Some(year) = self.year {
            parts.push(format!("({year})"));
        }
        parts.push(self.title.clone());
        if let Some(venue) = &self.venue {
            parts.push(venue.clone());
        }
        if let Some(doi) = &self.doi {
            parts.push(format!("doi:{doi}"));
        }

        parts.join(". ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Figure,
    Table,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Figure => "Figure",
            Self::Table => "Table",
        }
    }
}

/// Auxiliary media attached to a chunk, described in text form so it can
/// be passed to the summarizer alongside the chunk body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMedia {
    pub kind: MediaKind,
    pub description: String,
}

/// A bounded span of one paper with its precomputed embedding.
///
/// Chunks are immutable once created; the index only ever appends them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub text: String,
    pub chunk_index: usize,
    pub embedding: super::Embedding,
    pub media: Option<ChunkMedia>,
}

impl Chunk {
    pub fn new(
        paper_id: Uuid,
        text: impl Into<String>,
        chunk_index: usize,
        embedding: super::Embedding,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper_id,
            text: text.into(),
            chunk_index,
            embedding,
            media: None,
        }
    }

    pub fn with_media(mut self, media: ChunkMedia) -> Self {
        self.media = Some(media);
        self
    }
}
