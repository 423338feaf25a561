use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::PaperStore, DomainError, Paper};

/// Process-local paper catalog. The ingestion pipeline registers papers
/// here when it indexes their chunks; lookups and citations are served
/// from memory.
pub struct InMemoryPaperStore {
    papers: RwLock<HashMap<Uuid, Paper>>,
}

impl InMemoryPaperStore {
    pub fn new() -> Self {
        Self {
            papers: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPaperStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperStore for InMemoryPaperStore {
    async fn register(&self, paper: &Paper) -> Result<(), DomainError> {
        let mut papers = self
            .papers
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        papers.insert(paper.id, paper.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Paper>, DomainError> {
        let papers = self
            .papers
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(papers.get(&id).cloned())
    }

    async fn citation_for(&self, id: Uuid) -> Result<String, DomainError> {
        match self.get(id).await? {
            Some(paper) => Ok(paper.citation()),
            None => Ok(format!("Unknown source {id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_cite() {
        let store = InMemoryPaperStore::new();
        let paper = Paper::new("A Study of Things", "things2021")
            .with_authors(vec!["Doe J".into()])
            .with_year(2021);

        store.register(&paper).await.unwrap();

        let citation = store.citation_for(paper.id).await.unwrap();
        assert!(citation.contains("Doe J"));
        assert!(citation.contains("(2021)"));
        assert!(citation.contains("A Study of Things"));
    }

    #[tokio::test]
    async fn test_unknown_paper_gets_minimal_citation() {
        let store = InMemoryPaperStore::new();
        let id = Uuid::new_v4();

        let citation = store.citation_for(id).await.unwrap();
        assert_eq!(citation, format!("Unknown source {id}"));
    }
}
