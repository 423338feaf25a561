use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    mmr::{self, Candidate},
    ports::VectorIndex,
    Chunk, ChunkMedia, DomainError, Embedding, MediaKind,
};
use crate::infrastructure::config::IndexConfig;

/// Qdrant-backed index. Plain similarity maps directly onto a point
/// search; MMR over-fetches a candidate pool (vectors included) and runs
/// the same selection the in-memory backend uses.
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
    min_similarity: f32,
    candidate_pool: usize,
}

impl QdrantVectorIndex {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let index = Self {
            client,
            collection: collection.to_string(),
            dimension,
            min_similarity: 0.0,
            candidate_pool: 64,
        };

        index.ensure_collection().await?;

        Ok(index)
    }

    pub async fn from_config(config: &IndexConfig, dimension: usize) -> Result<Self, DomainError> {
        let mut index = Self::new(&config.qdrant_url, &config.collection, dimension).await?;
        index.min_similarity = config.min_similarity;
        index.candidate_pool = config.candidate_pool.max(1);
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        Ok(())
    }

    fn uuid_to_point_id(id: Uuid) -> u64 {
        let bytes = id.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }

    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<Candidate>, DomainError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), k as u64)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(candidate_from_point)
            .collect())
    }
}

fn candidate_from_point(point: ScoredPoint) -> Option<Candidate> {
    let embedding = point_vector(&point)?;
    let payload = point.payload;

    let chunk_id: Uuid = payload.get("chunk_id")?.as_str()?.parse().ok()?;
    let paper_id: Uuid = payload.get("paper_id")?.as_str()?.parse().ok()?;
    let text = payload.get("text")?.as_str()?.to_string();
    let chunk_index = payload.get("chunk_index")?.as_integer()? as usize;

    let media = match (
        payload.get("media_kind").and_then(|v| v.as_str()).map(|s| s.as_str()),
        payload.get("media_description").and_then(|v| v.as_str()),
    ) {
        (Some("figure"), Some(description)) => Some(ChunkMedia {
            kind: MediaKind::Figure,
            description: description.to_string(),
        }),
        (Some("table"), Some(description)) => Some(ChunkMedia {
            kind: MediaKind::Table,
            description: description.to_string(),
        }),
        _ => None,
    };

    let chunk = Chunk {
        id: chunk_id,
        paper_id,
        text,
        chunk_index,
        embedding: Embedding::new(embedding),
        media,
    };

    Some(Candidate::new(chunk, point.score))
}

fn point_vector(point: &ScoredPoint) -> Option<Vec<f32>> {
    use qdrant_client::qdrant::vectors_output::VectorsOptions;

    match point.vectors.as_ref()?.vectors_options.as_ref()? {
        VectorsOptions::Vector(vector) => Some(vector.data.clone()),
        VectorsOptions::Vectors(_) => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn insert(&self, chunk: &Chunk) -> Result<(), DomainError> {
        let (media_kind, media_description) = match &chunk.media {
            Some(media) => (
                serde_json::json!(match media.kind {
                    MediaKind::Figure => "figure",
                    MediaKind::Table => "table",
                }),
                serde_json::json!(media.description),
            ),
            None => (serde_json::Value::Null, serde_json::Value::Null),
        };

        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id.to_string(),
            "paper_id": chunk.paper_id.to_string(),
            "text": chunk.text,
            "chunk_index": chunk.chunk_index,
            "media_kind": media_kind,
            "media_description": media_description,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        let point = PointStruct::new(
            Self::uuid_to_point_id(chunk.id),
            chunk.embedding.as_slice().to_vec(),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(())
    }

    async fn similarity(
        &self,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<Candidate>, DomainError> {
        self.search(query, k).await
    }

    async fn retrieve(
        &self,
        query: &Embedding,
        k: usize,
        lambda: f32,
    ) -> Result<Vec<Candidate>, DomainError> {
        let fetch = self.candidate_pool.max(k * 4);
        let scored = self.search(query, fetch).await?;

        let pool: Vec<Candidate> = scored
            .iter()
            .filter(|c| c.relevance >= self.min_similarity)
            .cloned()
            .collect();
        let pool = if pool.len() < k { scored } else { pool };

        Ok(mmr::select(pool, k, lambda))
    }
}
