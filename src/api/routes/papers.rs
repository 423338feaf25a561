use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::infrastructure::PaperSearchJob;

#[derive(Debug, Deserialize)]
pub struct SearchPapersRequest {
    pub query: String,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchQueuedResponse {
    pub job_id: Uuid,
    pub status: String,
}

pub async fn search_papers(
    State(state): State<AppState>,
    Json(request): Json<SearchPapersRequest>,
) -> Result<Json<SearchQueuedResponse>, StatusCode> {
    if request.query.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let mut job =
        PaperSearchJob::new(&request.query).with_year_range(request.min_year, request.max_year);
    job.limit = request.limit;

    let job_id = state.job_producer.push_search_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to queue search job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(SearchQueuedResponse {
        job_id,
        status: "queued".to_string(),
    }))
}
