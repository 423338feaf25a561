use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::infrastructure::{AskQuestionJob, GatherEvidenceJob, GenerateAnswerJob};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct GatherRequest {
    pub question: String,
    /// Omitted on the first call; reuse the returned id to keep adding
    /// evidence to the same session.
    pub session_id: Option<Uuid>,
    pub evidence_k: Option<usize>,
    pub lambda: Option<f32>,
    pub score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub session_id: Uuid,
    pub max_sources: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JobQueuedResponse {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<JobQueuedResponse>, StatusCode> {
    if request.question.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let job = AskQuestionJob::new(&request.question).with_session(session_id);

    let job_id = state.job_producer.push_ask_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to queue ask job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(JobQueuedResponse {
        job_id,
        session_id,
        status: "queued".to_string(),
    }))
}

pub async fn gather_evidence(
    State(state): State<AppState>,
    Json(request): Json<GatherRequest>,
) -> Result<Json<JobQueuedResponse>, StatusCode> {
    if request.question.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let mut job = GatherEvidenceJob::new(session_id, &request.question);
    job.evidence_k = request.evidence_k;
    job.lambda = request.lambda;
    job.score_threshold = request.score_threshold;

    let job_id = state.job_producer.push_gather_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to queue gather job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(JobQueuedResponse {
        job_id,
        session_id,
        status: "queued".to_string(),
    }))
}

pub async fn generate_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<JobQueuedResponse>, StatusCode> {
    let mut job = GenerateAnswerJob::new(request.session_id);
    job.max_sources = request.max_sources;

    let job_id = state.job_producer.push_answer_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to queue answer job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(JobQueuedResponse {
        job_id,
        session_id: request.session_id,
        status: "queued".to_string(),
    }))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    let result = state
        .job_producer
        .get_job_status(&job_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get job status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Some(job_result) => Ok(Json(JobStatusResponse {
            job_id: job_result.job_id,
            status: format!("{:?}", job_result.status).to_lowercase(),
            result: job_result.result,
            error: job_result.error,
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}
