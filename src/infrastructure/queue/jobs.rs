use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RESULT_TTL_SECONDS: u64 = 3600;

pub mod queues {
    pub const ASK_QUEUE: &str = "jobs:ask";
    pub const GATHER_QUEUE: &str = "jobs:gather";
    pub const ANSWER_QUEUE: &str = "jobs:answer";
    pub const SEARCH_QUEUE: &str = "jobs:search";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{}", job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Pending,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Processing,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Completed,
            result: Some(result),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Failed,
            result: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

/// A full agent run: the model drives search, gathering, and answering
/// on its own over one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskQuestionJob {
    pub job_id: Uuid,
    pub question: String,
    pub session_id: Option<Uuid>,
}

impl AskQuestionJob {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            question: question.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// One round of evidence gathering against a session. Optional fields
/// override the worker's configured retrieval defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherEvidenceJob {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub question: String,
    pub evidence_k: Option<usize>,
    pub lambda: Option<f32>,
    pub score_threshold: Option<f32>,
}

impl GatherEvidenceJob {
    pub fn new(session_id: Uuid, question: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            session_id,
            question: question.into(),
            evidence_k: None,
            lambda: None,
            score_threshold: None,
        }
    }

    pub fn with_evidence_k(mut self, evidence_k: usize) -> Self {
        self.evidence_k = Some(evidence_k);
        self
    }

    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = Some(lambda);
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = Some(score_threshold);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateAnswerJob {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub max_sources: Option<usize>,
}

impl GenerateAnswerJob {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            session_id,
            max_sources: None,
        }
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = Some(max_sources);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSearchJob {
    pub job_id: Uuid,
    pub query: String,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub limit: Option<usize>,
}

impl PaperSearchJob {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            query: query.into(),
            min_year: None,
            max_year: None,
            limit: None,
        }
    }

    pub fn with_year_range(mut self, min_year: Option<i32>, max_year: Option<i32>) -> Self {
        self.min_year = min_year;
        self.max_year = max_year;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
