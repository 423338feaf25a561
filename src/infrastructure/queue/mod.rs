mod jobs;

pub use jobs::{
    keys, queues, AskQuestionJob, GatherEvidenceJob, GenerateAnswerJob, JobResult,
    PaperSearchJob, QueueJobStatus, RESULT_TTL_SECONDS,
};
