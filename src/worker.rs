use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scholar_agent::application::{
    AnswerSynthesizer, EvidenceGatherer, GatherOptions, PaperSearchService, SessionRegistry,
    SummarizationWorker,
};
use scholar_agent::domain::ports::{EmbeddingService, LlmService, PaperStore, VectorIndex};
use scholar_agent::infrastructure::{
    keys, queues, AnthropicLlm, AppConfig, AskQuestionJob, GatherEvidenceJob,
    GenerateAnswerJob, InMemoryPaperStore, InMemoryVectorIndex, JobResult, PaperSearchJob,
    QdrantVectorIndex, ResearchAgent, TextEmbedding, RESULT_TTL_SECONDS,
};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub sessions: Arc<SessionRegistry>,
    pub gatherer: Arc<EvidenceGatherer>,
    pub synthesizer: Arc<AnswerSynthesizer>,
    pub search: Arc<PaperSearchService>,
    pub agent: Arc<ResearchAgent>,
}

impl WorkerState {
    pub async fn new(redis_pool: RedisPool, config: &AppConfig) -> anyhow::Result<Self> {
        let embedding: Arc<dyn EmbeddingService> =
            Arc::new(TextEmbedding::from_config(&config.config.embedding));
        let llm: Arc<dyn LlmService> = Arc::new(AnthropicLlm::from_config(&config.config.llm));
        let papers: Arc<dyn PaperStore> = Arc::new(InMemoryPaperStore::new());

        let index: Arc<dyn VectorIndex> = match config.config.index.backend.as_str() {
            "qdrant" => Arc::new(
                QdrantVectorIndex::from_config(
                    &config.config.index,
                    config.config.embedding.dimension,
                )
                .await?,
            ),
            _ => Arc::new(
                InMemoryVectorIndex::new()
                    .with_min_similarity(config.config.index.min_similarity),
            ),
        };

        let retrieval = &config.config.retrieval;
        let summarizer = SummarizationWorker::new(
            llm.clone(),
            papers.clone(),
            config.prompts.summarize.system.clone(),
        );
        let gatherer = Arc::new(EvidenceGatherer::new(
            embedding.clone(),
            index.clone(),
            summarizer,
            GatherOptions {
                evidence_k: retrieval.evidence_k,
                lambda: retrieval.lambda,
                score_threshold: retrieval.score_threshold,
                max_concurrency: retrieval.max_concurrency,
            },
        ));
        let synthesizer = Arc::new(AnswerSynthesizer::new(
            llm,
            config.prompts.answer.system.clone(),
            retrieval.answer_max_sources,
        ));
        let search = Arc::new(PaperSearchService::new(embedding, index, papers));

        let sessions = Arc::new(SessionRegistry::new());
        let agent = Arc::new(ResearchAgent::new(
            config,
            search.clone(),
            gatherer.clone(),
            synthesizer.clone(),
            sessions.clone(),
        ));

        Ok(Self {
            redis_pool,
            sessions,
            gatherer,
            synthesizer,
            search,
            agent,
        })
    }
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        tracing::info!(concurrency = self.concurrency, "consumer started");

        loop {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                }
            });

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }
}

async fn conn(state: &WorkerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

async fn set_status(conn: &mut Connection, job_id: uuid::Uuid, status: &JobResult) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(keys::job_status(&job_id), &json, RESULT_TTL_SECONDS)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let mut c = conn(state).await?;

    let result: Option<(String, String)> = c
        .brpop(
            &[
                queues::ASK_QUEUE,
                queues::GATHER_QUEUE,
                queues::ANSWER_QUEUE,
                queues::SEARCH_QUEUE,
            ],
            1.0,
        )
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))?;

    if let Some((queue, job_json)) = result {
        match queue.as_str() {
            q if q == queues::ASK_QUEUE => {
                process_ask_job(state, serde_json::from_str(&job_json)?).await?;
            }
            q if q == queues::GATHER_QUEUE => {
                process_gather_job(state, serde_json::from_str(&job_json)?).await?;
            }
            q if q == queues::ANSWER_QUEUE => {
                process_answer_job(state, serde_json::from_str(&job_json)?).await?;
            }
            q if q == queues::SEARCH_QUEUE => {
                process_search_job(state, serde_json::from_str(&job_json)?).await?;
            }
            _ => tracing::warn!(queue, "unknown queue"),
        }
    }
    Ok(())
}

async fn process_ask_job(state: &WorkerState, job: AskQuestionJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, "processing ask");
    let mut c = conn(state).await?;

    set_status(&mut c, job.job_id, &JobResult::processing(job.job_id)).await?;

    let session_id = job.session_id.unwrap_or_else(uuid::Uuid::new_v4);
    let outcome = state.agent.ask_in_session(&job.question, session_id).await;

    match outcome {
        Ok(response) => {
            set_status(
                &mut c,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "session_id": session_id,
                        "response": response,
                    }),
                ),
            )
            .await?;
        }
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
        }
    }

    tracing::info!(job_id = %job.job_id, "ask completed");
    Ok(())
}

async fn process_gather_job(state: &WorkerState, job: GatherEvidenceJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, session_id = %job.session_id, "processing gather");
    let mut c = conn(state).await?;

    set_status(&mut c, job.job_id, &JobResult::processing(job.job_id)).await?;

    let handle = state.sessions.get_or_create(job.session_id, &job.question);
    let mut session = match state.sessions.acquire(&handle) {
        Ok(session) => session,
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
            return Ok(());
        }
    };

    session.question = job.question.clone();

    let mut options = state.gatherer.defaults().clone();
    if let Some(evidence_k) = job.evidence_k {
        options.evidence_k = evidence_k;
    }
    if let Some(lambda) = job.lambda {
        options.lambda = lambda;
    }
    if let Some(score_threshold) = job.score_threshold {
        options.score_threshold = score_threshold;
    }

    let outcome = state.gatherer.gather_with(&mut session, &options).await;

    match outcome {
        Ok(report) => {
            set_status(
                &mut c,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "session_id": job.session_id,
                        "report": report,
                        "contexts": session.contexts().len(),
                        "state": session.state(),
                    }),
                ),
            )
            .await?;
        }
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
        }
    }

    tracing::info!(job_id = %job.job_id, "gather completed");
    Ok(())
}

async fn process_answer_job(state: &WorkerState, job: GenerateAnswerJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, session_id = %job.session_id, "processing answer");
    let mut c = conn(state).await?;

    set_status(&mut c, job.job_id, &JobResult::processing(job.job_id)).await?;

    // An unknown session behaves as an empty one and yields the sentinel.
    let handle = state.sessions.get_or_create(job.session_id, "");
    let mut session = match state.sessions.acquire(&handle) {
        Ok(session) => session,
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
            return Ok(());
        }
    };

    let outcome = state
        .synthesizer
        .synthesize(&mut session, job.max_sources)
        .await;

    match outcome {
        Ok(answer) => {
            set_status(
                &mut c,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "session_id": job.session_id,
                        "answer": answer.text,
                        "bibliography": answer.bibliography,
                        "usage": session.usage,
                    }),
                ),
            )
            .await?;
        }
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
        }
    }

    tracing::info!(job_id = %job.job_id, "answer completed");
    Ok(())
}

async fn process_search_job(state: &WorkerState, job: PaperSearchJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, "processing search");
    let mut c = conn(state).await?;

    set_status(&mut c, job.job_id, &JobResult::processing(job.job_id)).await?;

    let outcome = state
        .search
        .search(
            &job.query,
            job.min_year,
            job.max_year,
            job.limit.unwrap_or(10),
        )
        .await;

    match outcome {
        Ok(hits) => {
            set_status(
                &mut c,
                job.job_id,
                &JobResult::completed(job.job_id, serde_json::json!({ "papers": hits })),
            )
            .await?;
        }
        Err(e) => {
            set_status(&mut c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
        }
    }

    tracing::info!(job_id = %job.job_id, "search completed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let redis_pool = create_pool(&config.config.redis_url)?;
    info!("Redis connected");

    let concurrency = config.config.worker.concurrency.max(1);

    let state = WorkerState::new(redis_pool, &config).await?;
    info!(backend = %config.config.index.backend, "index ready");

    let consumer = JobConsumer::new(state, concurrency);

    info!(concurrency, "worker started");
    consumer.start().await?;

    Ok(())
}
