use std::sync::Arc;

use crate::api::queue::{JobProducer, RedisPool};
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub job_producer: JobProducer,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(redis_pool: RedisPool, config: AppConfig) -> Self {
        let job_producer = JobProducer::new(redis_pool.clone());
        Self {
            redis_pool,
            job_producer,
            config: Arc::new(config),
        }
    }
}
