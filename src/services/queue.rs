use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{AppConfig, QueueBackend};
use crate::models::job::{JobOutcome, JobRecord, JobSnapshot, JobSpec, JobState};
use crate::services::memory_queue::MemoryJobQueue;

const QUEUE_KEY: &str = "edition_admin:jobs";
const PROCESSING_KEY: &str = "edition_admin:processing";
const RECORD_PREFIX: &str = "edition_admin:job:";

/// Job payload handed from the enqueuing handler to a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub spec: JobSpec,
}

/// Storage and hand-off for background jobs.
///
/// The store owns every job record. Handlers enqueue and poll; workers
/// dequeue, mark jobs started and record how they finished.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a new `PENDING` job and make it available to workers.
    async fn enqueue(&self, spec: JobSpec) -> Result<Uuid, QueueError>;

    /// Current snapshot for `job_id`. Unknown, expired or malformed ids
    /// yield [`JobSnapshot::unknown`].
    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, QueueError>;

    /// Take the next job for processing, if any.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError>;

    async fn mark_started(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// Store the terminal state and release the job from the processing set.
    async fn complete(&self, job: &QueuedJob, outcome: JobOutcome) -> Result<(), QueueError>;

    /// Release a job that will never run and record it as `FAILURE`,
    /// recreating its record if it has already expired.
    async fn abandon(&self, job: &QueuedJob, reason: &str) -> Result<(), QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;

    /// Number of jobs waiting for a worker.
    async fn queue_depth(&self) -> Result<u64, QueueError>;

    fn backend_name(&self) -> &'static str;
}

/// Build the store selected in configuration.
pub fn connect(config: &AppConfig) -> Result<Arc<dyn JobStore>, QueueError> {
    let retention = Duration::from_secs(config.job_retention_secs);
    let store: Arc<dyn JobStore> = match config.queue_backend {
        QueueBackend::Redis => Arc::new(JobQueue::new(&config.redis_url, retention)?),
        QueueBackend::Memory => Arc::new(MemoryJobQueue::new(retention)),
    };
    Ok(store)
}

/// Redis-backed job queue shared between the server and worker processes.
///
/// Records live under `edition_admin:job:<id>` with a TTL; the pending list
/// and processing list hold serialized [`QueuedJob`]s.
pub struct JobQueue {
    client: redis::Client,
    retention: Duration,
}

impl JobQueue {
    pub fn new(redis_url: &str, retention: Duration) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client, retention })
    }

    fn record_key(job_id: Uuid) -> String {
        format!("{RECORD_PREFIX}{job_id}")
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    async fn load(&self, job_id: Uuid) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(Self::record_key(job_id)).await?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(QueueError::Serialize))
            .transpose()
    }

    async fn store(&self, record: &JobRecord) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(record)?;
        conn.set_ex::<_, _, ()>(Self::record_key(record.id), payload, self.retention.as_secs())
            .await?;
        Ok(())
    }

    async fn transition(
        &self,
        job_id: Uuid,
        state: JobState,
        result: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        let mut record = self
            .load(job_id)
            .await?
            .ok_or(QueueError::MissingRecord(job_id))?;
        record.state = state;
        record.result = result;
        record.updated_at = chrono::Utc::now();
        self.store(&record).await
    }
}

#[async_trait]
impl JobStore for JobQueue {
    async fn enqueue(&self, spec: JobSpec) -> Result<Uuid, QueueError> {
        let job = QueuedJob {
            job_id: Uuid::new_v4(),
            spec,
        };
        self.store(&JobRecord::pending(job.job_id, job.spec.kind()))
            .await?;

        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&job)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;
        Ok(job.job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, QueueError> {
        let Ok(job_id) = Uuid::parse_str(job_id) else {
            return Ok(JobSnapshot::unknown());
        };
        Ok(self
            .load(job_id)
            .await?
            .map(|r| r.snapshot())
            .unwrap_or_else(JobSnapshot::unknown))
    }

    /// Non-blocking pop that moves the job to the processing list.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn.rpoplpush(QUEUE_KEY, PROCESSING_KEY).await?;

        match result {
            Some(payload) => {
                let job: QueuedJob = serde_json::from_str(&payload)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn mark_started(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.transition(job_id, JobState::Started, None).await
    }

    async fn complete(&self, job: &QueuedJob, outcome: JobOutcome) -> Result<(), QueueError> {
        let state = outcome.state();
        self.transition(job.job_id, state, outcome.into_result())
            .await?;

        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;
        Ok(())
    }

    async fn abandon(&self, job: &QueuedJob, reason: &str) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;

        let mut record = self
            .load(job.job_id)
            .await?
            .unwrap_or_else(|| JobRecord::pending(job.job_id, job.spec.kind()));
        record.state = JobState::Failure;
        record.result = Some(serde_json::Value::String(reason.to_string()));
        record.updated_at = chrono::Utc::now();
        self.store(&record).await
    }

    /// Check Redis connectivity (for health checks).
    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No record for job {0}")]
    MissingRecord(Uuid),
}
