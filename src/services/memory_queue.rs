use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::models::job::{JobOutcome, JobRecord, JobSnapshot, JobSpec, JobState};
use crate::services::queue::{JobStore, QueueError, QueuedJob};

/// Process-local job store for single-host deployments and tests.
///
/// Workers must run inside the same process (see [`crate::worker::spawn_pool`]).
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
    retention: Duration,
}

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, JobRecord>,
    pending: VecDeque<QueuedJob>,
}

impl MemoryJobQueue {
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retention,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Poisoning is ignored: every update leaves the maps consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expire(&self, inner: &mut Inner) {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return;
        };
        let cutoff = Utc::now() - retention;
        inner.records.retain(|_, r| r.updated_at >= cutoff);
    }

    fn transition(
        &self,
        job_id: Uuid,
        state: JobState,
        result: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(&job_id)
            .ok_or(QueueError::MissingRecord(job_id))?;
        record.state = state;
        record.result = result;
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobQueue {
    async fn enqueue(&self, spec: JobSpec) -> Result<Uuid, QueueError> {
        let job = QueuedJob {
            job_id: Uuid::new_v4(),
            spec,
        };
        let mut inner = self.lock();
        self.expire(&mut inner);
        inner
            .records
            .insert(job.job_id, JobRecord::pending(job.job_id, job.spec.kind()));
        let job_id = job.job_id;
        inner.pending.push_back(job);
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, QueueError> {
        let Ok(job_id) = Uuid::parse_str(job_id) else {
            return Ok(JobSnapshot::unknown());
        };
        let mut inner = self.lock();
        self.expire(&mut inner);
        Ok(inner
            .records
            .get(&job_id)
            .map(JobRecord::snapshot)
            .unwrap_or_else(JobSnapshot::unknown))
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        Ok(self.lock().pending.pop_front())
    }

    async fn mark_started(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.transition(job_id, JobState::Started, None)
    }

    async fn complete(&self, job: &QueuedJob, outcome: JobOutcome) -> Result<(), QueueError> {
        let state = outcome.state();
        self.transition(job.job_id, state, outcome.into_result())
    }

    async fn abandon(&self, job: &QueuedJob, reason: &str) -> Result<(), QueueError> {
        let mut inner = self.lock();
        let record = inner
            .records
            .entry(job.job_id)
            .or_insert_with(|| JobRecord::pending(job.job_id, job.spec.kind()));
        record.state = JobState::Failure;
        record.result = Some(serde_json::Value::String(reason.to_string()));
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn queue_depth(&self) -> Result<u64, QueueError> {
        Ok(self.lock().pending.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
