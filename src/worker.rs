//! Worker loops that drain the job store.
//!
//! The `worker` binary runs these against Redis; with the in-memory backend
//! the server spawns them itself via [`spawn_pool`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::models::job::JobOutcome;
use crate::services::queue::{JobStore, QueueError, QueuedJob};
use crate::tasks::{self, TaskContext};

pub const POLL_INTERVAL_MS: u64 = 1000;

/// Take one job, run it and record how it ended.
/// Returns Ok(true) if a job was processed, Ok(false) if none was waiting.
pub async fn process_next_job(
    store: &dyn JobStore,
    ctx: &TaskContext,
) -> Result<bool, QueueError> {
    let job = match store.dequeue().await? {
        Some(j) => j,
        None => return Ok(false),
    };

    let span = tracing::info_span!("job", job_id = %job.job_id, kind = %job.spec.kind());
    process_job(store, ctx, job).instrument(span).await?;
    Ok(true)
}

async fn process_job(
    store: &dyn JobStore,
    ctx: &TaskContext,
    job: QueuedJob,
) -> Result<(), QueueError> {
    let kind = job.spec.kind().to_string();
    if let Err(e) = store.mark_started(job.job_id).await {
        tracing::error!(error = %e, "Could not mark job started, abandoning it");
        tasks::discard(&job.spec).await;
        metrics::counter!("jobs_failed_total", "kind" => kind).increment(1);
        return store
            .abandon(&job, &format!("Could not start job: {e}"))
            .await;
    }

    let start = Instant::now();
    let outcome = execute(&job, ctx).await;
    metrics::histogram!("job_processing_seconds", "kind" => kind.clone())
        .record(start.elapsed().as_secs_f64());

    match &outcome {
        JobOutcome::Success(_) => {
            metrics::counter!("jobs_completed_total", "kind" => kind).increment(1);
        }
        JobOutcome::Failure(message) => {
            tracing::error!(error = %message, "Job failed");
            metrics::counter!("jobs_failed_total", "kind" => kind).increment(1);
        }
    }

    store.complete(&job, outcome).await?;
    if let Ok(depth) = store.queue_depth().await {
        metrics::gauge!("job_queue_depth").set(depth as f64);
    }
    Ok(())
}

/// Run the task on its own tokio task so a panic becomes a `FAILURE`.
async fn execute(job: &QueuedJob, ctx: &TaskContext) -> JobOutcome {
    let spec = job.spec.clone();
    let ctx = ctx.clone();
    let handle = tokio::spawn(
        async move { tasks::run(spec, &ctx).await }.instrument(tracing::Span::current()),
    );

    match handle.await {
        Ok(Ok(result)) => JobOutcome::Success(result),
        Ok(Err(e)) => JobOutcome::Failure(e.to_string()),
        Err(e) => JobOutcome::Failure(format!("Task aborted: {e}")),
    }
}

/// Poll the store forever, sleeping when it is empty.
pub async fn run_loop(store: Arc<dyn JobStore>, ctx: TaskContext) {
    loop {
        match process_next_job(store.as_ref(), &ctx).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job, will retry");
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Start `count` worker loops on the current runtime.
pub fn spawn_pool(store: Arc<dyn JobStore>, ctx: TaskContext, count: usize) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|n| {
            tracing::info!(worker = n, backend = store.backend_name(), "Starting worker loop");
            tokio::spawn(run_loop(store.clone(), ctx.clone()))
        })
        .collect()
}
