//! Logging and metrics setup shared by the server and worker binaries.

use tracing_subscriber::EnvFilter;

/// JSON logs filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}

/// Register descriptions for the job metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("jobs_enqueued_total", "Total jobs submitted, by kind");
    metrics::describe_counter!("jobs_completed_total", "Total jobs that finished successfully");
    metrics::describe_counter!("jobs_failed_total", "Total jobs that ended in FAILURE");
    metrics::describe_histogram!(
        "job_processing_seconds",
        metrics::Unit::Seconds,
        "Time spent running a job"
    );
    metrics::describe_gauge!("job_queue_depth", "Jobs waiting for a worker");
}
