use edition_admin::config::{AppConfig, QueueBackend};
use edition_admin::services::queue;
use edition_admin::tasks::TaskContext;
use edition_admin::{telemetry, worker};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    tracing::info!("Starting edition-admin worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");
    if config.queue_backend == QueueBackend::Memory {
        tracing::error!("QUEUE_BACKEND=memory runs jobs inside the server; the worker needs redis");
        std::process::exit(1);
    }

    tracing::info!("Connecting to Redis job queue");
    let queue = queue::connect(&config).expect("Failed to initialize job queue");
    let ctx = TaskContext::from_config(&config).expect("Failed to initialize task context");

    tracing::info!(workers = config.worker_count, "Worker ready, starting job processing loops");

    let handles = worker::spawn_pool(queue, ctx, config.worker_count);
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker loop stopped");
        }
    }
}
