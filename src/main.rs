use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use edition_admin::app_state::AppState;
use edition_admin::config::{AppConfig, QueueBackend};
use edition_admin::services::queue;
use edition_admin::tasks::TaskContext;
use edition_admin::{routes, telemetry, worker};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing edition-admin server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    telemetry::describe_metrics();

    tracing::info!(backend = ?config.queue_backend, "Connecting to job queue");
    let queue = queue::connect(&config).expect("Failed to initialize job queue");

    if config.queue_backend == QueueBackend::Memory {
        let ctx = TaskContext::from_config(&config).expect("Failed to initialize task context");
        worker::spawn_pool(queue.clone(), ctx, config.worker_count);
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, queue);
    let app = routes::router(state, Arc::new(prometheus_handle));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
