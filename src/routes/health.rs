use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub queue: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub backend: &'static str,
    pub latency_ms: Option<u64>,
    pub depth: Option<u64>,
}

/// GET /health — job queue connectivity and depth.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let backend = state.queue.backend_name();

    let queue_check = match state.queue.health_check().await {
        Ok(()) => ComponentHealth {
            status: "ok".to_string(),
            backend,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            depth: state.queue.queue_depth().await.ok(),
        },
        Err(e) => {
            tracing::warn!(error = %e, backend, "Queue health check failed");
            ComponentHealth {
                status: "error".to_string(),
                backend,
                latency_ms: None,
                depth: None,
            }
        }
    };

    let healthy = queue_check.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    if let Some(depth) = queue_check.depth {
        metrics::gauge!("job_queue_depth").set(depth as f64);
    }

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { queue: queue_check },
    };

    (status_code, Json(response))
}
