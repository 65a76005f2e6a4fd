pub mod admin;
pub mod auth;
pub mod form;
pub mod health;
pub mod metrics;
pub mod poll;
pub mod xmlconversion;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::JobSpec;
use crate::services::queue::QueueError;
use crate::views;

pub(crate) const INVALID_XML: &str = "The uploaded file is not valid XML";
pub(crate) const UPLOAD_PROBLEM: &str = "There was a problem with the file upload";
pub(crate) const FILE_UPLOADED: &str = "File uploaded";
pub(crate) const MISSING_COLLATION: &str =
    "There is a problem. The collation does not appear to exist.";
pub(crate) const BAD_CHAPTERS: &str = "There was a problem with the supplied chapters to bake!";
pub(crate) const BAD_TASK_ID: &str = "There was a problem with the task id";
pub(crate) const DOWNLOAD_PROBLEM: &str = "There was a problem with the file download";

/// Build the full application router.
pub fn router(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    let body_limit = state.config.upload_limit_bytes;

    let protected = Router::new()
        .route(
            "/xmlconversion/",
            get(xmlconversion::index).post(xmlconversion::submit),
        )
        .route("/estoria-admin/", get(admin::project_selection))
        .route("/estoria-admin/{project}/", get(admin::index))
        .route(
            "/estoria-admin/{project}/transcriptions",
            get(admin::transcriptions).post(admin::transcriptions_post),
        )
        .route(
            "/estoria-admin/{project}/readerxml",
            get(admin::readerxml).post(admin::readerxml_post),
        )
        .route(
            "/estoria-admin/{project}/translation",
            get(admin::translation).post(admin::translation_post),
        )
        .route(
            "/estoria-admin/{project}/critical",
            get(admin::critical).post(admin::critical_post),
        )
        .route(
            "/estoria-admin/{project}/baking",
            get(admin::baking).post(admin::baking_post),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_basic_auth));

    Router::new()
        .route("/", get(|| async { Html(views::landing()) }))
        .route("/static/poll.js", get(poll_script))
        .route("/health", get(health::health_check))
        .route("/poll_state", get(poll::poll_state).post(poll::poll_state))
        .merge(protected)
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

async fn poll_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        views::POLL_SCRIPT,
    )
}

/// Handler failure that is not the user's fault. Logged in full, shown as a fixed page.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(views::unavailable()),
        )
            .into_response()
    }
}

/// Hand a job to the store and count it.
pub(crate) async fn enqueue(state: &AppState, spec: JobSpec) -> Result<Uuid, AppError> {
    let kind = spec.kind().to_string();
    let job_id = state.queue.enqueue(spec).await?;
    tracing::info!(job_id = %job_id, kind = %kind, "Job enqueued");
    ::metrics::counter!("jobs_enqueued_total", "kind" => kind).increment(1);
    Ok(job_id)
}

/// `303 See Other` to the status view of `job_id` on the current page.
pub(crate) fn redirect_to_job(job_id: Uuid) -> Response {
    Redirect::to(&format!("?job={job_id}")).into_response()
}

/// `?job=<id>` on any page.
#[derive(Debug, Default, serde::Deserialize)]
pub struct JobQuery {
    pub job: Option<String>,
}
