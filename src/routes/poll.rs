use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Form, Json};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::models::job::JobSnapshot;

#[derive(Debug, Default, Deserialize)]
pub struct PollRequest {
    pub task_id: Option<String>,
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest")
}

/// GET|POST /poll_state — current `{result, state}` of a job.
///
/// Problems with the request itself are reported in the same shape with
/// state `FAILURE`.
pub async fn poll_state(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<PollRequest>, FormRejection>,
) -> Json<JobSnapshot> {
    if !is_ajax(&headers) {
        return Json(JobSnapshot::failure("This is not an ajax request"));
    }

    let task_id = form
        .ok()
        .and_then(|Form(request)| request.task_id)
        .filter(|id| !id.is_empty());
    let Some(task_id) = task_id else {
        return Json(JobSnapshot::failure("No task_id in the request"));
    };

    match state.queue.poll(&task_id).await {
        Ok(snapshot) => Json(snapshot),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to poll job");
            Json(JobSnapshot::failure("The job queue is unavailable"))
        }
    }
}
