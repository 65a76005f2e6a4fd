use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use super::form::{safe_filename, PostedForm};
use super::{enqueue, redirect_to_job, AppError, BAD_TASK_ID, DOWNLOAD_PROBLEM, INVALID_XML, UPLOAD_PROBLEM};
use crate::app_state::AppState;
use crate::models::job::JobSpec;
use crate::services::validation::validate_xml;
use crate::views;

const TITLE: &str = "XML conversion";

#[derive(Debug, Default, Deserialize)]
pub struct ConversionQuery {
    pub job: Option<String>,
    pub file: Option<String>,
}

/// GET /xmlconversion/ — upload form, `?job=` status view or `?file=` download.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ConversionQuery>,
) -> Result<Response, AppError> {
    if let Some(job) = query.job {
        let snapshot = state.queue.poll(&job).await?;
        let download = format!("?file={job}");
        return Ok(Html(views::status(TITLE, &job, &snapshot, Some(&download))).into_response());
    }

    if let Some(file) = query.file {
        return download(&state, &file).await;
    }

    Ok(Html(views::xmlconversion_form("")).into_response())
}

/// Serve the archive a finished job produced.
async fn download(state: &AppState, job: &str) -> Result<Response, AppError> {
    let snapshot = state.queue.poll(job).await?;
    let Some(name) = snapshot.result_str() else {
        return Ok(Html(views::xmlconversion_form(BAD_TASK_ID)).into_response());
    };

    if name.contains(['/', '\\']) {
        return Ok(Html(views::xmlconversion_form(DOWNLOAD_PROBLEM)).into_response());
    }

    let path = state.config.output_location.join(name);
    let bytes = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => tokio::fs::read(&path).await.ok(),
        _ => None,
    };
    let Some(bytes) = bytes else {
        tracing::warn!(job = %job, file = %name, "Requested archive is missing");
        return Ok(Html(views::xmlconversion_form(DOWNLOAD_PROBLEM)).into_response());
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={name}"),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// POST /xmlconversion/ — validate the upload and start a conversion.
pub async fn submit(State(state): State<AppState>, form: PostedForm) -> Result<Response, AppError> {
    if form.malformed {
        return Ok(Html(views::xmlconversion_form(UPLOAD_PROBLEM)).into_response());
    }
    if !form.pressed("upload") {
        return Ok(Html(views::xmlconversion_form("")).into_response());
    }

    let Some(upload) = &form.file else {
        return Ok(Html(views::xmlconversion_form(UPLOAD_PROBLEM)).into_response());
    };
    if !validate_xml(&upload.bytes) {
        return Ok(Html(views::xmlconversion_form(INVALID_XML)).into_response());
    }
    let Some(filename) = safe_filename(&upload.filename) else {
        return Ok(Html(views::xmlconversion_form(UPLOAD_PROBLEM)).into_response());
    };

    tokio::fs::create_dir_all(&state.config.temp_root).await?;
    let workdir = tempfile::Builder::new()
        .prefix("tmp")
        .tempdir_in(&state.config.temp_root)?
        .keep();
    if let Err(e) = tokio::fs::write(workdir.join(&filename), &upload.bytes).await {
        let _ = tokio::fs::remove_dir_all(&workdir).await;
        return Err(e.into());
    }

    tracing::info!(file = %filename, workdir = %workdir.display(), "Accepted upload for conversion");
    let spec = JobSpec::XmlConversion {
        xml_filename: filename,
        tempdir: workdir.clone(),
    };
    match enqueue(&state, spec).await {
        Ok(job_id) => Ok(redirect_to_job(job_id)),
        Err(e) => {
            let _ = tokio::fs::remove_dir_all(&workdir).await;
            Err(e)
        }
    }
}
