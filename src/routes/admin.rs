//! Edition administration pages under `/estoria-admin/`.

use std::str::FromStr;

use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;

use super::form::{safe_filename, PostedForm};
use super::{
    enqueue, redirect_to_job, AppError, JobQuery, BAD_CHAPTERS, FILE_UPLOADED, INVALID_XML,
    MISSING_COLLATION, UPLOAD_PROBLEM,
};
use crate::app_state::AppState;
use crate::models::chapters::BakeForm;
use crate::models::job::JobSpec;
use crate::models::project::{AdminPage, Project};
use crate::services::collation::{self, CollationIndex};
use crate::services::validation::validate_xml;
use crate::views;

const SELECTION: &str = "/estoria-admin/";

/// Project named in the URL. Unknown projects are sent back to the selection page.
#[derive(Debug, Clone, Copy)]
pub struct SelectedProject(pub Project);

impl<S> FromRequestParts<S> for SelectedProject
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(slug) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Redirect::to(SELECTION))?;
        Project::from_str(&slug)
            .map(SelectedProject)
            .map_err(|_| Redirect::to(SELECTION))
    }
}

fn project_home(project: Project) -> Response {
    Redirect::to(&format!("{SELECTION}{}/", project.slug())).into_response()
}

fn html(body: String) -> Response {
    Html(body).into_response()
}

/// Status view for `?job=<id>`, if present.
async fn job_status(
    state: &AppState,
    page: AdminPage,
    query: &JobQuery,
) -> Result<Option<Response>, AppError> {
    let Some(job) = query.job.as_deref() else {
        return Ok(None);
    };
    let snapshot = state.queue.poll(job).await?;
    Ok(Some(html(views::status(page.job_title(), job, &snapshot, None))))
}

/// GET /estoria-admin/
pub async fn project_selection() -> Html<String> {
    Html(views::project_selection())
}

/// GET /estoria-admin/{project}/
pub async fn index(SelectedProject(project): SelectedProject) -> Html<String> {
    Html(views::project_index(project))
}

async fn show_upload_page(
    state: &AppState,
    project: Project,
    page: AdminPage,
    query: &JobQuery,
) -> Result<Response, AppError> {
    if !project.supports(page) {
        return Ok(project_home(project));
    }
    if let Some(status) = job_status(state, page, query).await? {
        return Ok(status);
    }
    Ok(html(views::upload_page(project, page, "")))
}

/// Shared POST handling for the upload-and-rebuild pages.
async fn upload_or_rebuild(
    state: &AppState,
    project: Project,
    page: AdminPage,
    form: PostedForm,
) -> Result<Response, AppError> {
    let Some(task) = project.task_for(page) else {
        return Ok(project_home(project));
    };
    if form.malformed {
        return Ok(html(views::upload_page(project, page, UPLOAD_PROBLEM)));
    }
    let paths = state.config.project_paths(project);

    if form.pressed("rebuild") {
        if let Some(spec) =
            JobSpec::script_job(task, paths.data_path.clone(), paths.scripts_path.clone())
        {
            let job_id = enqueue(state, spec).await?;
            return Ok(redirect_to_job(job_id));
        }
    }

    let message = if form.pressed("upload") {
        match paths.upload_dir(page) {
            Some(dir) => store_upload(&dir, &form).await?,
            None => UPLOAD_PROBLEM,
        }
    } else {
        ""
    };
    Ok(html(views::upload_page(project, page, message)))
}

/// Validate the posted document and write it into `dir`. Returns the message to show.
async fn store_upload(dir: &std::path::Path, form: &PostedForm) -> Result<&'static str, AppError> {
    let Some(upload) = &form.file else {
        return Ok(UPLOAD_PROBLEM);
    };
    if !validate_xml(&upload.bytes) {
        return Ok(INVALID_XML);
    }
    let Some(filename) = safe_filename(&upload.filename) else {
        return Ok(UPLOAD_PROBLEM);
    };

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), &upload.bytes).await?;
    tracing::info!(file = %filename, dir = %dir.display(), "Stored uploaded document");
    Ok(FILE_UPLOADED)
}

/// GET /estoria-admin/{project}/transcriptions
pub async fn transcriptions(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    Query(query): Query<JobQuery>,
) -> Result<Response, AppError> {
    show_upload_page(&state, project, AdminPage::Transcriptions, &query).await
}

/// POST /estoria-admin/{project}/transcriptions
pub async fn transcriptions_post(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    form: PostedForm,
) -> Result<Response, AppError> {
    upload_or_rebuild(&state, project, AdminPage::Transcriptions, form).await
}

/// GET /estoria-admin/{project}/readerxml
pub async fn readerxml(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    Query(query): Query<JobQuery>,
) -> Result<Response, AppError> {
    show_upload_page(&state, project, AdminPage::ReaderXml, &query).await
}

/// POST /estoria-admin/{project}/readerxml
pub async fn readerxml_post(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    form: PostedForm,
) -> Result<Response, AppError> {
    upload_or_rebuild(&state, project, AdminPage::ReaderXml, form).await
}

/// GET /estoria-admin/{project}/translation
pub async fn translation(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    Query(query): Query<JobQuery>,
) -> Result<Response, AppError> {
    show_upload_page(&state, project, AdminPage::Translation, &query).await
}

/// POST /estoria-admin/{project}/translation
pub async fn translation_post(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    form: PostedForm,
) -> Result<Response, AppError> {
    upload_or_rebuild(&state, project, AdminPage::Translation, form).await
}

/// GET /estoria-admin/{project}/critical
pub async fn critical(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    Query(query): Query<JobQuery>,
) -> Result<Response, AppError> {
    if let Some(status) = job_status(&state, AdminPage::Critical, &query).await? {
        return Ok(status);
    }
    Ok(html(views::critical_page(project, "")))
}

/// POST /estoria-admin/{project}/critical — rebuild, provided the collation exists.
pub async fn critical_post(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    form: PostedForm,
) -> Result<Response, AppError> {
    let Some(task) = project.task_for(AdminPage::Critical) else {
        return Ok(project_home(project));
    };
    if !form.pressed("rebuildfirst") {
        return Ok(html(views::critical_page(project, "")));
    }

    let paths = state.config.project_paths(project);
    if !collation::exists(&paths.collation_index).await {
        tracing::warn!(project = %project, path = %paths.collation_index.display(), "Collation index missing");
        return Ok(html(views::critical_page(project, MISSING_COLLATION)));
    }

    match JobSpec::script_job(task, paths.data_path, paths.scripts_path) {
        Some(spec) => Ok(redirect_to_job(enqueue(&state, spec).await?)),
        None => Ok(project_home(project)),
    }
}

/// Collation index for the baking page, logging why it is unavailable.
async fn collation_index(project: Project, index: &std::path::Path) -> Option<CollationIndex> {
    match collation::read_index(index).await {
        Ok(collation) => Some(collation),
        Err(e) => {
            tracing::warn!(project = %project, error = %e, "Collation index unusable");
            None
        }
    }
}

fn baking_view(
    project: Project,
    form: &BakeForm,
    message: &str,
    collation: Option<&CollationIndex>,
    base_url: &str,
) -> Response {
    let message = if collation.is_none() { MISSING_COLLATION } else { message };
    html(views::baking_page(project, form, message, collation, base_url))
}

/// GET /estoria-admin/{project}/baking
pub async fn baking(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    Query(query): Query<JobQuery>,
) -> Result<Response, AppError> {
    if !project.supports(AdminPage::Baking) {
        return Ok(project_home(project));
    }
    if let Some(status) = job_status(&state, AdminPage::Baking, &query).await? {
        return Ok(status);
    }

    let paths = state.config.project_paths(project);
    let collation = collation_index(project, &paths.collation_index).await;
    Ok(baking_view(project, &BakeForm::default(), "", collation.as_ref(), &paths.baking_url))
}

/// POST /estoria-admin/{project}/baking — bake a range or a single chapter.
pub async fn baking_post(
    State(state): State<AppState>,
    SelectedProject(project): SelectedProject,
    form: Result<Form<BakeForm>, FormRejection>,
) -> Result<Response, AppError> {
    if !project.supports(AdminPage::Baking) {
        return Ok(project_home(project));
    }
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let paths = state.config.project_paths(project);
    let Some(collation) = collation_index(project, &paths.collation_index).await else {
        return Ok(baking_view(project, &form, "", None, &paths.baking_url));
    };
    if !form.is_submission() {
        return Ok(baking_view(project, &BakeForm::default(), "", Some(&collation), &paths.baking_url));
    }

    let Some(range) = form.chapter_range(collation.maximum) else {
        return Ok(baking_view(project, &form, BAD_CHAPTERS, Some(&collation), &paths.baking_url));
    };

    let job_id = enqueue(
        &state,
        JobSpec::BakeChapters {
            start: range.start,
            stop: range.stop,
            base_url: paths.baking_url,
            data_path: paths.data_path,
        },
    )
    .await?;
    Ok(redirect_to_job(job_id))
}
