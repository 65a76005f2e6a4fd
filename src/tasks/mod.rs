//! Background job bodies.
//!
//! Every task runs its steps in order and stops at the first failure. The
//! worker turns the returned error into the job's `FAILURE` result.

pub mod bake;
pub mod scripts;
pub mod xmlconversion;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::config::AppConfig;
use crate::models::job::JobSpec;
use crate::services::archive::ArchiveError;
use crate::services::browser::{BrowserError, BrowserLauncher, WebDriverLauncher};
use crate::services::process::{ProcessError, ScriptRunner};

/// Everything a task needs from configuration, resolved once per worker.
#[derive(Clone)]
pub struct TaskContext {
    pub runner: ScriptRunner,
    pub temp_root: PathBuf,
    pub output_location: PathBuf,
    pub resources_location: PathBuf,
    /// Where `xmlconversion` copies its two converters from.
    pub conversion_scripts_path: PathBuf,
    pub browser: Arc<dyn BrowserLauncher>,
}

impl TaskContext {
    pub fn from_config(config: &AppConfig) -> Result<Self, BrowserError> {
        let browser = WebDriverLauncher::new(&config.webdriver_url, config.browser_headless)?;
        Ok(Self {
            runner: ScriptRunner::new(config.python_path.clone()),
            temp_root: config.temp_root.clone(),
            output_location: config.output_location.clone(),
            resources_location: config.resources_location.clone(),
            conversion_scripts_path: config.conversion_scripts_path(),
            browser: Arc::new(browser),
        })
    }
}

/// Release what a job owns on disk when it will never run.
pub async fn discard(spec: &JobSpec) {
    if let JobSpec::XmlConversion { tempdir, .. } = spec {
        if let Err(e) = tokio::fs::remove_dir_all(tempdir).await {
            tracing::warn!(path = %tempdir.display(), error = %e, "Failed to remove working directory");
        }
    }
}

/// Execute one job to completion.
///
/// Returns the value stored as the job's `SUCCESS` result.
pub async fn run(spec: JobSpec, ctx: &TaskContext) -> Result<Option<Value>, TaskError> {
    let kind = spec.kind();
    tracing::info!("{kind} task started");

    let result = match spec {
        JobSpec::XmlConversion {
            xml_filename,
            tempdir,
        } => {
            let zip_name = xmlconversion::convert(ctx, &xml_filename, &tempdir).await?;
            Some(Value::String(zip_name))
        }
        JobSpec::BakeChapters {
            start,
            stop,
            base_url,
            data_path,
        } => {
            bake::bake_chapters(ctx.browser.as_ref(), start, stop, &base_url, &data_path).await?;
            None
        }
        JobSpec::EstoriaXml {
            data_path,
            scripts_path,
        }
        | JobSpec::ReaderXml {
            data_path,
            scripts_path,
        }
        | JobSpec::TranslationXml {
            data_path,
            scripts_path,
        }
        | JobSpec::CpsfCriticalXml {
            data_path,
            scripts_path,
        }
        | JobSpec::CriticalEditionFirst {
            data_path,
            scripts_path,
        } => {
            scripts::run_sequence(&ctx.runner, scripts::sequence(kind), &data_path, &scripts_path)
                .await?;
            None
        }
    };

    tracing::info!("complete");
    Ok(result)
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Could not parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Menu data has no pages for {0}")]
    MissingMenuEntry(String),

    #[error("Unusable upload filename {0:?}")]
    BadFilename(String),

    #[error("Blocking step did not finish: {0}")]
    Join(#[from] tokio::task::JoinError),
}
