use serde::Deserialize;
use std::path::PathBuf;

use crate::models::project::{Project, ProjectPaths};

/// Where job records and the pending list live.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Shared Redis instance; jobs run in the separate `worker` binary.
    Redis,
    /// Process-local queue; jobs run on worker tasks inside the server.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_queue_backend")]
    pub queue_backend: QueueBackend,

    /// Redis connection string for job queue
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Seconds a job record is kept after its last update
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Number of concurrent worker loops
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Directory holding one checkout per project (`estoria-digital/`, `cpsf-digital/`)
    pub edition_base_location: PathBuf,

    /// Static resources bundled into every XML conversion (deps/, estoria.js, estoria.css, index.html)
    pub resources_location: PathBuf,

    /// Where finished conversion archives are written
    pub output_location: PathBuf,

    /// Parent directory for per-upload working directories
    #[serde(default = "std::env::temp_dir")]
    pub temp_root: PathBuf,

    /// Interpreter used to run the conversion scripts
    #[serde(default = "default_python_path")]
    pub python_path: String,

    /// Root URL of the chapter pages that get baked
    #[serde(default = "default_baking_base_url")]
    pub baking_webpages_baseurl: String,

    /// WebDriver endpoint (geckodriver) used for baking
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub browser_headless: bool,

    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: usize,

    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Enables HTTP Basic auth on the admin pages when set
    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_queue_backend() -> QueueBackend {
    QueueBackend::Redis
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_job_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_worker_count() -> usize {
    2
}

fn default_python_path() -> String {
    "python3".to_string()
}

fn default_baking_base_url() -> String {
    "http://localhost:3000/apparatus".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_upload_limit() -> usize {
    10 * 1024 * 1024
}

fn default_admin_user() -> String {
    "admin".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Resolved layout for one project.
    pub fn project_paths(&self, project: Project) -> ProjectPaths {
        project.paths(&self.edition_base_location, &self.baking_webpages_baseurl)
    }

    /// Conversion scripts used by `xmlconversion`, taken from the Estoria checkout.
    pub fn conversion_scripts_path(&self) -> PathBuf {
        self.project_paths(Project::EstoriaDigital).scripts_path
    }
}
