//! Runs the external conversion scripts.
//!
//! Every script is invoked as `<interpreter> <script> [args...]` inside a
//! working directory, with stdout and stderr captured. Exit status 0 is the
//! only success signal.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

/// Maximum stderr kept for a failure report.
const MAX_STDERR_CHARS: usize = 4096;

/// How to invoke the conversion scripts.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
}

impl ScriptRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Run `script -d <data_path>` in `cwd`.
    pub async fn run_with_data_path(
        &self,
        script: &str,
        data_path: &Path,
        cwd: &Path,
    ) -> Result<(), ProcessError> {
        let args = [PathBuf::from("-d"), data_path.to_path_buf()];
        self.run(script, &args, cwd).await
    }

    pub async fn run(
        &self,
        script: &str,
        args: &[PathBuf],
        cwd: &Path,
    ) -> Result<(), ProcessError> {
        let start = Instant::now();
        let output = Command::new(&self.interpreter)
            .arg(script)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                script: script.to_string(),
                source,
            })?;

        tracing::debug!(
            script,
            duration_ms = start.elapsed().as_millis() as u64,
            status = ?output.status.code(),
            "Script finished"
        );

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };

        Err(ProcessError::Failed {
            script: script.to_string(),
            exit_code: output.status.code(),
            stderr: truncate(stderr.trim(), MAX_STDERR_CHARS),
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn status_label(exit_code: &Option<i32>) -> String {
    exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Could not start {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{script} exited with status {}: {stderr}", status_label(.exit_code))]
    Failed {
        script: String,
        /// `None` when the process was killed by a signal.
        exit_code: Option<i32>,
        stderr: String,
    },
}
