use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use uuid::Uuid;

/// State of a job as observed by pollers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Started,
    Success,
    Failure,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

/// Which task implementation a job runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    #[strum(to_string = "xmlconversion")]
    #[serde(rename = "xmlconversion")]
    XmlConversion,
    EstoriaXml,
    ReaderXml,
    TranslationXml,
    CpsfCriticalXml,
    CriticalEditionFirst,
    BakeChapters,
}

/// A job kind together with its ordered arguments.
///
/// Paths are resolved at the request boundary, so a worker never needs to
/// know which project a job belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum JobSpec {
    #[serde(rename = "xmlconversion")]
    XmlConversion {
        xml_filename: String,
        tempdir: PathBuf,
    },
    EstoriaXml {
        data_path: PathBuf,
        scripts_path: PathBuf,
    },
    ReaderXml {
        data_path: PathBuf,
        scripts_path: PathBuf,
    },
    TranslationXml {
        data_path: PathBuf,
        scripts_path: PathBuf,
    },
    CpsfCriticalXml {
        data_path: PathBuf,
        scripts_path: PathBuf,
    },
    CriticalEditionFirst {
        data_path: PathBuf,
        scripts_path: PathBuf,
    },
    BakeChapters {
        start: u32,
        stop: u32,
        base_url: String,
        data_path: PathBuf,
    },
}

impl JobSpec {
    pub fn kind(&self) -> TaskKind {
        match self {
            JobSpec::XmlConversion { .. } => TaskKind::XmlConversion,
            JobSpec::EstoriaXml { .. } => TaskKind::EstoriaXml,
            JobSpec::ReaderXml { .. } => TaskKind::ReaderXml,
            JobSpec::TranslationXml { .. } => TaskKind::TranslationXml,
            JobSpec::CpsfCriticalXml { .. } => TaskKind::CpsfCriticalXml,
            JobSpec::CriticalEditionFirst { .. } => TaskKind::CriticalEditionFirst,
            JobSpec::BakeChapters { .. } => TaskKind::BakeChapters,
        }
    }

    /// Build one of the "run scripts against a data path" jobs.
    pub fn script_job(kind: TaskKind, data_path: PathBuf, scripts_path: PathBuf) -> Option<Self> {
        let spec = match kind {
            TaskKind::EstoriaXml => JobSpec::EstoriaXml { data_path, scripts_path },
            TaskKind::ReaderXml => JobSpec::ReaderXml { data_path, scripts_path },
            TaskKind::TranslationXml => JobSpec::TranslationXml { data_path, scripts_path },
            TaskKind::CpsfCriticalXml => JobSpec::CpsfCriticalXml { data_path, scripts_path },
            TaskKind::CriticalEditionFirst => {
                JobSpec::CriticalEditionFirst { data_path, scripts_path }
            }
            TaskKind::XmlConversion | TaskKind::BakeChapters => return None,
        };
        Some(spec)
    }
}

/// The job record owned by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: TaskKind,
    pub state: JobState,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn pending(id: Uuid, kind: TaskKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            state: JobState::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            result: self.result.clone(),
            state: self.state,
        }
    }
}

/// What a poller sees: `{"result": ..., "state": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSnapshot {
    pub result: Option<serde_json::Value>,
    pub state: JobState,
}

impl JobSnapshot {
    /// Snapshot for ids that were never issued or have expired.
    pub fn unknown() -> Self {
        Self {
            result: None,
            state: JobState::Pending,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Some(serde_json::Value::String(message.into())),
            state: JobState::Failure,
        }
    }

    /// The result as a non-empty string, if it is one.
    pub fn result_str(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// How a finished task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success(Option<serde_json::Value>),
    Failure(String),
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Success(_) => JobState::Success,
            JobOutcome::Failure(_) => JobState::Failure,
        }
    }

    pub fn into_result(self) -> Option<serde_json::Value> {
        match self {
            JobOutcome::Success(value) => value,
            JobOutcome::Failure(message) => Some(serde_json::Value::String(message)),
        }
    }
}
