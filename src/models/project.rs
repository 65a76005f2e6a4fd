use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

use super::job::TaskKind;

/// Edition projects this tool administers.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, EnumIter, PartialEq, Eq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Project {
    EstoriaDigital,
    CpsfDigital,
}

/// Administration pages under `/estoria-admin/{project}/`.
#[derive(Debug, Clone, Copy, Display, EnumString, EnumIter, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum AdminPage {
    Transcriptions,
    ReaderXml,
    Translation,
    Critical,
    Baking,
}

impl AdminPage {
    /// Heading shown on the page and on its job status view.
    pub fn title(self) -> &'static str {
        match self {
            AdminPage::Transcriptions => "Transcriptions",
            AdminPage::ReaderXml => "ReaderXML",
            AdminPage::Translation => "Translation",
            AdminPage::Critical => "Critical Edition",
            AdminPage::Baking => "Baking",
        }
    }

    pub fn job_title(self) -> &'static str {
        match self {
            AdminPage::Baking => "Baking Chapters",
            other => other.title(),
        }
    }
}

/// Filesystem layout of one project checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub scripts_path: PathBuf,
    pub data_path: PathBuf,
    pub collation_index: PathBuf,
    pub baking_url: String,
}

impl ProjectPaths {
    /// Directory that receives uploads made from `page`, if the page takes uploads.
    pub fn upload_dir(&self, page: AdminPage) -> Option<PathBuf> {
        let sub = match page {
            AdminPage::Transcriptions => "manuscripts",
            AdminPage::ReaderXml => "readerXML",
            AdminPage::Translation => "translation",
            AdminPage::Critical | AdminPage::Baking => return None,
        };
        Some(self.root.join("transcriptions").join(sub))
    }
}

impl Project {
    pub fn slug(self) -> String {
        self.to_string()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Project::EstoriaDigital => "Estoria de Espanna Digital",
            Project::CpsfDigital => "CPSF Digital",
        }
    }

    /// Resolve this project's paths beneath the shared base location.
    pub fn paths(self, base_location: &Path, baking_base_url: &str) -> ProjectPaths {
        let root = base_location.join(self.slug());
        ProjectPaths {
            scripts_path: root.join("edition").join("src").join("assets").join("scripts"),
            data_path: root.join("edition").join("static").join("data"),
            collation_index: root.join("edition").join("apparatus").join("collations.json"),
            baking_url: format!("{}/{}/", baking_base_url.trim_end_matches('/'), self.slug()),
            root,
        }
    }

    /// The rebuild task a page triggers for this project, `None` when the
    /// project does not offer the page.
    pub fn task_for(self, page: AdminPage) -> Option<TaskKind> {
        use AdminPage::*;
        match (self, page) {
            (_, Transcriptions) => Some(TaskKind::EstoriaXml),
            (Project::EstoriaDigital, ReaderXml) => Some(TaskKind::ReaderXml),
            (Project::EstoriaDigital, Critical) => Some(TaskKind::CriticalEditionFirst),
            (Project::EstoriaDigital, Baking) => Some(TaskKind::BakeChapters),
            (Project::CpsfDigital, Translation) => Some(TaskKind::TranslationXml),
            (Project::CpsfDigital, Critical) => Some(TaskKind::CpsfCriticalXml),
            _ => None,
        }
    }

    pub fn supports(self, page: AdminPage) -> bool {
        self.task_for(page).is_some()
    }
}
