//! Rebuild jobs that only run converter scripts against a data directory.

use std::path::Path;

use crate::models::job::TaskKind;
use crate::services::process::{ProcessError, ScriptRunner};

const ESTORIA_XML: &[&str] = &[
    "make_paginated_json.py",
    "add_html_to_paginated_json.py",
    "make_chapter_index_json.py",
];
const READER_XML: &[&str] = &["make_reader.py"];
const TRANSLATION_XML: &[&str] = &["make_translation.py"];
const CPSF_CRITICAL_XML: &[&str] = &[
    "make_critical_chapter_verse_json.py",
    "make_critical_index_json.py",
];
const CRITICAL_EDITION_FIRST: &[&str] = &[
    "make_critical_chapter_verse_json.py",
    "make_apparatus_index_page.py",
];

/// Scripts a rebuild kind runs, in order. Empty for kinds that are not script jobs.
pub fn sequence(kind: TaskKind) -> &'static [&'static str] {
    match kind {
        TaskKind::EstoriaXml => ESTORIA_XML,
        TaskKind::ReaderXml => READER_XML,
        TaskKind::TranslationXml => TRANSLATION_XML,
        TaskKind::CpsfCriticalXml => CPSF_CRITICAL_XML,
        TaskKind::CriticalEditionFirst => CRITICAL_EDITION_FIRST,
        TaskKind::XmlConversion | TaskKind::BakeChapters => &[],
    }
}

/// Run each script with `-d <data_path>` in `scripts_path`, stopping at the first failure.
pub async fn run_sequence(
    runner: &ScriptRunner,
    scripts: &[&str],
    data_path: &Path,
    scripts_path: &Path,
) -> Result<(), ProcessError> {
    for script in scripts {
        tracing::debug!("run {script}");
        runner
            .run_with_data_path(script, data_path, scripts_path)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Stand-in converter that appends its own name to `<data>/log`.
    fn logging_script(dir: &Path, name: &str) {
        fs::write(dir.join(name), format!("echo {name} >> \"$2/log\"\n")).unwrap();
    }

    #[test]
    fn test_sequences() {
        assert_eq!(sequence(TaskKind::EstoriaXml).len(), 3);
        assert_eq!(sequence(TaskKind::ReaderXml), ["make_reader.py"]);
        assert_eq!(
            sequence(TaskKind::CriticalEditionFirst)[1],
            "make_apparatus_index_page.py"
        );
        assert!(sequence(TaskKind::BakeChapters).is_empty());
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let scripts = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        for name in ESTORIA_XML {
            logging_script(scripts.path(), name);
        }

        run_sequence(&ScriptRunner::new("sh"), ESTORIA_XML, data.path(), scripts.path())
            .await
            .unwrap();

        let log = fs::read_to_string(data.path().join("log")).unwrap();
        let ran: Vec<&str> = log.lines().collect();
        assert_eq!(ran, ESTORIA_XML);
    }

    #[tokio::test]
    async fn test_first_failure_stops_sequence() {
        let scripts = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(
            scripts.path().join("make_critical_chapter_verse_json.py"),
            "echo no collation >&2\nexit 1\n",
        )
        .unwrap();
        logging_script(scripts.path(), "make_apparatus_index_page.py");

        let err = run_sequence(
            &ScriptRunner::new("sh"),
            CRITICAL_EDITION_FIRST,
            data.path(),
            scripts.path(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("no collation"));
        assert!(!data.path().join("log").exists());
    }
}
