//! Snapshots rendered chapter pages into static HTML files.

use std::path::Path;

use super::TaskError;
use crate::services::browser::BrowserLauncher;

/// Class of the element whose inner HTML is saved.
const CONTAINER_CLASS: &str = "container";

pub fn chapter_url(base_url: &str, chapter: u32) -> String {
    format!("{base_url}chapter/?chapter={chapter}")
}

/// Render chapters `start..=stop` and write each to `<data_path>/critical/<n>.html`.
///
/// One browser session serves the whole range. The session is left to the
/// WebDriver server's own timeout when the job ends.
pub async fn bake_chapters(
    launcher: &dyn BrowserLauncher,
    start: u32,
    stop: u32,
    base_url: &str,
    data_path: &Path,
) -> Result<(), TaskError> {
    let critical = data_path.join("critical");
    tokio::fs::create_dir_all(&critical).await?;

    tracing::debug!(start, stop, "launch browser");
    let mut session = launcher.launch().await?;

    for chapter in start..=stop {
        let url = chapter_url(base_url, chapter);
        tracing::debug!(chapter, url = %url, "bake chapter");
        session.navigate(&url).await?;
        let html = session.inner_html_by_class(CONTAINER_CLASS).await?;
        tokio::fs::write(critical.join(format!("{chapter}.html")), html).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::browser::BrowserError;
    use crate::tasks::testing::FakeLauncher;
    use std::fs;

    const BASE: &str = "http://apparatus/estoria-digital/";

    #[test]
    fn test_chapter_url() {
        assert_eq!(
            chapter_url(BASE, 12),
            "http://apparatus/estoria-digital/chapter/?chapter=12"
        );
    }

    #[tokio::test]
    async fn test_single_chapter_writes_one_file() {
        let data = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::default().page(&chapter_url(BASE, 101), "<p>ch 101</p>");

        bake_chapters(&launcher, 101, 101, BASE, data.path())
            .await
            .unwrap();

        let files: Vec<_> = fs::read_dir(data.path().join("critical"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, ["101.html"]);
        assert_eq!(
            fs::read_to_string(data.path().join("critical/101.html")).unwrap(),
            "<p>ch 101</p>"
        );
    }

    #[tokio::test]
    async fn test_existing_critical_dir_is_fine() {
        let data = tempfile::tempdir().unwrap();
        fs::create_dir_all(data.path().join("critical")).unwrap();
        fs::write(data.path().join("critical/9.html"), "stale").unwrap();
        let launcher = FakeLauncher::default()
            .page(&chapter_url(BASE, 9), "nine")
            .page(&chapter_url(BASE, 10), "ten");

        bake_chapters(&launcher, 9, 10, BASE, data.path())
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(data.path().join("critical/9.html")).unwrap(), "nine");
        assert_eq!(fs::read_to_string(data.path().join("critical/10.html")).unwrap(), "ten");
        assert_eq!(launcher.launches(), 1);
        assert_eq!(
            launcher.visited(),
            [chapter_url(BASE, 9), chapter_url(BASE, 10)]
        );
    }

    #[tokio::test]
    async fn test_missing_container_aborts_and_keeps_earlier_files() {
        let data = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::default()
            .page(&chapter_url(BASE, 1), "one")
            .page(&chapter_url(BASE, 3), "three");

        let err = bake_chapters(&launcher, 1, 3, BASE, data.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TaskError::Browser(BrowserError::ElementNotFound(_))
        ));
        assert!(data.path().join("critical/1.html").exists());
        assert!(!data.path().join("critical/2.html").exists());
        assert!(!data.path().join("critical/3.html").exists());
    }
}
