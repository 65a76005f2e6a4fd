//! Turns one uploaded transcription into a self-contained HTML bundle.
//!
//! The job owns a freshly created working directory holding the upload. The
//! converters run inside a miniature edition checkout built there, the
//! rendered pages are stitched into the resources' `index.html` and the
//! `output/` tree is zipped into the output location. The working directory
//! is removed however the job ends.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use super::{TaskContext, TaskError};
use crate::services::archive;

const CONVERTERS: [&str; 2] = ["make_paginated_json.py", "add_html_to_paginated_json.py"];
const MENU_PREFIX: &str = "MENU_DATA = ";

/// Owns the working directory. [`WorkDir::remove`] deletes it off the async
/// threads; if the job is dropped first (panic or cancellation) `Drop`
/// hands the removal to the blocking pool instead.
struct WorkDir(Option<PathBuf>);

impl WorkDir {
    async fn remove(mut self) {
        let Some(path) = self.0.take() else { return };
        tracing::debug!(path = %path.display(), "delete working directory");
        if let Err(e) = tokio::fs::remove_dir_all(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove working directory");
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let Some(path) = self.0.take() else { return };
        let remove = move || {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove working directory");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

/// Layout of the miniature checkout inside the working directory.
struct Layout {
    manuscripts: PathBuf,
    data: PathBuf,
    scripts: PathBuf,
    output: PathBuf,
}

impl Layout {
    fn new(root: &Path) -> Self {
        Self {
            manuscripts: root.join("transcriptions").join("manuscripts"),
            data: root.join("edition").join("static").join("data"),
            scripts: root.join("edition").join("src").join("assets").join("scripts"),
            output: root.join("output"),
        }
    }
}

/// One rendered page as written by the converters.
#[derive(Debug, Deserialize)]
struct PageFragment {
    name: String,
    html: String,
    html_abbrev: String,
}

/// Run the conversion for `xml_filename`, which sits directly inside `workdir`.
///
/// Returns the bare name of the archive written to the output location.
pub async fn convert(
    ctx: &TaskContext,
    xml_filename: &str,
    workdir: &Path,
) -> Result<String, TaskError> {
    let guard = WorkDir(Some(workdir.to_path_buf()));
    tracing::debug!(workdir = %workdir.display(), "working directory");
    let result = build_bundle(ctx, xml_filename, workdir).await;
    guard.remove().await;
    result
}

async fn build_bundle(
    ctx: &TaskContext,
    xml_filename: &str,
    workdir: &Path,
) -> Result<String, TaskError> {

    let sigla = sigla(xml_filename)?;
    let layout = Layout::new(workdir);

    tracing::debug!("create directory structure");
    for dir in [
        &layout.manuscripts,
        &layout.data,
        &layout.scripts,
        &layout.output.join("static"),
    ] {
        tokio::fs::create_dir_all(dir).await?;
    }

    tracing::debug!("add XML");
    tokio::fs::rename(
        workdir.join(xml_filename),
        layout.manuscripts.join(xml_filename),
    )
    .await?;

    tracing::debug!("copy over scripts");
    for script in CONVERTERS {
        tokio::fs::copy(
            ctx.conversion_scripts_path.join(script),
            layout.scripts.join(script),
        )
        .await?;
    }

    for script in CONVERTERS {
        tracing::debug!("run {script}");
        ctx.runner
            .run_with_data_path(script, &layout.data, &layout.scripts)
            .await?;
    }

    tracing::debug!("copy transcription JSON to output");
    let json_dir = layout.output.join("json");
    copy_tree(
        layout.data.join("transcription").join(&sigla),
        json_dir.clone(),
    )
    .await?;

    tracing::debug!("copy static resources to output");
    let static_dir = layout.output.join("static");
    copy_tree(
        ctx.resources_location.join("deps"),
        static_dir.join("deps"),
    )
    .await?;
    for asset in ["estoria.js", "estoria.css"] {
        tokio::fs::copy(ctx.resources_location.join(asset), static_dir.join(asset)).await?;
    }

    tracing::debug!("build html from generated json files");
    let menu_path = layout.data.join("menu_data.js");
    let pages = menu_pages(&tokio::fs::read_to_string(&menu_path).await?, &sigla)
        .map_err(|e| match e {
            MenuError::Json(source) => TaskError::Json {
                path: menu_path.clone(),
                source,
            },
            MenuError::Missing => TaskError::MissingMenuEntry(sigla.clone()),
        })?;

    let mut fragments = Vec::with_capacity(pages.len());
    for page in &pages {
        let path = json_dir.join(format!("{page}.json"));
        let text = tokio::fs::read_to_string(&path).await?;
        let fragment: PageFragment =
            serde_json::from_str(&text).map_err(|source| TaskError::Json { path, source })?;
        fragments.push(fragment);
    }

    let template = tokio::fs::read_to_string(ctx.resources_location.join("index.html")).await?;
    tokio::fs::write(
        layout.output.join("index.html"),
        build_index_html(&template, &sigla, &fragments),
    )
    .await?;

    tracing::debug!("zip up the result");
    let zip_name = format!("{}.zip", archive_stem(&ctx.temp_root, workdir));
    let archive_path = ctx.output_location.join(&zip_name);
    let output = layout.output.clone();
    tokio::task::spawn_blocking(move || archive::zip_dir(&output, &archive_path)).await??;

    tracing::debug!(zip_name = %zip_name, "archive written");
    Ok(zip_name)
}

async fn copy_tree(src: PathBuf, dst: PathBuf) -> Result<(), TaskError> {
    tokio::task::spawn_blocking(move || archive::copy_dir_all(&src, &dst)).await??;
    Ok(())
}

/// Manuscript sigla: the upload's file name without its extension.
fn sigla(xml_filename: &str) -> Result<String, TaskError> {
    let path = Path::new(xml_filename);
    let single = matches!(
        path.components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(_)]
    );
    path.file_stem()
        .filter(|_| single)
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| TaskError::BadFilename(xml_filename.to_string()))
}

/// Archive name for a working directory: its path below the temp root.
fn archive_stem(temp_root: &Path, workdir: &Path) -> String {
    match workdir.strip_prefix(temp_root) {
        Ok(relative) if relative.components().count() == 1 => {
            relative.to_string_lossy().into_owned()
        }
        _ => workdir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "conversion".to_string()),
    }
}

#[derive(Debug)]
enum MenuError {
    Json(serde_json::Error),
    Missing,
}

/// Ordered page ids listed for `sigla` in a `MENU_DATA = {...}` script.
fn menu_pages(script: &str, sigla: &str) -> Result<Vec<String>, MenuError> {
    let body = script.trim().trim_start_matches(MENU_PREFIX).trim_end_matches(';');
    let menu: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(body).map_err(MenuError::Json)?;
    let pages = menu
        .get(sigla)
        .and_then(|v| v.as_array())
        .ok_or(MenuError::Missing)?;
    Ok(pages
        .iter()
        .map(|page| match page {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

fn panel(id_prefix: &str, name: &str, body: &str) -> String {
    format!(
        r#"<div class="panel-body" id="{id_prefix}-{name}"><span class="page">{name}</span>{body}</div>"#
    )
}

/// Fill the `%SGLM%`, `%ABBRVTD%` and `%EXPNDD%` placeholders of the bundle's index page.
fn build_index_html(template: &str, sigla: &str, pages: &[PageFragment]) -> String {
    let abbreviated: String = pages
        .iter()
        .map(|p| panel("abbr", &p.name, &p.html_abbrev))
        .collect();
    let expanded: String = pages
        .iter()
        .map(|p| panel("expan", &p.name, &p.html))
        .collect();

    template
        .replace("%SGLM%", sigla)
        .replace("%ABBRVTD%", &abbreviated)
        .replace("%EXPNDD%", &expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::{context, FakeLauncher};
    use std::fs;
    use std::io::Read;

    const PAGINATE: &str = r#"test -f ../../../../transcriptions/manuscripts/Q.xml || exit 4
mkdir -p "$2/transcription/Q"
printf 'MENU_DATA = {"Q": ["1r", "1v"]}' > "$2/menu_data.js"
printf '{"name": "1r", "html": "<p>x 1r</p>", "html_abbrev": "<p>a 1r</p>"}' > "$2/transcription/Q/1r.json"
printf '{"name": "1v", "html": "<p>x 1v</p>", "html_abbrev": "<p>a 1v</p>"}' > "$2/transcription/Q/1v.json"
"#;

    struct Fixture {
        _root: tempfile::TempDir,
        ctx: TaskContext,
        workdir: PathBuf,
    }

    fn fixture(add_html: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path(), FakeLauncher::default());

        fs::create_dir_all(&ctx.conversion_scripts_path).unwrap();
        fs::write(ctx.conversion_scripts_path.join(CONVERTERS[0]), PAGINATE).unwrap();
        fs::write(ctx.conversion_scripts_path.join(CONVERTERS[1]), add_html).unwrap();

        fs::create_dir_all(ctx.resources_location.join("deps")).unwrap();
        fs::write(ctx.resources_location.join("deps/jquery.js"), "jq").unwrap();
        fs::write(ctx.resources_location.join("estoria.js"), "js").unwrap();
        fs::write(ctx.resources_location.join("estoria.css"), "css").unwrap();
        fs::write(
            ctx.resources_location.join("index.html"),
            "<h1>%SGLM%</h1><div>%ABBRVTD%</div><div>%EXPNDD%</div>",
        )
        .unwrap();
        fs::create_dir_all(&ctx.output_location).unwrap();

        let workdir = ctx.temp_root.join("tmpk3j2x9");
        fs::create_dir_all(&workdir).unwrap();
        fs::write(workdir.join("Q.xml"), "<TEI/>").unwrap();

        Fixture {
            _root: root,
            ctx,
            workdir,
        }
    }

    #[tokio::test]
    async fn test_conversion_produces_zip_and_cleans_up() {
        let f = fixture("true\n");

        let zip_name = convert(&f.ctx, "Q.xml", &f.workdir).await.unwrap();
        assert_eq!(zip_name, "tmpk3j2x9.zip");
        assert!(!f.workdir.exists());

        let file = fs::File::open(f.ctx.output_location.join(&zip_name)).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut index = String::new();
        zip.by_name("index.html")
            .unwrap()
            .read_to_string(&mut index)
            .unwrap();
        assert!(index.starts_with("<h1>Q</h1>"));
        assert!(index.contains(
            r#"<div class="panel-body" id="abbr-1r"><span class="page">1r</span><p>a 1r</p></div>"#
        ));
        assert!(index.contains(r#"id="expan-1v"><span class="page">1v</span><p>x 1v</p></div>"#));
        assert!(zip.by_name("json/1r.json").is_ok());
        assert!(zip.by_name("static/deps/jquery.js").is_ok());
        assert!(zip.by_name("static/estoria.css").is_ok());
    }

    #[tokio::test]
    async fn test_failed_script_still_removes_workdir() {
        let f = fixture("echo bad markup >&2\nexit 2\n");

        let err = convert(&f.ctx, "Q.xml", &f.workdir).await.unwrap_err();
        assert!(matches!(err, TaskError::Process(_)));
        assert!(err.to_string().contains("bad markup"));
        assert!(!f.workdir.exists());
        assert_eq!(fs::read_dir(&f.ctx.output_location).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_conversion_removes_workdir() {
        let f = fixture("sleep 5\n");

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            convert(&f.ctx, "Q.xml", &f.workdir),
        )
        .await;
        assert!(cancelled.is_err());

        for _ in 0..100 {
            if !f.workdir.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!f.workdir.exists());
    }

    #[test]
    fn test_sigla() {
        assert_eq!(sigla("Q.xml").unwrap(), "Q");
        assert_eq!(sigla("ms.v2.xml").unwrap(), "ms.v2");
        assert!(sigla("../Q.xml").is_err());
        assert!(sigla("").is_err());
    }

    #[test]
    fn test_archive_stem() {
        let root = Path::new("/tmp");
        assert_eq!(archive_stem(root, Path::new("/tmp/tmpabc")), "tmpabc");
        assert_eq!(archive_stem(root, Path::new("/srv/work/tmpdef")), "tmpdef");
    }

    #[test]
    fn test_menu_pages_keeps_order() {
        let script = r#"MENU_DATA = {"Q": ["2r", "1r", 3], "Z": []}"#;
        assert_eq!(menu_pages(script, "Q").unwrap(), ["2r", "1r", "3"]);
        assert!(matches!(menu_pages(script, "X"), Err(MenuError::Missing)));
        assert!(matches!(menu_pages("MENU_DATA = [", "Q"), Err(MenuError::Json(_))));
    }

    #[test]
    fn test_build_index_html() {
        let pages = vec![PageFragment {
            name: "7v".to_string(),
            html: "full".to_string(),
            html_abbrev: "abbr".to_string(),
        }];
        let html = build_index_html("%SGLM%|%ABBRVTD%|%EXPNDD%", "Ss", &pages);
        assert_eq!(
            html,
            concat!(
                "Ss|",
                r#"<div class="panel-body" id="abbr-7v"><span class="page">7v</span>abbr</div>|"#,
                r#"<div class="panel-body" id="expan-7v"><span class="page">7v</span>full</div>"#
            )
        );
    }
}
