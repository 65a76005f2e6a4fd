//! Directory copy and zip helpers for the conversion pipeline.
//!
//! These are blocking and are meant to be called from `spawn_blocking`.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Recursively copy `src` to `dst`. `dst` must not exist yet.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", dst.display()),
        ));
    }
    copy_tree(src, dst)
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Write every file and directory below `root` into a zip at `archive`.
/// Entry names are relative to `root` and use `/` separators.
pub fn zip_dir(root: &Path, archive: &Path) -> Result<(), ArchiveError> {
    let file = File::create(archive)?;
    let mut zip = ZipWriter::new(file);

    add_tree(&mut zip, root, "")?;
    zip.finish()?;
    Ok(())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn add_tree(zip: &mut ZipWriter<File>, dir: &Path, prefix: &str) -> Result<(), ArchiveError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
        if entry.file_type()?.is_dir() {
            zip.add_directory(format!("{name}/"), entry_options())?;
            add_tree(zip, &entry.path(), &format!("{name}/"))?;
        } else {
            zip.start_file(name, entry_options())?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, zip)?;
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error while archiving: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("static/deps/fonts")).unwrap();
        fs::write(root.join("index.html"), "<html></html>").unwrap();
        fs::write(root.join("static/deps/fonts/a.woff"), "font").unwrap();
    }

    #[test]
    fn test_copy_dir_all() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        sample_tree(&src);

        let dst = dir.path().join("dst");
        copy_dir_all(&src, &dst).unwrap();
        assert_eq!(
            fs::read_to_string(dst.join("static/deps/fonts/a.woff")).unwrap(),
            "font"
        );
        assert!(copy_dir_all(&src, &dst).is_err());
    }

    #[test]
    fn test_zip_dir_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        sample_tree(&root);

        let archive = dir.path().join("out.zip");
        zip_dir(&root, &archive).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut html = String::new();
        zip.by_name("index.html")
            .unwrap()
            .read_to_string(&mut html)
            .unwrap();
        assert_eq!(html, "<html></html>");
        assert!(zip.by_name("static/deps/fonts/a.woff").is_ok());
    }
}
