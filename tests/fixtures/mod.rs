//! Documents and project layouts used by the router tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use edition_admin::config::AppConfig;
use edition_admin::models::project::{Project, ProjectPaths};

pub const VALID_TEI: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><pb n="1r"/><p>Estoria</p></body></text></TEI>
"#;

pub const BROKEN_TEI: &[u8] = b"<TEI><text><body></text></TEI>";

pub fn paths(config: &AppConfig, project: Project) -> ProjectPaths {
    config.project_paths(project)
}

/// Write a collation index whose chapters run from 1 to `maximum`.
pub fn write_collation(paths: &ProjectPaths, maximum: u32) -> PathBuf {
    let entries: Vec<String> = (1..=maximum).map(|n| format!("\"{n}\": {{}}")).collect();
    let index = &paths.collation_index;
    fs::create_dir_all(index.parent().expect("index has a parent")).expect("create apparatus dir");
    fs::write(index, format!("{{{}}}", entries.join(", "))).expect("write collation index");
    index.clone()
}

/// Put an `sh` stand-in for a converter script in place.
pub fn write_script(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).expect("create scripts dir");
    fs::write(dir.join(name), body).expect("write script");
}
