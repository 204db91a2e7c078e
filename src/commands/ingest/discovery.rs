use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::model::AnnotationFile;

/// Recursively collects every `.json` file under `root`, sorted by path.
pub fn discover_annotation_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("dataset directory does not exist: {}", root.display());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_json = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    Ok(paths)
}

pub fn load_annotation_file(path: &Path) -> Result<AnnotationFile> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
