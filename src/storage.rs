//
// storage.rs
// Dicom-Deid-rs
//
// Output placement: lazy directory creation, the registry of output folders touched by a run, and
// staged writes that never leave a truncated file behind.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeidError, Result};

/// Create `path` and any missing ancestors. Returns `true` when the directory was created.
pub fn ensure_directory(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path).map_err(|e| DeidError::io(path, e))?;
    Ok(true)
}

/// Distinct output folders produced during one run, keyed by absolute path.
#[derive(Debug, Default, Clone)]
pub struct OutputRegistry {
    folders: BTreeSet<PathBuf>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a folder is seen.
    pub fn register(&mut self, folder: &Path) -> bool {
        let absolute = std::path::absolute(folder).unwrap_or_else(|_| folder.to_path_buf());
        self.folders.insert(absolute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.folders.iter()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// Hidden sibling used while `target` is being written.
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.partial"))
}

/// Write through a staging file and rename into place; the staging file is removed on failure.
pub fn write_staged<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let staged = staging_path(target);
    if let Err(err) = write(&staged) {
        let _ = fs::remove_file(&staged);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staged, target) {
        let _ = fs::remove_file(&staged);
        return Err(DeidError::io(target, err));
    }
    Ok(())
}

/// Keep only characters that are safe in a single path component.
pub fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    // "." and ".." would still walk out of the output root
    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned
    }
}
