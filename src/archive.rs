//
// archive.rs
// Dicom-Deid-rs
//
// Compresses every output folder touched by a run into one zip archive and moves the archives to
// the configured destination. Folders are independent: one failure does not stop the others.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{DeidError, Result};
use crate::runlog::RunLog;
use crate::storage::{ensure_directory, write_staged, OutputRegistry};

/// What happened to each registered folder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Final archive locations
    pub archived: Vec<PathBuf>,
    /// Folder and error message
    pub failed: Vec<(PathBuf, String)>,
}

pub fn archive_and_relocate(
    folders: &OutputRegistry,
    destination: &Path,
    log: &RunLog,
) -> ArchiveReport {
    let mut report = ArchiveReport::default();
    let mut claimed = HashSet::new();

    for folder in folders.iter() {
        match archive_folder(folder, destination, log, &mut claimed) {
            Ok(path) => report.archived.push(path),
            Err(e) => {
                log.failure(format!("{} failed to archive\n{}", folder.display(), e));
                report.failed.push((folder.clone(), e.to_string()));
            }
        }
    }

    report
}

fn archive_folder(
    folder: &Path,
    destination: &Path,
    log: &RunLog,
    claimed: &mut HashSet<PathBuf>,
) -> Result<PathBuf> {
    let archive = compress_folder(folder)?;
    log.record(format!("{} archived", folder.display()));

    ensure_directory(destination)?;
    let target = claim_target(&archive, destination, claimed)?;
    let moved = relocate(&archive, &target)?;
    log.record(format!("{} moved to {}", archive.display(), moved.display()));
    Ok(moved)
}

/// First name among `<stem>.zip`, `<stem>-2.zip`, ... not yet taken by this run. Folders
/// from different output roots can share a leaf name.
fn claim_target(
    archive: &Path,
    destination: &Path,
    claimed: &mut HashSet<PathBuf>,
) -> Result<PathBuf> {
    let stem = archive
        .file_stem()
        .ok_or_else(|| DeidError::archive(archive, "archive has no name"))?
        .to_string_lossy()
        .into_owned();
    let mut target = destination.join(format!("{stem}.zip"));
    let mut suffix = 2;
    while !claimed.insert(target.clone()) {
        target = destination.join(format!("{stem}-{suffix}.zip"));
        suffix += 1;
    }
    Ok(target)
}

/// Zip the contents of `folder` into `<folder>.zip` next to it. Entry names are relative
/// to the folder.
pub fn compress_folder(folder: &Path) -> Result<PathBuf> {
    if !folder.is_dir() {
        return Err(DeidError::archive(folder, "not a directory"));
    }
    let name = folder
        .file_name()
        .ok_or_else(|| DeidError::archive(folder, "folder has no name"))?;
    let archive = folder.with_file_name(format!("{}.zip", name.to_string_lossy()));

    write_staged(&archive, |staged| write_zip(folder, staged))?;
    Ok(archive)
}

fn write_zip(folder: &Path, target: &Path) -> Result<()> {
    let file = File::create(target).map_err(|e| DeidError::io(target, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let zip_err = |e: zip::result::ZipError| DeidError::archive(folder, e);

    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| DeidError::archive(folder, e))?;
        let relative = entry
            .path()
            .strip_prefix(folder)
            .map_err(|e| DeidError::archive(entry.path(), e))?;
        // zip entry names always use '/'
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(zip_err)?;
        } else {
            zip.start_file(name, options).map_err(zip_err)?;
            let mut source = File::open(entry.path()).map_err(|e| DeidError::io(entry.path(), e))?;
            io::copy(&mut source, &mut zip).map_err(|e| DeidError::io(entry.path(), e))?;
        }
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Move `archive` to `target`, replacing a file left there by an earlier run.
pub fn relocate(archive: &Path, target: &Path) -> Result<PathBuf> {
    if target == archive {
        return Ok(target.to_path_buf());
    }

    if fs::rename(archive, target).is_err() {
        // rename cannot cross filesystems; copy then delete
        fs::copy(archive, target).map_err(|e| DeidError::io(target, e))?;
        fs::remove_file(archive).map_err(|e| DeidError::io(archive, e))?;
    }
    Ok(target.to_path_buf())
}
