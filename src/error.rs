//
// error.rs
// Dicom-Deid-rs
//
// Error taxonomy shared by the traversal core, the DICOM editor and the run driver.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can go wrong during a de-identification run.
///
/// Only `Config` (and `Io` while preparing a top-level output directory) abort a
/// run; the other variants are caught at the per-item boundary and logged.
#[derive(Error, Debug)]
pub enum DeidError {
    /// Missing or malformed configuration, scrub policy or identifier table
    #[error("configuration error: {0}")]
    Config(String),

    /// Input is not a valid DICOM instance (or lacks the attributes we need)
    #[error("{}: not a usable DICOM file: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    /// Unreadable input, failed directory creation, failed move
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Disc image could not be mounted or unmounted
    #[error("mount operation on {} failed: {reason}", .path.display())]
    Mount { path: PathBuf, reason: String },

    /// Output folder could not be compressed
    #[error("failed to archive {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },
}

impl DeidError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        DeidError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn format(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        DeidError::Format {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn mount(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        DeidError::Mount {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn archive(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        DeidError::Archive {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeidError::Config(_))
    }
}

pub type Result<T, E = DeidError> = std::result::Result<T, E>;
