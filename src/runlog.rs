//
// runlog.rs
// Dicom-Deid-rs
//
// Per-output-directory log file. Every record is also emitted as a tracing event so the console
// verbosity follows the subscriber installed by the CLI.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::{DeidError, Result};

pub const LOG_FILE_NAME: &str = "log.txt";

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Open (append) `<dir>/log.txt`.
    pub fn create_in(dir: &Path) -> Result<Self> {
        Self::open(&dir.join(LOG_FILE_NAME))
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DeidError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Progress message.
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{message}");
        self.append(message);
    }

    /// Low-level trace such as "visiting <path>".
    pub fn trace(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!("{message}");
        self.append(message);
    }

    /// Failure or skipped item; shown on the console even without `--log`.
    pub fn failure(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{message}");
        self.append(message);
    }

    fn append(&self, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        // &File implements Write, so the sink can be shared immutably
        if let Err(e) = writeln!(&self.file, "{stamp} {message}") {
            warn!("could not write to {}: {}", self.path.display(), e);
        }
    }
}
