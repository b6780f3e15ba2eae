//
// models.rs
// Dicom-Deid-rs
//
// Plain data structures describing item outcomes and run totals.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

/// Transient result of processing one input item; logged and counted, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Saved { destination: PathBuf },
    UnknownSubject { source_id: String },
    Failed { reason: String },
}

/// Input whose subject id had no entry in the identifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubject {
    pub path: PathBuf,
    pub source_id: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Regular files handed to the item processor
    pub visited: usize,
    pub saved: usize,
    pub failed: usize,
    pub unknown: usize,
    pub mounted: usize,
}

impl RunSummary {
    pub fn count(&mut self, outcome: &ItemOutcome) {
        self.visited += 1;
        match outcome {
            ItemOutcome::Saved { .. } => self.saved += 1,
            ItemOutcome::UnknownSubject { .. } => self.unknown += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }
}
