//
// lib.rs
// Dicom-Deid-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Traversal core: identifier mapping, output placement, walking, per-item processing, archival.
pub mod archive;
pub mod identifiers;
pub mod process;
pub mod run;
pub mod storage;
pub mod traverse;

// Collaborators: DICOM editor, disc-image mounting, logging, configuration, errors.
pub mod anonymize;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod editor;
pub mod error;
pub mod json;
pub mod models;
pub mod mount;
pub mod policy;
pub mod runlog;

#[cfg(test)]
mod testing;

pub use cli::{run as run_cli, Cli, Commands};
pub use error::{DeidError, Result};
