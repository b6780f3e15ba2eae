//
// config.rs
// Dicom-Deid-rs
//
// Loads the YAML run configuration: scrub rules, identifier table, io pairs and archive destination.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{DeidError, Result};

pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// One entry of `io_pairs`: what to clean and where to put it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IoPair {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Explicit rule form, e.g. `PatientBirthDate: {action: remove}`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Remove,
    Empty,
    Hash,
}

/// Right-hand side of a `modifications` entry. A bare string is a replacement value;
/// `null` (handled one level up) removes the element.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RuleSpec {
    Value(String),
    Action { action: RuleAction },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MountSettings {
    #[serde(default)]
    pub sudo: bool,
}

/// Immutable policy object read once per run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modifications: BTreeMap<String, Option<RuleSpec>>,
    #[serde(default)]
    pub remove_private_tags: bool,
    #[serde(default = "default_folder_tags")]
    pub folder_tags: Vec<String>,
    #[serde(rename = "new_IDs", alias = "id_table", default)]
    pub id_table: Option<PathBuf>,
    #[serde(rename = "zip", alias = "archive_dir", default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default)]
    pub in_data_root: Option<PathBuf>,
    #[serde(default)]
    pub out_data_root: Option<PathBuf>,
    #[serde(default)]
    pub io_pairs: Vec<IoPair>,
    #[serde(default)]
    pub mount: MountSettings,
}

fn default_folder_tags() -> Vec<String> {
    vec!["PatientID".to_string()]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            DeidError::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        serde_yaml::from_reader(file)
            .map_err(|e| DeidError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| DeidError::Config(e.to_string()))
    }

    /// Input/output pairs for config mode, joined onto the data roots when present.
    pub fn resolved_pairs(&self) -> Result<Vec<IoPair>> {
        if self.io_pairs.is_empty() {
            return Err(DeidError::Config(
                "config mode requires at least one entry in io_pairs".into(),
            ));
        }

        let join = |root: &Option<PathBuf>, leaf: &Path| match root {
            Some(root) => root.join(leaf),
            None => leaf.to_path_buf(),
        };

        Ok(self
            .io_pairs
            .iter()
            .map(|pair| IoPair {
                input: join(&self.in_data_root, &pair.input),
                output: join(&self.out_data_root, &pair.output),
            })
            .collect())
    }
}

/// Search `start` recursively for the first `config.yaml` (lexicographic walk order).
pub fn find_config(start: &Path) -> Result<PathBuf> {
    WalkDir::new(start)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == CONFIG_FILE_NAME)
        .map(|e| e.into_path())
        .ok_or_else(|| {
            DeidError::Config(format!(
                "no {} found under {}",
                CONFIG_FILE_NAME,
                start.display()
            ))
        })
}
