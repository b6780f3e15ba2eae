//
// policy.rs
// Dicom-Deid-rs
//
// Resolves the configured tag rules against the standard DICOM dictionary into a scrub policy.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom::core::dictionary::DataDictionary;
use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;

use crate::config::{Config, RuleAction, RuleSpec};
use crate::error::{DeidError, Result};

pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRule {
    Remove,
    Replace(String),
    /// Replace the value with a truncated SHA-256 of itself
    Hash,
}

/// What the editor does to every image. Opaque to the traversal core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubPolicy {
    rules: Vec<(Tag, TagRule)>,
    remove_private_tags: bool,
    folder_tags: Vec<Tag>,
}

impl Default for ScrubPolicy {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            remove_private_tags: false,
            folder_tags: vec![PATIENT_ID],
        }
    }
}

impl ScrubPolicy {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.modifications.len());
        for (key, spec) in &config.modifications {
            let tag = resolve_tag(key)?;
            let rule = match spec {
                None => TagRule::Remove,
                Some(RuleSpec::Value(value)) => TagRule::Replace(value.clone()),
                Some(RuleSpec::Action { action }) => match action {
                    RuleAction::Remove => TagRule::Remove,
                    RuleAction::Empty => TagRule::Replace(String::new()),
                    RuleAction::Hash => TagRule::Hash,
                },
            };
            rules.push((tag, rule));
        }

        if config.folder_tags.is_empty() {
            return Err(DeidError::Config("folder_tags must not be empty".into()));
        }
        let folder_tags = config
            .folder_tags
            .iter()
            .map(|k| resolve_tag(k))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            remove_private_tags: config.remove_private_tags,
            folder_tags,
        })
    }

    pub fn rules(&self) -> &[(Tag, TagRule)] {
        &self.rules
    }

    pub fn remove_private_tags(&self) -> bool {
        self.remove_private_tags
    }

    pub fn folder_tags(&self) -> &[Tag] {
        &self.folder_tags
    }
}

/// Accepts a dictionary keyword ("PatientName") or a tag literal ("(0010,0010)" / "0010,0010").
fn resolve_tag(key: &str) -> Result<Tag> {
    StandardDataDictionary::default()
        .parse_tag(key.trim())
        .ok_or_else(|| DeidError::Config(format!("unknown DICOM attribute '{key}'")))
}
