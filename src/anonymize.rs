use std::fs::File;
use std::path::{Path, PathBuf};

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, Tag, VR};
use dicom::object::{open_file, DefaultDicomObject};
use sha2::{Digest, Sha256};

use crate::dicom_access::ElementAccess;
use crate::editor::{sidecar_name, MetadataEditor, ScrubOutcome};
use crate::error::{DeidError, Result};
use crate::identifiers::IdentifierMap;
use crate::json;
use crate::policy::{ScrubPolicy, TagRule, PATIENT_ID};
use crate::runlog::RunLog;
use crate::storage::{sanitize_component, write_staged};

fn generate_hash(original: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)[..16].to_uppercase()
}

/// Metadata editor backed by dicom-rs file objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomEditor;

impl DicomEditor {
    pub fn new() -> Self {
        DicomEditor
    }

    fn apply_rule(obj: &mut DefaultDicomObject, tag: Tag, rule: &TagRule) {
        // Only attributes present in the source are touched
        let Some(vr) = obj.element_vr(tag) else {
            return;
        };

        let value = match rule {
            TagRule::Remove => {
                obj.remove_element(tag);
                return;
            }
            _ if vr == VR::SQ => {
                obj.remove_element(tag);
                return;
            }
            TagRule::Replace(value) => value.clone(),
            TagRule::Hash => generate_hash(&obj.element_str(tag).unwrap_or_default()),
        };
        obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
    }
}

impl MetadataEditor for DicomEditor {
    type Image = DefaultDicomObject;

    fn load(&self, path: &Path) -> Result<Self::Image> {
        // Separate "cannot read" from "not DICOM" before handing the file to the parser.
        File::open(path).map_err(|e| DeidError::io(path, e))?;
        open_file(path).map_err(|e| DeidError::format(path, e))
    }

    fn scrub(
        &self,
        image: &mut Self::Image,
        policy: &ScrubPolicy,
        ids: &IdentifierMap,
        log: &RunLog,
    ) -> Result<ScrubOutcome> {
        // 1. Resolve the subject before touching anything
        let source_id = image.element_str(PATIENT_ID).unwrap_or_default();
        let Some(new_id) = ids.resolve(&source_id) else {
            return Ok(ScrubOutcome::UnknownSubject { source_id });
        };
        let new_id = new_id.to_string();

        // 2. Configured per-tag rules
        for (tag, rule) in policy.rules() {
            Self::apply_rule(image, *tag, rule);
        }

        // 3. Private elements
        if policy.remove_private_tags() {
            let private = image.private_tags();
            for tag in &private {
                image.remove_element(*tag);
            }
            if !private.is_empty() {
                log.trace(format!("removed {} private elements", private.len()));
            }
        }

        // 4. Subject id last, so no rule can overwrite the remapped value
        image.put(DataElement::new(
            PATIENT_ID,
            VR::LO,
            PrimitiveValue::from(new_id),
        ));

        Ok(ScrubOutcome::Scrubbed)
    }

    fn folder_name(&self, image: &Self::Image, policy: &ScrubPolicy) -> Result<String> {
        let parts: Vec<String> = policy
            .folder_tags()
            .iter()
            .filter_map(|tag| image.element_str(*tag))
            .map(|value| sanitize_component(&value))
            .filter(|value| !value.is_empty())
            .collect();

        if parts.is_empty() {
            return Err(DeidError::format(
                "<image>",
                "none of the folder attributes hold a usable value",
            ));
        }
        Ok(parts.join("_"))
    }

    fn save_output(
        &self,
        image: &Self::Image,
        dest: &Path,
        base_name: &str,
        emit_sidecar: bool,
    ) -> Result<PathBuf> {
        let output_path = dest.join(base_name);
        write_staged(&output_path, |staged| {
            image
                .write_to_file(staged)
                .map_err(|e| DeidError::format(staged, e))
        })?;

        if emit_sidecar {
            let sidecar_path = dest.join(sidecar_name(base_name));
            let written = write_staged(&sidecar_path, |staged| json::write_sidecar(image, staged));
            if let Err(err) = written {
                // The item failed as a whole; drop the image written above.
                let _ = std::fs::remove_file(&output_path);
                return Err(err);
            }
        }

        Ok(output_path)
    }
}
