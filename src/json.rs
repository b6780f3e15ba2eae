//
// json.rs
// Dicom-Deid-rs
//
// Renders the final tag set of a cleaned object as a DICOM JSON (PS3.18) sidecar document.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::object::{DefaultDicomObject, InMemDicomObject, StandardDataDictionary};
use dicom_json::DicomJson;

use crate::error::{DeidError, Result};

/// Serialize the dataset (without file meta) into pretty JSON.
pub fn sidecar_string(obj: &DefaultDicomObject) -> Result<String> {
    // The in-memory object implements serde-friendly conversions via dicom-json.
    let inner_obj: &InMemDicomObject<StandardDataDictionary> = &**obj;
    let json_obj = DicomJson::from(inner_obj);
    serde_json::to_string_pretty(&json_obj).map_err(|e| DeidError::format("<sidecar>", e))
}

/// Write the sidecar document to `path`.
pub fn write_sidecar(obj: &DefaultDicomObject, path: &Path) -> Result<()> {
    let json_string = sidecar_string(obj)?;
    std::fs::write(path, json_string).map_err(|e| DeidError::io(path, e))
}
