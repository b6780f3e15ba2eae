//
// editor.rs
// Dicom-Deid-rs
//
// Contract between the traversal core and whatever parses, scrubs and saves one structured image.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::identifiers::IdentifierMap;
use crate::policy::ScrubPolicy;
use crate::runlog::RunLog;

/// Result of scrubbing one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrubOutcome {
    Scrubbed,
    /// The subject id has no entry in the identifier table; nothing may be written.
    UnknownSubject { source_id: String },
}

/// The metadata editor + structured image capabilities used by the item processor.
pub trait MetadataEditor {
    /// In-memory representation of one parsed input file.
    type Image;

    /// Open and parse `path`. Unreadable files are `Io` errors, invalid content is `Format`.
    fn load(&self, path: &Path) -> Result<Self::Image>;

    /// Apply `policy` and the identifier remapping to `image` in place.
    fn scrub(
        &self,
        image: &mut Self::Image,
        policy: &ScrubPolicy,
        ids: &IdentifierMap,
        log: &RunLog,
    ) -> Result<ScrubOutcome>;

    /// Output folder name derived from the (already remapped) image.
    fn folder_name(&self, image: &Self::Image, policy: &ScrubPolicy) -> Result<String>;

    /// Write the cleaned image as `<dest>/<base_name>`, plus a sidecar when asked.
    /// Returns the path of the written image.
    fn save_output(
        &self,
        image: &Self::Image,
        dest: &Path,
        base_name: &str,
        emit_sidecar: bool,
    ) -> Result<PathBuf>;
}

/// Sidecar file name for a cleaned image. Only a `.dcm` extension is swapped;
/// UID-named files ("1.2.840.113619.2.55") keep their full name.
pub fn sidecar_name(base_name: &str) -> String {
    let path = Path::new(base_name);
    let is_dcm = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"));
    match path.file_stem() {
        Some(stem) if is_dcm => format!("{}.json", stem.to_string_lossy()),
        _ => format!("{base_name}.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_swaps_only_dicom_extensions() {
        assert_eq!(sidecar_name("IM0001.dcm"), "IM0001.json");
        assert_eq!(sidecar_name("IM0001"), "IM0001.json");
        assert_eq!(sidecar_name("scan.DCM"), "scan.json");
        assert_eq!(sidecar_name("1.2.840.113619"), "1.2.840.113619.json");
    }
}
