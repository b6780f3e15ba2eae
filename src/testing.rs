//! In-memory collaborators for exercising the traversal core without DICOM files or real mounts.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::editor::{sidecar_name, MetadataEditor, ScrubOutcome};
use crate::error::{DeidError, Result};
use crate::identifiers::IdentifierMap;
use crate::mount::ArchiveMounter;
use crate::policy::ScrubPolicy;
use crate::run::RunContext;
use crate::runlog::RunLog;
use crate::storage::ensure_directory;

/// Text "image": a file containing `subject=<id>`.
pub struct TextImage {
    pub subject: String,
}

/// Editor over text images. A file whose content is `panic` panics while loading.
#[derive(Default)]
pub struct TextEditor {
    pub loads: Cell<usize>,
}

impl MetadataEditor for TextEditor {
    type Image = TextImage;

    fn load(&self, path: &Path) -> Result<TextImage> {
        self.loads.set(self.loads.get() + 1);
        let text = fs::read_to_string(path).map_err(|e| DeidError::io(path, e))?;
        if text.trim() == "panic" {
            panic!("editor blew up on {}", path.display());
        }
        text.trim()
            .strip_prefix("subject=")
            .map(|s| TextImage {
                subject: s.to_string(),
            })
            .ok_or_else(|| DeidError::format(path, "missing subject line"))
    }

    fn scrub(
        &self,
        image: &mut TextImage,
        _policy: &ScrubPolicy,
        ids: &IdentifierMap,
        _log: &RunLog,
    ) -> Result<ScrubOutcome> {
        match ids.resolve(&image.subject) {
            Some(new_id) => {
                image.subject = new_id.to_string();
                Ok(ScrubOutcome::Scrubbed)
            }
            None => Ok(ScrubOutcome::UnknownSubject {
                source_id: image.subject.clone(),
            }),
        }
    }

    fn folder_name(&self, image: &TextImage, _policy: &ScrubPolicy) -> Result<String> {
        Ok(image.subject.clone())
    }

    fn save_output(
        &self,
        image: &TextImage,
        dest: &Path,
        base_name: &str,
        emit_sidecar: bool,
    ) -> Result<PathBuf> {
        let target = dest.join(base_name);
        fs::write(&target, format!("subject={}", image.subject))
            .map_err(|e| DeidError::io(&target, e))?;
        if emit_sidecar {
            let sidecar = dest.join(sidecar_name(base_name));
            fs::write(&sidecar, "{}").map_err(|e| DeidError::io(&sidecar, e))?;
        }
        Ok(target)
    }
}

/// "Mounts" an image by handing out a prepared directory, keyed by the image's file name.
#[derive(Default)]
pub struct DirMounter {
    pub images: HashMap<String, PathBuf>,
    pub mounts: Cell<usize>,
    pub unmounts: Cell<usize>,
}

impl DirMounter {
    pub fn with_image(mut self, file_name: &str, contents: &Path) -> Self {
        self.images
            .insert(file_name.to_string(), contents.to_path_buf());
        self
    }
}

impl ArchiveMounter for DirMounter {
    fn mount(&self, image: &Path, _work_root: &Path) -> Result<PathBuf> {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root = self
            .images
            .get(&name)
            .cloned()
            .ok_or_else(|| DeidError::mount(image, "unknown image"))?;
        self.mounts.set(self.mounts.get() + 1);
        Ok(root)
    }

    fn unmount(&self, _mounted_root: &Path) -> Result<()> {
        self.unmounts.set(self.unmounts.get() + 1);
        Ok(())
    }
}

pub fn context<'a>(policy: &'a ScrubPolicy, ids: &'a IdentifierMap, out: &Path) -> RunContext<'a> {
    ensure_directory(out).expect("output dir");
    let log = RunLog::create_in(out).expect("log");
    RunContext::new(policy, ids, false, out.to_path_buf(), log)
}
