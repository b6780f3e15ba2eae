//
// traverse.rs
// Dicom-Deid-rs
//
// Recursive walk over files, directory trees and mountable disc images. Each item is isolated: a
// failure is logged and the walk carries on.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::editor::MetadataEditor;
use crate::error::Result;
use crate::mount::{is_archive_image, ArchiveMounter, MountGuard};
use crate::process::{base_name, process_item};
use crate::run::RunContext;

/// How a path is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    ArchiveImage,
    RegularFile,
    Container,
    Unsupported,
}

pub fn classify(path: &Path) -> ItemKind {
    if path.is_file() {
        if is_archive_image(path) {
            ItemKind::ArchiveImage
        } else {
            ItemKind::RegularFile
        }
    } else if path.is_dir() {
        ItemKind::Container
    } else {
        ItemKind::Unsupported
    }
}

pub struct Traversal<'a, E: ?Sized, M: ?Sized> {
    editor: &'a E,
    mounter: &'a M,
}

impl<'a, E, M> Traversal<'a, E, M>
where
    E: MetadataEditor + ?Sized,
    M: ArchiveMounter + ?Sized,
{
    pub fn new(editor: &'a E, mounter: &'a M) -> Self {
        Self { editor, mounter }
    }

    /// Visit `path`, whatever it is. Never propagates per-item errors.
    pub fn visit(&self, path: &Path, ctx: &mut RunContext<'_>) {
        match classify(path) {
            ItemKind::Container => self.visit_container(path, ctx),
            ItemKind::ArchiveImage | ItemKind::RegularFile => self.dispatch_file(path, ctx),
            ItemKind::Unsupported => {
                ctx.log.failure(format!(
                    "{} failed\nnot a regular file or directory",
                    path.display()
                ));
                ctx.summary.failed += 1;
            }
        }
    }

    fn visit_container(&self, dir: &Path, ctx: &mut RunContext<'_>) {
        // Depth-first, siblings in lexicographic order. An output root nested inside the
        // input is never walked, however either path is spelled.
        let out_dir = canonical(&ctx.out_dir);
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !(e.file_type().is_dir() && canonical(e.path()) == out_dir));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let at = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| dir.display().to_string());
                    ctx.log.failure(format!("{at} failed\n{e}"));
                    ctx.summary.failed += 1;
                    continue;
                }
            };
            if entry.file_type().is_dir() || !entry.path().is_file() {
                continue;
            }
            ctx.log.trace(entry.path().display().to_string());
            self.dispatch_file(entry.path(), ctx);
        }
    }

    fn dispatch_file(&self, path: &Path, ctx: &mut RunContext<'_>) {
        if !is_archive_image(path) {
            process_item(self.editor, path, ctx);
            return;
        }
        if let Err(e) = self.visit_archive(path, ctx) {
            ctx.log.failure(format!("{} failed\n{}", base_name(path), e));
            ctx.summary.failed += 1;
        }
    }

    fn visit_archive(&self, image: &Path, ctx: &mut RunContext<'_>) -> Result<()> {
        let root = self.mounter.mount(image, &ctx.out_dir)?;
        ctx.summary.mounted += 1;
        // Dropping the guard unmounts on every exit path, unwinding included
        let guard = MountGuard::new(self.mounter, root.clone());
        ctx.log
            .record(format!("Mounted {} at {}", image.display(), root.display()));

        if root.is_dir() {
            self.visit_container(&root, ctx);
        } else {
            ctx.log.failure(format!(
                "{} failed\nmounted root {} is not a directory",
                base_name(image),
                root.display()
            ));
            ctx.summary.failed += 1;
        }

        guard.release()?;
        ctx.log.record(format!("Unmounted {}", image.display()));
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
