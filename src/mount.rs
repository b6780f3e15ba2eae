//
// mount.rs
// Dicom-Deid-rs
//
// Disc-image mounting: the mounter contract, a loop-device implementation and the guard that
// guarantees every mount is paired with an unmount.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::MountSettings;
use crate::error::{DeidError, Result};

/// Turns an archive image into a transient directory tree and back.
pub trait ArchiveMounter {
    /// Mount `image` somewhere under `work_root` and return the mounted root.
    fn mount(&self, image: &Path, work_root: &Path) -> Result<PathBuf>;

    /// Release a root previously returned by [`ArchiveMounter::mount`].
    fn unmount(&self, mounted_root: &Path) -> Result<()>;
}

/// True when `path` names an optical-disc image.
pub fn is_archive_image(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("iso"))
}

/// Unmounts on drop unless [`MountGuard::release`] already did.
pub struct MountGuard<'m, M: ArchiveMounter + ?Sized> {
    mounter: &'m M,
    root: Option<PathBuf>,
}

impl<'m, M: ArchiveMounter + ?Sized> MountGuard<'m, M> {
    pub fn new(mounter: &'m M, root: PathBuf) -> Self {
        Self {
            mounter,
            root: Some(root),
        }
    }

    /// Unmount now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        match self.root.take() {
            Some(root) => self.mounter.unmount(&root),
            None => Ok(()),
        }
    }
}

impl<M: ArchiveMounter + ?Sized> Drop for MountGuard<'_, M> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            if let Err(e) = self.mounter.unmount(&root) {
                warn!("failed to unmount {}: {}", root.display(), e);
            }
        }
    }
}

/// Read-only loop mounts through `mount(8)` / `umount(8)`.
#[derive(Debug, Clone, Default)]
pub struct LoopMounter {
    use_sudo: bool,
}

impl LoopMounter {
    pub fn new(settings: &MountSettings) -> Self {
        Self {
            use_sudo: settings.sudo,
        }
    }

    fn command(&self, program: &str) -> Command {
        if self.use_sudo {
            let mut cmd = Command::new("sudo");
            cmd.arg(program);
            cmd
        } else {
            Command::new(program)
        }
    }

    fn run(&self, mut cmd: Command, subject: &Path) -> Result<()> {
        debug!("running {:?}", cmd);
        let output = cmd.output().map_err(|e| DeidError::mount(subject, e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DeidError::mount(
                subject,
                format!(
                    "{} ({})",
                    String::from_utf8_lossy(&output.stderr).trim(),
                    output.status
                ),
            ))
        }
    }
}

/// Fresh hidden directory under `work_root` named after the image.
pub fn fresh_mount_point(image: &Path, work_root: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| crate::storage::sanitize_component(&s.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 0usize;
    loop {
        let candidate = work_root.join(format!(".mnt-{stem}-{n}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

impl ArchiveMounter for LoopMounter {
    fn mount(&self, image: &Path, work_root: &Path) -> Result<PathBuf> {
        let mount_point = fresh_mount_point(image, work_root);
        fs::create_dir_all(&mount_point).map_err(|e| DeidError::io(&mount_point, e))?;

        let mut cmd = self.command("mount");
        cmd.args(["-o", "loop,ro"]).arg(image).arg(&mount_point);
        if let Err(err) = self.run(cmd, image) {
            let _ = fs::remove_dir(&mount_point);
            return Err(err);
        }
        Ok(mount_point)
    }

    fn unmount(&self, mounted_root: &Path) -> Result<()> {
        let mut cmd = self.command("umount");
        cmd.arg(mounted_root);
        self.run(cmd, mounted_root)?;
        fs::remove_dir(mounted_root).map_err(|e| DeidError::io(mounted_root, e))
    }
}
