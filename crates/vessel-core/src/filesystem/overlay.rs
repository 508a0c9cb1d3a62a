//! `OverlayFS` management for layered container root filesystems.
//!
//! Stacks a shared read-only lower layer under a per-container writable
//! upper layer, presented as one merged directory tree.

use std::path::{Path, PathBuf};

use vessel_common::error::{Result, VesselError};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Read-only lower layer (the extracted image tree).
    pub lower_dir: PathBuf,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the upper, work, and merged directories if they do not exist,
/// then issues the `mount(2)` syscall with overlay-specific options. The
/// lower directory must already exist.
///
/// # Errors
///
/// Returns an error if directory creation fails or if the mount syscall fails.
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    for dir in [&config.upper_dir, &config.work_dir, &config.merged_dir] {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
    }

    let opts = format!(
        "lowerdir={},upperdir={},workdir={}",
        config.lower_dir.display(),
        config.upper_dir.display(),
        config.work_dir.display()
    );

    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| VesselError::kernel("mount", e as i32))?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Unmounts the merged view at the given path.
///
/// Uses `MNT_DETACH` to lazily detach the filesystem; a path that is not
/// mounted is not an error.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails for any other reason.
pub fn unmount_overlay(merged_dir: &Path) -> Result<()> {
    super::unmount_if_mounted(merged_dir)
}
