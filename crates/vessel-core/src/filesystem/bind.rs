//! Bind mounts for host volumes inside the merged view.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Bind-mounts `source` onto `target`, creating both directories if needed.
///
/// # Errors
///
/// Returns an error if directory creation or the `mount(2)` syscall fails.
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    std::fs::create_dir_all(source).map_err(|e| VesselError::io(source, e))?;
    std::fs::create_dir_all(target).map_err(|e| VesselError::io(target, e))?;

    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| VesselError::kernel("mount", e as i32))?;

    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        "volume bind-mounted"
    );
    Ok(())
}

/// Unmounts a bind mount, tolerating "not mounted" conditions.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails for any other reason.
pub fn unmount_bind(target: &Path) -> Result<()> {
    super::unmount_if_mounted(target)
}
