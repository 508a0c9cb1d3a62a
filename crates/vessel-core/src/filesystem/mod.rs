//! Container filesystem building blocks: union mounts and bind mounts.

pub mod bind;
pub mod overlay;

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Lazily unmounts `target`, tolerating "not mounted" conditions.
///
/// Teardown paths must be idempotent, so a target that is absent or not
/// currently a mount point is not an error.
///
/// # Errors
///
/// Returns a kernel error for any failure other than the target not
/// being mounted.
pub fn unmount_if_mounted(target: &Path) -> Result<()> {
    use nix::errno::Errno;

    match nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH) {
        Ok(()) => {
            tracing::debug!(target = %target.display(), "unmounted");
            Ok(())
        }
        Err(Errno::EINVAL | Errno::ENOENT) => Ok(()),
        Err(e) => Err(VesselError::kernel("umount2", e as i32)),
    }
}
