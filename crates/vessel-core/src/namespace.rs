//! Namespace selection for isolated launches and `setns(2)` joining.
//!
//! A container gets a fixed minimal namespace set: UTS, PID, mount,
//! network, and IPC. User and cgroup namespaces are deliberately not
//! requested.

use std::fs::File;
use std::path::PathBuf;

use nix::sched::CloneFlags;
use vessel_common::error::{Result, VesselError};

/// Which namespace categories a new container process is isolated in.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy)]
pub struct NamespaceSet {
    /// Hostname/domain isolation.
    pub uts: bool,
    /// Process-id tree isolation.
    pub pid: bool,
    /// Mount table isolation.
    pub mount: bool,
    /// Network stack isolation.
    pub network: bool,
    /// IPC object isolation.
    pub ipc: bool,
}

impl Default for NamespaceSet {
    fn default() -> Self {
        Self {
            uts: true,
            pid: true,
            mount: true,
            network: true,
            ipc: true,
        }
    }
}

impl NamespaceSet {
    /// Translates the selection into `clone(2)` flags.
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        flags
    }
}

/// The `/proc/<pid>/ns/` entries joined for attach, in join order.
///
/// The mount namespace comes last: once joined, the old `/proc` view
/// (and with it the remaining namespace handles) is gone.
const JOIN_ORDER: [(&str, CloneFlags); 5] = [
    ("uts", CloneFlags::CLONE_NEWUTS),
    ("ipc", CloneFlags::CLONE_NEWIPC),
    ("net", CloneFlags::CLONE_NEWNET),
    ("pid", CloneFlags::CLONE_NEWPID),
    ("mnt", CloneFlags::CLONE_NEWNS),
];

/// Joins the namespaces of the process `pid` in the calling process.
///
/// Opens every namespace handle up front, then enters them one by one.
/// After joining the PID namespace, only newly spawned children land in
/// the target PID tree; the caller itself keeps its pid.
///
/// # Errors
///
/// Returns an error if a namespace handle cannot be opened or a
/// `setns(2)` call fails.
pub fn join_namespaces(pid: i32) -> Result<()> {
    let mut handles: Vec<(File, CloneFlags)> = Vec::with_capacity(JOIN_ORDER.len());
    for (name, flag) in JOIN_ORDER {
        let path = PathBuf::from(format!("/proc/{pid}/ns/{name}"));
        let file = File::open(&path).map_err(|e| VesselError::io(&path, e))?;
        handles.push((file, flag));
    }

    for (file, flag) in handles {
        nix::sched::setns(&file, flag).map_err(|e| VesselError::kernel("setns", e as i32))?;
    }

    tracing::debug!(pid, "joined container namespaces");
    Ok(())
}
