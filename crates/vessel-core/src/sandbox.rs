//! Syscall capability boundary for in-namespace setup code.
//!
//! The container init sequence issues a fixed series of irreversible kernel
//! operations (mount, pivot, exec). Routing them through the [`Sandbox`]
//! trait lets the orchestration logic run against [`FakeSandbox`] in unit
//! tests, without privilege or a real kernel, while [`HostSandbox`] backs
//! production use with the real syscalls.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use nix::mount::MsFlags;
use vessel_common::error::{Result, VesselError};

/// One recorded kernel operation, used by [`FakeSandbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxOp {
    /// A `mount(2)` call.
    Mount {
        /// Mount target path.
        target: PathBuf,
        /// Filesystem type, if any.
        fstype: Option<String>,
        /// Mount flags.
        flags: MsFlags,
    },
    /// A lazy-detach `umount2(2)` call.
    UnmountDetach {
        /// Unmount target path.
        target: PathBuf,
    },
    /// A `pivot_root(2)` call.
    PivotRoot {
        /// The directory becoming the new root.
        new_root: PathBuf,
        /// Where the old root is parked.
        put_old: PathBuf,
    },
    /// A `chdir(2)` call.
    Chdir {
        /// New working directory.
        path: PathBuf,
    },
    /// A directory creation.
    CreateDir {
        /// Created path.
        path: PathBuf,
    },
    /// A directory removal.
    RemoveDir {
        /// Removed path.
        path: PathBuf,
    },
    /// An `execv(2)` process-image replacement.
    Exec {
        /// Resolved program path.
        program: PathBuf,
        /// Full argument vector, including argv\[0\].
        argv: Vec<String>,
    },
}

/// Kernel operations needed to turn a fresh namespace set into a container.
pub trait Sandbox {
    /// Issues a `mount(2)` call.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if the syscall fails.
    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()>;

    /// Unmounts `target` with `MNT_DETACH` semantics (detach even if busy).
    ///
    /// # Errors
    ///
    /// Returns a kernel error if the syscall fails.
    fn unmount_detach(&self, target: &Path) -> Result<()>;

    /// Makes `new_root` the root mount and parks the old root at `put_old`.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if `pivot_root(2)` fails.
    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()>;

    /// Changes the working directory.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if `chdir(2)` fails.
    fn chdir(&self, path: &Path) -> Result<()>;

    /// Creates a directory; an already existing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if creation fails.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Removes an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if removal fails.
    fn remove_dir(&self, path: &Path) -> Result<()>;

    /// Replaces the current process image with `program`.
    ///
    /// On success this never returns; the current environment is inherited.
    ///
    /// # Errors
    ///
    /// Returns a kernel error if `execv(2)` fails.
    fn exec_replace(&self, program: &Path, argv: &[String]) -> Result<()>;
}

/// [`Sandbox`] backed by real syscalls.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSandbox;

impl Sandbox for HostSandbox {
    fn mount(
        &self,
        source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(target = %target.display(), ?fstype, "mount");
        nix::mount::mount(source, target, fstype, flags, data)
            .map_err(|e| VesselError::kernel("mount", e as i32))
    }

    fn unmount_detach(&self, target: &Path) -> Result<()> {
        tracing::debug!(target = %target.display(), "umount2 MNT_DETACH");
        nix::mount::umount2(target, nix::mount::MntFlags::MNT_DETACH)
            .map_err(|e| VesselError::kernel("umount2", e as i32))
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()> {
        tracing::info!(new_root = %new_root.display(), "pivot_root");
        nix::unistd::pivot_root(new_root, put_old)
            .map_err(|e| VesselError::kernel("pivot_root", e as i32))
    }

    fn chdir(&self, path: &Path) -> Result<()> {
        nix::unistd::chdir(path).map_err(|e| VesselError::kernel("chdir", e as i32))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        match std::fs::create_dir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(VesselError::io(path, e)),
        }
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir(path).map_err(|e| VesselError::io(path, e))
    }

    fn exec_replace(&self, program: &Path, argv: &[String]) -> Result<()> {
        let program_c =
            CString::new(program.as_os_str().as_bytes()).map_err(|_| VesselError::Validation {
                message: format!("program path contains NUL: {}", program.display()),
            })?;
        let argv_c = argv
            .iter()
            .map(|a| {
                CString::new(a.as_str()).map_err(|_| VesselError::Validation {
                    message: format!("argument contains NUL: {a}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(program = %program.display(), ?argv, "exec");
        match nix::unistd::execv(&program_c, &argv_c) {
            Ok(infallible) => match infallible {},
            Err(e) => Err(VesselError::kernel("execv", e as i32)),
        }
    }
}

/// Recording [`Sandbox`] that performs no kernel operations.
///
/// Every call succeeds and is appended to an operation log, so tests can
/// assert on the exact sequence the init path would issue.
#[derive(Debug, Default)]
pub struct FakeSandbox {
    ops: Mutex<Vec<SandboxOp>>,
}

impl FakeSandbox {
    /// Creates an empty recording sandbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> Vec<SandboxOp> {
        self.ops
            .lock()
            .map_or_else(|e| (*e.into_inner()).clone(), |g| (*g).clone())
    }

    fn record(&self, op: SandboxOp) {
        if let Ok(mut guard) = self.ops.lock() {
            guard.push(op);
        }
    }
}

impl Sandbox for FakeSandbox {
    fn mount(
        &self,
        _source: Option<&str>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        _data: Option<&str>,
    ) -> Result<()> {
        self.record(SandboxOp::Mount {
            target: target.to_path_buf(),
            fstype: fstype.map(str::to_owned),
            flags,
        });
        Ok(())
    }

    fn unmount_detach(&self, target: &Path) -> Result<()> {
        self.record(SandboxOp::UnmountDetach {
            target: target.to_path_buf(),
        });
        Ok(())
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()> {
        self.record(SandboxOp::PivotRoot {
            new_root: new_root.to_path_buf(),
            put_old: put_old.to_path_buf(),
        });
        Ok(())
    }

    fn chdir(&self, path: &Path) -> Result<()> {
        self.record(SandboxOp::Chdir {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.record(SandboxOp::CreateDir {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.record(SandboxOp::RemoveDir {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn exec_replace(&self, program: &Path, argv: &[String]) -> Result<()> {
        self.record(SandboxOp::Exec {
            program: program.to_path_buf(),
            argv: argv.to_vec(),
        });
        Ok(())
    }
}
