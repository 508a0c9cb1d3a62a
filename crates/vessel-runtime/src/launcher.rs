//! Namespace-isolated process launch.
//!
//! The launcher clones a child into fresh UTS, PID, mount, network, and
//! IPC namespaces; the child immediately re-execs this same binary's
//! hidden `init` entry point (self-reexec). A fresh one-shot pipe carries
//! the command payload: its read end is inherited by the child at a fixed
//! descriptor index, the parent writes once and closes.

use std::ffi::CString;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::sched::CloneCb;
use vessel_common::constants::PAYLOAD_FD;
use vessel_common::error::{Result, VesselError};
use vessel_core::namespace::NamespaceSet;

/// Stack for the cloned child; released once the child execs.
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Everything the launcher needs to spawn one container process.
#[derive(Debug)]
pub struct LaunchSpec<'a> {
    /// Container name (used for log placement diagnostics only).
    pub container: &'a str,
    /// Interactive mode: child keeps the caller's terminal. Otherwise
    /// stdout/stderr go to the log file; stdin stays inherited either way.
    pub tty: bool,
    /// The merged mount point, set as the child's working directory.
    pub merged_dir: &'a Path,
    /// Per-container log file used when not interactive.
    pub log_path: &'a Path,
    /// Extra `KEY=VALUE` environment entries appended to the inherited
    /// environment.
    pub env: &'a [String],
    /// Namespace categories requested at clone time.
    pub namespaces: NamespaceSet,
}

/// Write end of the one-shot command channel.
///
/// Carries exactly one JSON-encoded argument vector; sending consumes the
/// writer and closes the channel, which is the child's end-of-stream
/// signal.
#[derive(Debug)]
pub struct PayloadWriter(File);

impl PayloadWriter {
    pub(crate) const fn new(file: File) -> Self {
        Self(file)
    }

    /// Writes the argument vector and closes the channel.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the payload cannot be written.
    pub fn send(self, argv: &[String]) -> Result<()> {
        serde_json::to_writer(&self.0, argv)?;
        tracing::debug!(?argv, "payload sent, closing channel");
        Ok(())
    }
}

/// A spawned, not-yet-commanded container process.
#[derive(Debug)]
pub struct LaunchedChild {
    /// Host-view PID of the container's init process.
    pub pid: i32,
    /// One-shot channel the caller must write the command to.
    pub payload: PayloadWriter,
}

/// Spawns the isolated child and returns without waiting for it.
///
/// The child blocks reading the payload channel until the caller sends
/// the command and drops the writer.
///
/// # Errors
///
/// Returns an error if the pipe, log file, or `clone(2)` fails.
pub fn launch(spec: &LaunchSpec<'_>) -> Result<LaunchedChild> {
    let (payload_read, payload_write) =
        nix::unistd::pipe().map_err(|e| VesselError::kernel("pipe", e as i32))?;

    // The write end must not leak into the child across its exec, or the
    // child's EOF-terminated read would block forever.
    let _ = nix::fcntl::fcntl(
        &payload_write,
        nix::fcntl::FcntlArg::F_SETFD(nix::fcntl::FdFlag::FD_CLOEXEC),
    )
    .map_err(|e| VesselError::kernel("fcntl", e as i32))?;

    let log_file = if spec.tty {
        None
    } else {
        if let Some(parent) = spec.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VesselError::io(parent, e))?;
        }
        Some(File::create(spec.log_path).map_err(|e| VesselError::io(spec.log_path, e))?)
    };

    let exe = cstring("/proc/self/exe")?;
    let argv = vec![cstring("/proc/self/exe")?, cstring("init")?];
    let envp = build_envp(spec.env)?;
    let merged_dir = spec.merged_dir.to_path_buf();

    let payload_raw = payload_read.as_raw_fd();
    let log_raw = log_file.as_ref().map(AsRawFd::as_raw_fd);

    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    let cb: CloneCb<'_> =
        Box::new(move || child_entry(payload_raw, log_raw, &merged_dir, &exe, &argv, &envp));

    // SAFETY: the callback only issues dup2/chdir/execve, all safe after
    // fork, and the stack outlives the child's exec.
    let pid = unsafe {
        nix::sched::clone(
            cb,
            &mut stack,
            spec.namespaces.clone_flags(),
            Some(libc::SIGCHLD),
        )
    }
    .map_err(|e| VesselError::kernel("clone", e as i32))?;

    tracing::info!(container = spec.container, pid = pid.as_raw(), "container process spawned");

    // Parent keeps only the write end; read end and log file close here.
    drop(payload_read);
    drop(log_file);

    Ok(LaunchedChild {
        pid: pid.as_raw(),
        payload: PayloadWriter::new(File::from(payload_write)),
    })
}

/// First instructions of the cloned child, before exec. Returns the exit
/// code on failure; on success the exec never comes back.
fn child_entry(
    payload_fd: i32,
    log_fd: Option<i32>,
    merged_dir: &PathBuf,
    exe: &CString,
    argv: &[CString],
    envp: &[CString],
) -> isize {
    // SAFETY: dup2 on descriptors the parent opened and keeps alive
    // until clone returns.
    if unsafe { libc::dup2(payload_fd, PAYLOAD_FD) } < 0 {
        return 1;
    }
    if let Some(fd) = log_fd {
        // Detached: stdout/stderr to the log file. Stdin is left on the
        // caller's terminal (known quirk, kept for compatibility).
        // SAFETY: as above.
        if unsafe { libc::dup2(fd, libc::STDOUT_FILENO) } < 0
            || unsafe { libc::dup2(fd, libc::STDERR_FILENO) } < 0
        {
            return 1;
        }
    }
    if nix::unistd::chdir(merged_dir).is_err() {
        return 1;
    }
    let _ = nix::unistd::execve(exe, argv, envp);
    127
}

/// Inherited environment plus the user-supplied `KEY=VALUE` entries.
fn build_envp(extra: &[String]) -> Result<Vec<CString>> {
    let mut envp = Vec::new();
    for (key, value) in std::env::vars() {
        envp.push(cstring(&format!("{key}={value}"))?);
    }
    for entry in extra {
        envp.push(cstring(entry)?);
    }
    Ok(envp)
}

fn cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| VesselError::Validation {
        message: format!("string contains NUL byte: {s}"),
    })
}
