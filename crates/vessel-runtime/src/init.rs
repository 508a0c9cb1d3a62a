//! In-namespace container initialization.
//!
//! This code path runs as the very first instructions of the freshly
//! cloned process — PID 1 of its new PID namespace. It blocks on the
//! payload channel, rebuilds the mount table around the merged rootfs,
//! and replaces itself with the user command. Every step is fatal: there
//! is no partial-isolation fallback, the process exits non-zero before
//! any user code runs.

use std::fs::File;
use std::io::Read;
use std::os::fd::FromRawFd;
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use vessel_common::constants::{PAYLOAD_FD, PIVOT_DIR};
use vessel_common::error::{Result, VesselError};
use vessel_core::sandbox::Sandbox;

/// Runs the full init sequence. Never returns on success.
///
/// # Errors
///
/// Returns an error if the payload is unreadable or any kernel
/// operation fails; the caller must exit non-zero.
pub fn run(sandbox: &dyn Sandbox) -> Result<()> {
    let argv = read_payload()?;
    if argv.is_empty() {
        return Err(VesselError::Validation {
            message: "empty command payload".into(),
        });
    }
    tracing::info!(?argv, "init received command");

    let root = std::env::current_dir().map_err(|e| VesselError::io("<cwd>", e))?;
    setup_rootfs(sandbox, &root)?;
    exec_user_command(sandbox, &argv)
}

/// Reads the inherited payload descriptor to end-of-stream and decodes
/// the argument vector.
///
/// The read blocks until the parent has written the command and closed
/// its end; that close is the launch handshake.
fn read_payload() -> Result<Vec<String>> {
    // SAFETY: the launcher placed the channel's read end at PAYLOAD_FD
    // and nothing else owns it in this process.
    let mut channel = unsafe { File::from_raw_fd(PAYLOAD_FD) };
    let mut raw = String::new();
    let _ = channel
        .read_to_string(&mut raw)
        .map_err(|e| VesselError::io(format!("fd {PAYLOAD_FD}"), e))?;
    decode_payload(&raw)
}

/// Decodes a payload as written by the launcher.
///
/// The channel carries a structured JSON argument vector, so arguments
/// containing spaces survive the transport intact.
///
/// # Errors
///
/// Returns a serialization error for a malformed payload.
pub fn decode_payload(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

/// Rebuilds the mount table: private propagation, root pivot, fresh
/// `/proc` and `/dev`.
///
/// # Errors
///
/// Returns the first failing kernel operation; order is strict and no
/// step may be skipped.
pub fn setup_rootfs(sandbox: &dyn Sandbox, root: &Path) -> Result<()> {
    // Mount namespaces inherit shared propagation from systemd hosts;
    // without this remount the pivot would leak back to the host table.
    sandbox.mount(
        None,
        Path::new("/"),
        None,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None,
    )?;

    pivot_into(sandbox, root)?;

    sandbox.mount(
        Some("proc"),
        Path::new("/proc"),
        Some("proc"),
        MsFlags::MS_NOEXEC | MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        None,
    )?;
    sandbox.mount(
        Some("tmpfs"),
        Path::new("/dev"),
        Some("tmpfs"),
        MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME,
        Some("mode=755"),
    )?;

    Ok(())
}

/// The root-pivot sequence. After it completes the original host root is
/// unreachable from this mount namespace.
fn pivot_into(sandbox: &dyn Sandbox, root: &Path) -> Result<()> {
    let root_str = root.to_str().ok_or_else(|| VesselError::Validation {
        message: format!("rootfs path is not valid UTF-8: {}", root.display()),
    })?;

    // pivot_root(2) requires new_root to be a mount point; binding the
    // directory onto itself forces a distinct mount entry.
    sandbox.mount(
        Some(root_str),
        root,
        None,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None,
    )?;

    let put_old = root.join(PIVOT_DIR);
    sandbox.create_dir(&put_old)?;
    sandbox.pivot_root(root, &put_old)?;
    sandbox.chdir(Path::new("/"))?;

    let old_root = Path::new("/").join(PIVOT_DIR);
    sandbox.unmount_detach(&old_root)?;
    sandbox.remove_dir(&old_root)?;
    Ok(())
}

/// Resolves the command against `PATH` and replaces the process image.
///
/// # Errors
///
/// Returns a validation error for an empty argument vector, or a kernel
/// error if the exec fails.
pub fn exec_user_command(sandbox: &dyn Sandbox, argv: &[String]) -> Result<()> {
    let Some(program) = argv.first() else {
        return Err(VesselError::Validation {
            message: "empty command payload".into(),
        });
    };

    let current = std::env::var("PATH").unwrap_or_default();
    if let Some(extended) = path_with_bin(&current) {
        // SAFETY: single-threaded here; nothing else reads the
        // environment concurrently before the exec.
        unsafe { std::env::set_var("PATH", extended) };
    }

    sandbox.exec_replace(&resolve_program(program), argv)
}

/// Appends `:/bin` unless `:/bin` is present or the path leads with `/bin`.
fn path_with_bin(current: &str) -> Option<String> {
    if current.contains(":/bin") || current.starts_with("/bin") {
        None
    } else {
        Some(format!("{current}:/bin"))
    }
}

/// PATH lookup with literal-path fallback.
fn resolve_program(token: &str) -> PathBuf {
    which::which(token).unwrap_or_else(|_| PathBuf::from(token))
}
