//! Attaching into a running container's namespaces.
//!
//! Attach is a dedicated entry path with structured arguments: it joins
//! the target's existing namespaces by pid-referenced handles and runs a
//! command there. No workspace or cgroup work happens here — the target
//! container already owns both.

use vessel_common::error::{Result, VesselError};
use vessel_core::namespace::join_namespaces;

/// Joins the namespaces of `pid` and runs `argv` inside them,
/// inheriting the caller's stdio. Returns the command's exit code.
///
/// The caller's own process stays joined until it exits; only the
/// spawned child lands in the container's PID tree.
///
/// # Errors
///
/// Returns an error for an empty command, a failed namespace join, or a
/// command that could not be spawned.
pub fn attach_and_run(pid: i32, argv: &[String]) -> Result<i32> {
    let (program, args) = argv.split_first().ok_or_else(|| VesselError::Validation {
        message: "missing command to execute".into(),
    })?;

    join_namespaces(pid)?;

    tracing::info!(pid, ?argv, "executing in container namespaces");
    let status = std::process::Command::new(program)
        .args(args)
        .status()
        .map_err(|e| VesselError::io(program, e))?;

    Ok(status.code().unwrap_or(-1))
}
