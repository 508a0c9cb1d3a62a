//! `vessel init` — hidden in-container entry point.
//!
//! Never invoked by users: the launcher re-execs `/proc/self/exe init`
//! inside the fresh namespaces, with the command payload waiting on an
//! inherited descriptor.

use vessel_core::sandbox::HostSandbox;

/// Executes the `init` sequence; on success the process is replaced by
/// the user command and this never returns.
///
/// # Errors
///
/// Returns an error if rootfs setup or the final exec fails.
pub fn execute() -> anyhow::Result<()> {
    tracing::info!(pid = std::process::id(), "container init starting");
    vessel_runtime::init::run(&HostSandbox).map_err(|e| anyhow::anyhow!("{e}"))
}
