//! `vessel logs` — View a detached container's output.

use std::io::Write;

use clap::Args;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container whose log to print.
    pub container: String,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or the log file cannot
/// be read.
pub fn execute(args: LogsArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    let logs = engine
        .logs(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    // Raw write: container output is passed through byte-for-byte.
    std::io::stdout().write_all(logs.as_bytes())?;
    Ok(())
}
