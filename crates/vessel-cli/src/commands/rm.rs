//! `vessel rm` — Remove a stopped container.

use clap::Args;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container to remove.
    pub container: String,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, still running, or its
/// workspace cannot be torn down.
pub fn execute(args: RmArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    engine
        .remove(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{}", args.container);
    Ok(())
}
