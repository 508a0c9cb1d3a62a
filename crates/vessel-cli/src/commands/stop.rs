//! `vessel stop` — Stop a running container.

use clap::Args;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container to stop.
    pub container: String,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or its record cannot be
/// updated.
pub fn execute(args: StopArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    engine
        .stop(&args.container)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{}", args.container);
    Ok(())
}
