//! `vessel commit` — Package a container's filesystem into an archive.

use std::path::PathBuf;

use clap::Args;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `commit` command.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Container to package.
    pub container: String,

    /// Destination archive path (defaults to `<container>.tar.gz`).
    #[arg(short = 'c', long)]
    pub output: Option<PathBuf>,
}

/// Executes the `commit` command.
///
/// # Errors
///
/// Returns an error if the container is unknown or archiving fails.
pub fn execute(args: CommitArgs) -> anyhow::Result<()> {
    let dest = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.tar.gz", args.container)));

    let engine = Engine::with_defaults();
    engine
        .export(&args.container, &dest)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{}", dest.display());
    Ok(())
}
