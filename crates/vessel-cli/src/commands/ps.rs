//! `vessel ps` — List containers.

use clap::Args;
use vessel_common::types::ContainerStatus;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including stopped and exited).
    #[arg(short, long)]
    pub all: bool,
}

/// Executes the `ps` command.
///
/// Queries the engine for container records and displays them in a
/// tabular format.
///
/// # Errors
///
/// Returns an error if the registry cannot be read.
pub fn execute(args: PsArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    let containers = engine.list().map_err(|e| anyhow::anyhow!("{e}"))?;

    let filtered: Vec<_> = if args.all {
        containers
    } else {
        containers
            .into_iter()
            .filter(|c| c.status == ContainerStatus::Running)
            .collect()
    };

    if filtered.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!(
        "{:<40} {:<15} {:<10} {:<8} {:<15} {:<25} {:<20}",
        "CONTAINER ID", "NAME", "STATUS", "PID", "IMAGE", "CREATED", "COMMAND"
    );
    for c in &filtered {
        println!(
            "{:<40} {:<15} {:<10} {:<8} {:<15} {:<25} {:<20}",
            c.id,
            c.name,
            c.status,
            c.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
            c.image,
            c.created_at,
            c.command.join(" ")
        );
    }

    Ok(())
}
