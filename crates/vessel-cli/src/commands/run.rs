//! `vessel run` — Create and start a container.

use clap::Args;
use vessel_common::types::ResourceSpec;
use vessel_runtime::lifecycle::{Engine, RunOptions};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Keep the terminal attached and wait for the container to exit.
    #[arg(short = 't', long = "tty", conflicts_with = "detach")]
    pub tty: bool,

    /// Run detached; output goes to the container log.
    #[arg(short, long)]
    pub detach: bool,

    /// Container name (derived from the id when omitted).
    #[arg(long)]
    pub name: Option<String>,

    /// Memory limit (e.g. `100m`), written verbatim to the cgroup.
    #[arg(short, long)]
    pub memory: Option<String>,

    /// Relative CPU share weight.
    #[arg(long)]
    pub cpushare: Option<String>,

    /// CPU cores the container may run on (e.g. `0-1`).
    #[arg(long)]
    pub cpuset: Option<String>,

    /// Bind a host directory: `/host/path:/container/path`.
    #[arg(short, long)]
    pub volume: Option<String>,

    /// Extra environment entry `KEY=VALUE` (repeatable).
    #[arg(short, long = "env")]
    pub env: Vec<String>,

    /// Network to attach the container to.
    #[arg(long = "net")]
    pub network: Option<String>,

    /// Port mapping `host:container` (repeatable).
    #[arg(short, long = "port")]
    pub ports: Vec<String>,

    /// Image the container's root filesystem is built from.
    pub image: String,

    /// Command to run inside the container.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the container cannot be started.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    engine
        .start(&RunOptions {
            name: args.name,
            image: args.image,
            command: args.command,
            tty: args.tty,
            detach: args.detach,
            resources: ResourceSpec {
                memory: args.memory,
                cpu_shares: args.cpushare,
                cpuset: args.cpuset,
            },
            volume: args.volume,
            env: args.env,
            network: args.network,
            ports: args.ports,
        })
        .map_err(|e| anyhow::anyhow!("{e}"))
}
