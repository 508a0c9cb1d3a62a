//! CLI command definitions and dispatch.

pub mod commit;
pub mod exec;
pub mod init;
pub mod logs;
pub mod network;
pub mod ps;
pub mod rm;
pub mod run;
pub mod stop;

use clap::{Parser, Subcommand};

/// Vessel — Daemon-less container runtime for Linux.
#[derive(Parser, Debug)]
#[command(name = "vessel", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a container from an image.
    Run(run::RunArgs),
    /// Internal in-container init entry point (spawned via self-reexec).
    #[command(hide = true)]
    Init,
    /// Package a container's filesystem into an image archive.
    Commit(commit::CommitArgs),
    /// List containers.
    Ps(ps::PsArgs),
    /// View a detached container's logs.
    Logs(logs::LogsArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
    /// Stop a running container.
    Stop(stop::StopArgs),
    /// Remove a stopped container.
    Rm(rm::RmArgs),
    /// Manage container networks.
    Network(network::NetworkArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Init => init::execute(),
        Command::Commit(args) => commit::execute(args),
        Command::Ps(args) => ps::execute(args),
        Command::Logs(args) => logs::execute(args),
        Command::Exec(args) => exec::execute(args),
        Command::Stop(args) => stop::execute(args),
        Command::Rm(args) => rm::execute(args),
        Command::Network(args) => network::execute(args),
    }
}
