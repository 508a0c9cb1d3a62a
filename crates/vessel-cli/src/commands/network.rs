//! `vessel network` — Manage container networks.

use clap::{Args, Subcommand};
use vessel_runtime::network::{NetworkProvider, UnavailableNetwork};

/// Arguments for the `network` command group.
#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Network operation to perform.
    #[command(subcommand)]
    pub action: NetworkAction,
}

/// Network subcommands.
#[derive(Subcommand, Debug)]
pub enum NetworkAction {
    /// Create a network.
    Create {
        /// Driver backing the network.
        #[arg(long, default_value = "bridge")]
        driver: String,
        /// Subnet in CIDR notation.
        #[arg(long)]
        subnet: String,
        /// Network name.
        name: String,
    },
    /// List networks.
    List,
    /// Remove a network.
    Remove {
        /// Network name.
        name: String,
    },
}

/// Executes the `network` command.
///
/// # Errors
///
/// Returns an error if the network provider rejects the operation.
pub fn execute(args: NetworkArgs) -> anyhow::Result<()> {
    let provider = UnavailableNetwork;

    match args.action {
        NetworkAction::Create {
            driver,
            subnet,
            name,
        } => provider
            .create(&driver, &subnet, &name)
            .map_err(|e| anyhow::anyhow!("{e}")),
        NetworkAction::List => {
            let networks = provider.list().map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{:<20} {:<15} {:<20}", "NAME", "DRIVER", "SUBNET");
            for network in &networks {
                println!(
                    "{:<20} {:<15} {:<20}",
                    network.name, network.driver, network.subnet
                );
            }
            Ok(())
        }
        NetworkAction::Remove { name } => provider
            .remove(&name)
            .map_err(|e| anyhow::anyhow!("{e}")),
    }
}
