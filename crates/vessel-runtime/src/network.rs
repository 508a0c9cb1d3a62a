//! Bridge-network collaborator interface.
//!
//! The network data path (bridge creation, IP allocation, port NAT) is
//! an external subsystem; the engine only depends on this contract. Run
//! options `--net` and `-p` are recorded in the container record
//! untouched for the provider to consume.

use vessel_common::error::{Result, VesselError};

/// A known container network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Network name.
    pub name: String,
    /// Driver that backs it (e.g. `bridge`).
    pub driver: String,
    /// Subnet in CIDR notation.
    pub subnet: String,
}

/// Contract the engine expects from the network subsystem.
///
/// Each operation is independently initializable: a provider must not
/// require `create` before `list` works.
pub trait NetworkProvider {
    /// Creates a network `name` using `driver` over `subnet`.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be created.
    fn create(&self, driver: &str, subnet: &str, name: &str) -> Result<()>;

    /// Lists all known networks.
    ///
    /// # Errors
    ///
    /// Returns an error if the network state cannot be read.
    fn list(&self) -> Result<Vec<NetworkInfo>>;

    /// Removes the network `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the network does not exist or cannot be removed.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Placeholder provider for builds without a network subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableNetwork;

impl UnavailableNetwork {
    fn unavailable() -> VesselError {
        VesselError::Validation {
            message: "no network driver is available in this build".into(),
        }
    }
}

impl NetworkProvider for UnavailableNetwork {
    fn create(&self, _driver: &str, _subnet: &str, _name: &str) -> Result<()> {
        Err(Self::unavailable())
    }

    fn list(&self) -> Result<Vec<NetworkInfo>> {
        Err(Self::unavailable())
    }

    fn remove(&self, _name: &str) -> Result<()> {
        Err(Self::unavailable())
    }
}
