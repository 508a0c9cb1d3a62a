//! Domain primitive types used across the Vessel workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-supplied resource limit strings.
///
/// Each field is written verbatim to the corresponding cgroup control file;
/// no numeric validation happens at this layer. `None` means unlimited and
/// causes no cgroup directory to be created for that subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Memory limit (e.g. `100m`, `1073741824`).
    pub memory: Option<String>,
    /// Relative CPU share weight.
    pub cpu_shares: Option<String>,
    /// CPU set (e.g. `0-1`, `0,3`).
    pub cpuset: Option<String>,
}

impl ResourceSpec {
    /// Returns `true` when no limit is set on any subsystem.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.memory.is_none() && self.cpu_shares.is_none() && self.cpuset.is_none()
    }
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerStatus {
    /// Container is actively running.
    Running,
    /// Container has been stopped via `stop`.
    Stopped,
    /// Container's init process is gone without a `stop`.
    Exited,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_generate_is_unique() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn resource_spec_default_is_unlimited() {
        assert!(ResourceSpec::default().is_unlimited());
    }

    #[test]
    fn resource_spec_with_memory_is_limited() {
        let spec = ResourceSpec {
            memory: Some("100m".into()),
            ..ResourceSpec::default()
        };
        assert!(!spec.is_unlimited());
    }

    #[test]
    fn status_display_strings() {
        assert_eq!(ContainerStatus::Running.to_string(), "running");
        assert_eq!(ContainerStatus::Stopped.to_string(), "stopped");
        assert_eq!(ContainerStatus::Exited.to_string(), "exited");
    }
}
