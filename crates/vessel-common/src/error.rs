//! Unified error types for the Vessel workspace.
//!
//! The variants mirror the failure classes of the engine: CLI validation,
//! kernel operations inside the init sequence, aggregated cgroup subsystem
//! failures, illegal lifecycle transitions, and registry persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum VesselError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A user-supplied argument or option is invalid.
    #[error("invalid argument: {message}")]
    Validation {
        /// Description of the invalid input.
        message: String,
    },

    /// A mount, pivot, namespace, or exec operation failed.
    ///
    /// Always fatal inside the container init sequence: the isolated
    /// process exits non-zero before any user code runs.
    #[error("kernel operation {op} failed: {source}")]
    Kernel {
        /// Name of the failed operation (e.g. `mount`, `pivot_root`).
        op: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// One or more cgroup subsystems failed to apply or remove limits.
    ///
    /// Subsystem failures are independent; every subsystem is attempted
    /// and the individual failures are collected here.
    #[error("cgroup subsystem failures: {}", failures.join("; "))]
    Resource {
        /// One entry per failed subsystem.
        failures: Vec<String>,
    },

    /// An operation was attempted in an illegal lifecycle state.
    #[error("invalid container state: {message}")]
    State {
        /// Description of the rejected transition.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization of persisted state failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, VesselError>;

impl VesselError {
    /// Wraps an I/O error with the path it occurred at.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a kernel-operation error from an OS errno.
    #[must_use]
    pub fn kernel(op: &'static str, errno: i32) -> Self {
        Self::Kernel {
            op,
            source: std::io::Error::from_raw_os_error(errno),
        }
    }
}
