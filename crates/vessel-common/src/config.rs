//! Runtime configuration: on-disk layout and cgroup hierarchy root.
//!
//! Every runtime component takes a [`RuntimeConfig`] so tests can point
//! the whole engine at a temporary directory instead of system paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// Resolved paths used by the Vessel runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base directory for all Vessel state and data.
    pub data_dir: PathBuf,
    /// Root of the cgroup hierarchy (per-subsystem subdirectories).
    pub cgroup_root: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: constants::data_dir().clone(),
            cgroup_root: PathBuf::from(constants::CGROUP_ROOT),
        }
    }
}

impl RuntimeConfig {
    /// Creates a configuration rooted at the given data directory.
    #[must_use]
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cgroup_root: PathBuf::from(constants::CGROUP_ROOT),
        }
    }

    /// Directory holding one subdirectory per container (record + log).
    #[must_use]
    pub fn containers_dir(&self) -> PathBuf {
        self.data_dir.join("containers")
    }

    /// Per-container state directory.
    #[must_use]
    pub fn container_dir(&self, name: &str) -> PathBuf {
        self.containers_dir().join(name)
    }

    /// Path of a container's persisted record.
    #[must_use]
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.container_dir(name).join(constants::RECORD_FILE)
    }

    /// Path of a detached container's log file.
    #[must_use]
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.container_dir(name).join(constants::LOG_FILE)
    }

    /// Directory holding image archives (`<name>.tar`).
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Shared read-only lower layer for an image.
    #[must_use]
    pub fn lower_dir(&self, image: &str) -> PathBuf {
        self.data_dir.join("overlay").join("lower").join(image)
    }

    /// Writable upper layer exclusively owned by one container.
    #[must_use]
    pub fn upper_dir(&self, container: &str) -> PathBuf {
        self.data_dir.join("overlay").join("upper").join(container)
    }

    /// OverlayFS work directory for one container.
    #[must_use]
    pub fn work_dir(&self, container: &str) -> PathBuf {
        self.data_dir.join("overlay").join("work").join(container)
    }

    /// Union mount point exposed as the container's root.
    #[must_use]
    pub fn merged_dir(&self, container: &str) -> PathBuf {
        self.data_dir.join("overlay").join("merged").join(container)
    }

    /// Returns the base data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
