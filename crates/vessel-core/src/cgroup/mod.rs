//! Per-subsystem cgroup resource management.
//!
//! Each limit lives in its own subsystem hierarchy
//! (`<root>/<subsystem>/vessel/<container-id>/`). Subsystems are modelled
//! as [`CgroupSubsystem`] implementations invoked from a registered list,
//! so adding one never touches the apply/remove call sites.

pub mod cpu;
pub mod cpuset;
pub mod memory;

use std::path::PathBuf;

use vessel_common::constants::CGROUP_PREFIX;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::ResourceSpec;

/// One controllable cgroup subsystem.
pub trait CgroupSubsystem: Send + Sync {
    /// Subsystem directory name under the hierarchy root.
    fn name(&self) -> &'static str;

    /// Control file the limit value is written to.
    fn limit_file(&self) -> &'static str;

    /// Selects this subsystem's limit out of a [`ResourceSpec`].
    ///
    /// `None` means unlimited: no cgroup directory is created at all.
    fn limit_value<'s>(&self, spec: &'s ResourceSpec) -> Option<&'s str>;
}

/// Returns the full registered subsystem list.
#[must_use]
pub fn subsystems() -> Vec<Box<dyn CgroupSubsystem>> {
    vec![
        Box::new(memory::Memory),
        Box::new(cpu::CpuShares),
        Box::new(cpuset::CpuSet),
    ]
}

/// Applies and removes resource limits for container ids.
pub struct CgroupSet {
    root: PathBuf,
    subsystems: Vec<Box<dyn CgroupSubsystem>>,
}

impl CgroupSet {
    /// Creates a controller over the hierarchy rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subsystems: subsystems(),
        }
    }

    /// Directory for one (subsystem, container) pair.
    fn subsystem_dir(&self, subsystem: &str, container_id: &str) -> PathBuf {
        self.root.join(subsystem).join(CGROUP_PREFIX).join(container_id)
    }

    /// Applies the non-empty limits of `spec` and registers `pid`.
    ///
    /// Subsystems with no limit are skipped entirely. Failures are
    /// per-subsystem independent: every subsystem is attempted and the
    /// collected failures are reported together.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::Resource`] aggregating every subsystem that
    /// could not be configured.
    pub fn apply(&self, container_id: &str, spec: &ResourceSpec, pid: i32) -> Result<()> {
        let mut failures = Vec::new();

        for subsystem in &self.subsystems {
            let Some(value) = subsystem.limit_value(spec) else {
                continue;
            };
            if let Err(e) = self.apply_one(subsystem.as_ref(), container_id, value, pid) {
                tracing::warn!(subsystem = subsystem.name(), error = %e, "cgroup apply failed");
                failures.push(format!("{}: {e}", subsystem.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(VesselError::Resource { failures })
        }
    }

    fn apply_one(
        &self,
        subsystem: &dyn CgroupSubsystem,
        container_id: &str,
        value: &str,
        pid: i32,
    ) -> Result<()> {
        let dir = self.subsystem_dir(subsystem.name(), container_id);
        std::fs::create_dir_all(&dir).map_err(|e| VesselError::io(&dir, e))?;

        let limit_path = dir.join(subsystem.limit_file());
        std::fs::write(&limit_path, value).map_err(|e| VesselError::io(&limit_path, e))?;

        let tasks_path = dir.join("tasks");
        std::fs::write(&tasks_path, pid.to_string())
            .map_err(|e| VesselError::io(&tasks_path, e))?;

        tracing::debug!(
            subsystem = subsystem.name(),
            container_id,
            value,
            pid,
            "cgroup limit applied"
        );
        Ok(())
    }

    /// Removes every per-subsystem directory for `container_id`.
    ///
    /// Idempotent: subsystems whose directory was never created or was
    /// already removed are silently skipped.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::Resource`] aggregating subsystems whose
    /// existing directory could not be removed.
    pub fn remove(&self, container_id: &str) -> Result<()> {
        let mut failures = Vec::new();

        for subsystem in &self.subsystems {
            let dir = self.subsystem_dir(subsystem.name(), container_id);
            if !dir.exists() {
                continue;
            }
            // On cgroupfs rmdir succeeds with control files still listed;
            // plain filesystems (tests) need the recursive fallback.
            let removed = std::fs::remove_dir(&dir).or_else(|_| std::fs::remove_dir_all(&dir));
            if let Err(e) = removed {
                tracing::warn!(subsystem = subsystem.name(), error = %e, "cgroup remove failed");
                failures.push(format!("{}: {e}", subsystem.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(VesselError::Resource { failures })
        }
    }

    /// Returns whether a subsystem directory currently exists for the id.
    #[must_use]
    pub fn exists(&self, subsystem: &str, container_id: &str) -> bool {
        self.subsystem_dir(subsystem, container_id).exists()
    }
}
