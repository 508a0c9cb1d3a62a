//! Cpuset subsystem: CPU pinning via `cpuset.cpus`.

use vessel_common::types::ResourceSpec;

use super::CgroupSubsystem;

/// CPU-set pinning subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuSet;

impl CgroupSubsystem for CpuSet {
    fn name(&self) -> &'static str {
        "cpuset"
    }

    fn limit_file(&self) -> &'static str {
        "cpuset.cpus"
    }

    fn limit_value<'s>(&self, spec: &'s ResourceSpec) -> Option<&'s str> {
        spec.cpuset.as_deref()
    }
}
