//! CPU subsystem: relative scheduling weight via `cpu.shares`.

use vessel_common::types::ResourceSpec;

use super::CgroupSubsystem;

/// CPU share-weight subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuShares;

impl CgroupSubsystem for CpuShares {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn limit_file(&self) -> &'static str {
        "cpu.shares"
    }

    fn limit_value<'s>(&self, spec: &'s ResourceSpec) -> Option<&'s str> {
        spec.cpu_shares.as_deref()
    }
}
