//! Memory subsystem: hard limit via `memory.limit_in_bytes`.

use vessel_common::types::ResourceSpec;

use super::CgroupSubsystem;

/// Memory hard-limit subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct Memory;

impl CgroupSubsystem for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn limit_file(&self) -> &'static str {
        "memory.limit_in_bytes"
    }

    fn limit_value<'s>(&self, spec: &'s ResourceSpec) -> Option<&'s str> {
        spec.memory.as_deref()
    }
}
