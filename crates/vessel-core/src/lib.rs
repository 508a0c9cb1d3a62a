//! # vessel-core
//!
//! Low-level Linux isolation primitives for the Vessel engine.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: UTS, PID, mount, network, and IPC isolation flags
//!   plus `setns(2)` joining for attach.
//! - **Cgroups**: per-subsystem memory, cpu-share, and cpuset limiting.
//! - **Filesystem**: `OverlayFS` union mounts and bind mounts.
//! - **Sandbox**: the syscall capability trait behind which the container
//!   init sequence runs, with a host implementation and a recording fake
//!   for privilege-free unit testing.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
pub mod sandbox;
