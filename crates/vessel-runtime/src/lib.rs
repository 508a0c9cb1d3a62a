//! Container lifecycle management for the Vessel engine.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod attach;
pub mod init;
pub mod launcher;
pub mod lifecycle;
pub mod network;
pub mod registry;
pub mod workspace;
