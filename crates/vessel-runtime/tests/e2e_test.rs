//! End-to-end integration tests for the Vessel runtime.
//!
//! These tests drive the full pipeline through the public crate APIs:
//! 1. Container records (save/load/update/delete, name uniqueness)
//! 2. Workspace layout (image extraction, layer sharing, teardown)
//! 3. Lifecycle engine (state machine, rollback on missing image)
//! 4. Command payload encoding (argument fidelity)
//! 5. Cgroup limit application against a scratch hierarchy
//! 6. Namespace clone-flag selection
//!
//! Everything here runs unprivileged; mount syscalls are exercised by
//! unit tests that tolerate EPERM, not by this suite.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use vessel_common::config::RuntimeConfig;
use vessel_common::error::VesselError;
use vessel_common::types::{ContainerId, ContainerStatus, ResourceSpec};
use vessel_runtime::lifecycle::{Engine, RunOptions};
use vessel_runtime::registry::{ContainerRecord, Registry};
use vessel_runtime::workspace::{VolumeSpec, WorkspaceManager};

fn scratch_config(dir: &tempfile::TempDir) -> RuntimeConfig {
    let mut config = RuntimeConfig::rooted_at(dir.path());
    config.cgroup_root = dir.path().join("cgroup");
    config
}

fn record(name: &str, status: ContainerStatus, pid: Option<i32>) -> ContainerRecord {
    ContainerRecord {
        id: ContainerId::generate(),
        name: name.to_owned(),
        pid,
        command: vec!["top".into()],
        image: "busybox".into(),
        created_at: chrono::Utc::now().to_rfc3339(),
        status,
        volume: None,
        ports: Vec::new(),
    }
}

/// Packs a one-file busybox-shaped image archive into the images dir.
fn seed_image(config: &RuntimeConfig, image: &str) {
    let images = config.images_dir();
    std::fs::create_dir_all(&images).expect("mkdir images");

    let file = std::fs::File::create(images.join(format!("{image}.tar"))).expect("create tar");
    let mut builder = tar::Builder::new(file);
    let data = b"#!/bin/sh\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, "bin/sh", &data[..])
        .expect("append");
    builder.finish().expect("finish tar");
}

// ── Container Records ────────────────────────────────────────────────

#[test]
fn pipeline_record_roundtrip_and_uniqueness() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Registry::new(&scratch_config(&dir));

    let original = record("web", ContainerStatus::Running, Some(4321));
    registry.save(&original).expect("save");
    assert_eq!(registry.load("web").expect("load"), original);

    let duplicate = record("web", ContainerStatus::Running, Some(9999));
    assert!(matches!(
        registry.save(&duplicate),
        Err(VesselError::Validation { .. })
    ));
}

#[test]
fn pipeline_record_update_survives_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Registry::new(&scratch_config(&dir));
    registry
        .save(&record("web", ContainerStatus::Running, Some(4321)))
        .expect("save");

    let _ = registry
        .update("web", |r| {
            r.status = ContainerStatus::Stopped;
            r.pid = None;
        })
        .expect("update");

    let reloaded = registry.load("web").expect("reload");
    assert_eq!(reloaded.status, ContainerStatus::Stopped);
    assert_eq!(reloaded.pid, None);
}

#[test]
fn pipeline_record_listing_is_sorted_by_creation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Registry::new(&scratch_config(&dir));

    let mut first = record("older", ContainerStatus::Stopped, None);
    first.created_at = "2026-01-01T00:00:00Z".into();
    let mut second = record("newer", ContainerStatus::Stopped, None);
    second.created_at = "2026-06-01T00:00:00Z".into();

    registry.save(&second).expect("save newer");
    registry.save(&first).expect("save older");

    let names: Vec<String> = registry
        .list()
        .expect("list")
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["older".to_owned(), "newer".to_owned()]);
}

// ── Workspace Layout ─────────────────────────────────────────────────

#[test]
fn pipeline_image_extraction_populates_shared_lower_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = scratch_config(&dir);
    seed_image(&config, "busybox");

    let manager = WorkspaceManager::new(config.clone());
    // Overlay mounting needs privileges; extraction alone must not.
    let result = manager.create("c1", "busybox", None);

    let lower = config.lower_dir("busybox");
    assert!(lower.join("bin/sh").exists(), "archive extracted to lower");
    if result.is_ok() {
        manager.destroy("c1", None).expect("teardown");
    }
}

#[test]
fn pipeline_second_container_reuses_extracted_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = scratch_config(&dir);
    seed_image(&config, "busybox");

    let manager = WorkspaceManager::new(config.clone());
    let _ = manager.create("c1", "busybox", None);

    // Replace the archive with garbage; a second create must not re-read it.
    std::fs::write(config.images_dir().join("busybox.tar"), b"junk").expect("overwrite");
    let _ = manager.create("c2", "busybox", None);
    assert!(config.lower_dir("busybox").join("bin/sh").exists());
}

#[test]
fn pipeline_workspace_teardown_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = scratch_config(&dir);
    let manager = WorkspaceManager::new(config.clone());

    std::fs::create_dir_all(config.upper_dir("c1")).expect("upper");
    std::fs::create_dir_all(config.work_dir("c1")).expect("work");
    std::fs::create_dir_all(config.merged_dir("c1")).expect("merged");

    manager.destroy("c1", None).expect("first destroy");
    manager.destroy("c1", None).expect("second destroy");
    assert!(!config.merged_dir("c1").exists());
}

#[test]
fn pipeline_volume_spec_validation() {
    assert!(VolumeSpec::parse("/data:/mnt/data").is_ok());
    assert!(VolumeSpec::parse("no-colon").is_err());
    assert!(VolumeSpec::parse("relative:/mnt").is_err());
    assert!(VolumeSpec::parse("/data:relative").is_err());
}

// ── Lifecycle Engine ─────────────────────────────────────────────────

#[test]
fn pipeline_engine_rejects_conflicting_modes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::new(scratch_config(&dir));

    let err = engine
        .start(&RunOptions {
            image: "busybox".into(),
            command: vec!["sh".into()],
            tty: true,
            detach: true,
            ..RunOptions::default()
        })
        .expect_err("tty + detach");
    assert!(matches!(err, VesselError::Validation { .. }));
}

#[test]
fn pipeline_engine_start_fails_fast_on_missing_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::new(scratch_config(&dir));

    let err = engine
        .start(&RunOptions {
            image: "absent".into(),
            command: vec!["sh".into()],
            detach: true,
            ..RunOptions::default()
        })
        .expect_err("missing image");
    assert!(matches!(err, VesselError::NotFound { kind: "image", .. }));

    // Nothing half-started leaks into the registry.
    assert!(engine.list().expect("list").is_empty());
}

#[test]
fn pipeline_engine_enforces_stop_before_remove() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = scratch_config(&dir);
    let engine = Engine::new(config);

    let running = record(
        "svc",
        ContainerStatus::Running,
        Some(std::process::id().try_into().expect("pid")),
    );
    engine.registry().save(&running).expect("save");

    assert!(matches!(
        engine.remove("svc"),
        Err(VesselError::State { .. })
    ));

    // The rejected removal leaves the record untouched.
    let kept = engine.registry().load("svc").expect("load");
    assert_eq!(kept.status, ContainerStatus::Running);
}

#[test]
fn pipeline_engine_stop_then_remove_cleans_registry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::new(scratch_config(&dir));

    // A reaped child gives a pid that is definitely gone.
    let mut child = std::process::Command::new("true").spawn().expect("spawn");
    let dead_pid: i32 = child.id().try_into().expect("pid");
    let _ = child.wait().expect("wait");

    engine
        .registry()
        .save(&record("svc", ContainerStatus::Running, Some(dead_pid)))
        .expect("save");

    engine.stop("svc").expect("stop");
    engine.remove("svc").expect("remove");

    assert!(matches!(
        engine.remove("svc"),
        Err(VesselError::NotFound { .. })
    ));
    assert!(engine.list().expect("list").is_empty());
}

#[test]
fn pipeline_engine_lists_dead_container_as_exited() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::new(scratch_config(&dir));

    let mut child = std::process::Command::new("true").spawn().expect("spawn");
    let dead_pid: i32 = child.id().try_into().expect("pid");
    let _ = child.wait().expect("wait");

    engine
        .registry()
        .save(&record("ghostly", ContainerStatus::Running, Some(dead_pid)))
        .expect("save");

    let listed = engine.list().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ContainerStatus::Exited);
}

#[test]
fn pipeline_engine_logs_for_quiet_container_are_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = Engine::new(scratch_config(&dir));

    engine
        .registry()
        .save(&record("quiet", ContainerStatus::Stopped, None))
        .expect("save");
    assert_eq!(engine.logs("quiet").expect("logs"), "");

    assert!(matches!(
        engine.logs("unknown"),
        Err(VesselError::NotFound { .. })
    ));
}

#[test]
fn pipeline_engine_logs_return_container_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = scratch_config(&dir);
    let engine = Engine::new(config.clone());

    engine
        .registry()
        .save(&record("chatty", ContainerStatus::Stopped, None))
        .expect("save");
    std::fs::write(config.log_path("chatty"), "hello from the container\n").expect("write log");

    assert_eq!(
        engine.logs("chatty").expect("logs"),
        "hello from the container\n"
    );
}

// ── Command Payload ──────────────────────────────────────────────────

#[test]
fn pipeline_payload_survives_awkward_arguments() {
    let argv = vec![
        "sh".to_owned(),
        "-c".to_owned(),
        "echo \"hello world\" && sleep 1".to_owned(),
    ];
    let encoded = serde_json::to_string(&argv).expect("encode");
    let decoded = vessel_runtime::init::decode_payload(&encoded).expect("decode");
    assert_eq!(decoded, argv);
}

#[test]
fn pipeline_payload_rejects_unstructured_text() {
    assert!(vessel_runtime::init::decode_payload("sh -c 'echo hi'").is_err());
}

// ── Cgroup Limits ────────────────────────────────────────────────────

#[test]
fn pipeline_cgroup_limits_and_membership() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("cgroup");
    for subsystem in ["memory", "cpu", "cpuset"] {
        std::fs::create_dir_all(root.join(subsystem)).expect("mkdir subsystem");
    }

    let set = vessel_core::cgroup::CgroupSet::new(&root);
    let spec = ResourceSpec {
        memory: Some("100m".into()),
        cpu_shares: Some("512".into()),
        cpuset: None,
    };
    set.apply("cg-test", &spec, 4321).expect("apply");

    let memory_dir = root.join("memory/vessel/cg-test");
    assert_eq!(
        std::fs::read_to_string(memory_dir.join("memory.limit_in_bytes")).expect("limit"),
        "100m"
    );
    assert_eq!(
        std::fs::read_to_string(memory_dir.join("tasks")).expect("tasks"),
        "4321"
    );
    // Unset cpuset never materializes.
    assert!(!root.join("cpuset/vessel/cg-test").exists());

    set.remove("cg-test").expect("remove");
    assert!(!memory_dir.exists());
}

// ── Namespace Selection ──────────────────────────────────────────────

#[test]
fn pipeline_default_namespaces_cover_all_five() {
    use nix::sched::CloneFlags;

    let flags = vessel_core::namespace::NamespaceSet::default().clone_flags();
    for required in [
        CloneFlags::CLONE_NEWUTS,
        CloneFlags::CLONE_NEWPID,
        CloneFlags::CLONE_NEWNS,
        CloneFlags::CLONE_NEWNET,
        CloneFlags::CLONE_NEWIPC,
    ] {
        assert!(flags.contains(required), "missing {required:?}");
    }
}
