//! Container lifecycle orchestration.
//!
//! Composes the workspace manager, launcher, cgroup controller, and
//! registry into the `run`/`stop`/`rm`/`exec` operations and enforces
//! the state machine: `Running → Stopped → removed`, with `Exited` for
//! processes that disappeared on their own.

use std::path::Path;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use vessel_common::config::RuntimeConfig;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ContainerId, ContainerStatus, ResourceSpec};
use vessel_core::cgroup::CgroupSet;
use vessel_core::namespace::NamespaceSet;

use crate::attach;
use crate::launcher::{self, LaunchSpec, LaunchedChild};
use crate::registry::{ContainerRecord, Registry};
use crate::workspace::{VolumeSpec, WorkspaceManager};

/// Grace period after SIGTERM before escalating.
const TERM_GRACE: Duration = Duration::from_secs(2);
/// Grace period after SIGKILL before giving up waiting.
const KILL_GRACE: Duration = Duration::from_secs(1);
/// Liveness poll interval while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// User-facing options of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Container name; derived from the id when not given.
    pub name: Option<String>,
    /// Image the rootfs is built from.
    pub image: String,
    /// Command executed inside the container.
    pub command: Vec<String>,
    /// Interactive mode: attach the caller's terminal and wait.
    pub tty: bool,
    /// Detached mode: return immediately, log to file.
    pub detach: bool,
    /// Cgroup limits.
    pub resources: ResourceSpec,
    /// Volume spec (`hostPath:containerPath`).
    pub volume: Option<String>,
    /// Extra `KEY=VALUE` environment entries.
    pub env: Vec<String>,
    /// Network name, recorded for the network provider.
    pub network: Option<String>,
    /// Port mappings, recorded for the network provider.
    pub ports: Vec<String>,
}

/// The lifecycle engine.
pub struct Engine {
    config: RuntimeConfig,
    registry: Registry,
    workspace: WorkspaceManager,
    cgroups: CgroupSet,
}

impl Engine {
    /// Creates an engine over the given runtime configuration.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        let registry = Registry::new(&config);
        let workspace = WorkspaceManager::new(config.clone());
        let cgroups = CgroupSet::new(config.cgroup_root.clone());
        Self {
            config,
            registry,
            workspace,
            cgroups,
        }
    }

    /// Creates an engine with the default system configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RuntimeConfig::default())
    }

    /// Starts a new container.
    ///
    /// Sequence: workspace → launch → cgroup limits → command payload →
    /// registry record. Workspace failure aborts the start (fail-fast);
    /// any failure after the spawn rolls the container back: the child
    /// is killed and workspace and cgroups are torn down.
    ///
    /// Interactive runs wait for the child and clean up afterwards;
    /// detached runs return with the record left `Running`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for conflicting options, `NotFound`
    /// for a missing image, or the first unrecoverable launch failure.
    pub fn start(&self, opts: &RunOptions) -> Result<()> {
        if opts.tty && opts.detach {
            return Err(VesselError::Validation {
                message: "tty and detach cannot both be set".into(),
            });
        }
        if opts.command.is_empty() {
            return Err(VesselError::Validation {
                message: "missing container command".into(),
            });
        }

        let id = ContainerId::generate();
        let name = opts.name.clone().unwrap_or_else(|| derive_name(&id));
        if self.registry.load(&name).is_ok() {
            return Err(VesselError::Validation {
                message: format!("container name already in use: {name}"),
            });
        }
        let volume = opts
            .volume
            .as_deref()
            .map(VolumeSpec::parse)
            .transpose()?;

        let merged = self.workspace.create(&name, &opts.image, volume.as_ref())?;

        match self.start_process(&id, &name, &merged, volume.as_ref(), opts) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Roll back whatever the failed attempt left behind.
                if let Err(cleanup) = self.workspace.destroy(&name, volume.as_ref()) {
                    tracing::warn!(name, error = %cleanup, "rollback: workspace teardown failed");
                }
                Err(e)
            }
        }
    }

    fn start_process(
        &self,
        id: &ContainerId,
        name: &str,
        merged: &Path,
        volume: Option<&VolumeSpec>,
        opts: &RunOptions,
    ) -> Result<()> {
        let log_path = self.config.log_path(name);
        let child = launcher::launch(&LaunchSpec {
            container: name,
            tty: opts.tty,
            merged_dir: merged,
            log_path: &log_path,
            env: &opts.env,
            namespaces: NamespaceSet::default(),
        })?;

        let LaunchedChild { pid, payload } = child;

        self.cgroups
            .apply(id.as_str(), &opts.resources, pid)
            .inspect_err(|_| self.abort_child(id, pid))?;

        payload.send(&opts.command).inspect_err(|_| {
            self.abort_child(id, pid);
        })?;

        self.registry
            .save(&ContainerRecord {
                id: id.clone(),
                name: name.to_owned(),
                pid: Some(pid),
                command: opts.command.clone(),
                image: opts.image.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
                status: ContainerStatus::Running,
                volume: opts.volume.clone(),
                ports: opts.ports.clone(),
            })
            .inspect_err(|_| self.abort_child(id, pid))?;

        tracing::info!(name, pid, "container running");

        if opts.tty {
            self.wait_foreground(name, pid, id, volume);
        }
        Ok(())
    }

    /// Kills a half-started child and reaps it; cgroups are removed so a
    /// retry starts clean.
    fn abort_child(&self, id: &ContainerId, pid: i32) {
        let pid = Pid::from_raw(pid);
        let _ = kill(pid, Signal::SIGKILL);
        let _ = nix::sys::wait::waitpid(pid, None);
        if let Err(e) = self.cgroups.remove(id.as_str()) {
            tracing::warn!(id = %id, error = %e, "rollback: cgroup removal failed");
        }
    }

    /// Foreground mode: wait for the child, then tear everything down.
    fn wait_foreground(&self, name: &str, pid: i32, id: &ContainerId, volume: Option<&VolumeSpec>) {
        let _ = nix::sys::wait::waitpid(Pid::from_raw(pid), None);
        tracing::info!(name, "foreground container exited");

        if let Err(e) = self.cgroups.remove(id.as_str()) {
            tracing::warn!(name, error = %e, "cgroup removal failed");
        }
        if let Err(e) = self.workspace.destroy(name, volume) {
            tracing::warn!(name, error = %e, "workspace teardown failed");
        }
        if let Err(e) = self.registry.delete(name) {
            tracing::warn!(name, error = %e, "record deletion failed");
        }
    }

    /// Stops a running container with a bounded-wait signal escalation.
    ///
    /// SIGTERM, poll liveness for up to two seconds, then SIGKILL and
    /// poll for one more. A process that survives both is logged and the
    /// record is still marked stopped. A record without a pid is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name, or a persistence error.
    pub fn stop(&self, name: &str) -> Result<()> {
        let record = self.registry.load(name)?;
        let Some(raw_pid) = record.pid else {
            tracing::info!(name, "container has no pid; nothing to stop");
            return Ok(());
        };

        let pid = Pid::from_raw(raw_pid);
        match kill(pid, Signal::SIGTERM) {
            Ok(()) => {
                if !wait_for_exit(pid, TERM_GRACE) {
                    tracing::info!(name, pid = raw_pid, "escalating to SIGKILL");
                    let _ = kill(pid, Signal::SIGKILL);
                    if !wait_for_exit(pid, KILL_GRACE) {
                        tracing::warn!(name, pid = raw_pid, "process survived SIGKILL");
                    }
                }
            }
            Err(Errno::ESRCH) => {
                tracing::debug!(name, pid = raw_pid, "process already gone");
            }
            Err(e) => return Err(VesselError::kernel("kill", e as i32)),
        }

        let _ = self.registry.update(name, |r| {
            r.status = ContainerStatus::Stopped;
            r.pid = None;
        })?;
        tracing::info!(name, "container stopped");
        Ok(())
    }

    /// Removes a stopped container: workspace, cgroups, then the record.
    ///
    /// # Errors
    ///
    /// Returns a state error unless the stored status is `Stopped`, and
    /// `NotFound` for an unknown name (including a repeat removal).
    pub fn remove(&self, name: &str) -> Result<()> {
        let record = self.registry.load(name)?;
        if record.status != ContainerStatus::Stopped {
            return Err(VesselError::State {
                message: format!(
                    "cannot remove {} container {name}; stop it first",
                    record.status
                ),
            });
        }

        let volume = record
            .volume
            .as_deref()
            .map(VolumeSpec::parse)
            .transpose()?;
        self.workspace.destroy(name, volume.as_ref())?;
        self.cgroups.remove(record.id.as_str())?;
        self.registry.delete(name)?;
        tracing::info!(name, "container removed");
        Ok(())
    }

    /// Runs a command inside a running container's namespaces.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name or a state error when the
    /// container is not running.
    pub fn exec(&self, name: &str, argv: &[String]) -> Result<i32> {
        let record = self.registry.load(name)?;
        let pid = record.pid.ok_or_else(|| VesselError::State {
            message: format!("container {name} is not running"),
        })?;
        attach::attach_and_run(pid, argv)
    }

    /// Lists all container records.
    ///
    /// Records marked running whose pid no longer answers a zero-signal
    /// probe are reported as exited.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the registry cannot be read.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        let mut records = self.registry.list()?;
        for record in &mut records {
            if record.status == ContainerStatus::Running {
                let alive = record
                    .pid
                    .is_some_and(|p| process_alive(Pid::from_raw(p)));
                if !alive {
                    record.status = ContainerStatus::Exited;
                }
            }
        }
        Ok(records)
    }

    /// Returns the contents of a container's log file.
    ///
    /// A container that has not produced output yet yields an empty
    /// string.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown container or an I/O error.
    pub fn logs(&self, name: &str) -> Result<String> {
        let _ = self.registry.load(name)?;
        let path = self.config.log_path(name);
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|e| VesselError::io(&path, e))
    }

    /// Exports a container's merged rootfs as a compressed archive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown container or an archive failure.
    pub fn export(&self, name: &str, dest: &Path) -> Result<()> {
        let _ = self.registry.load(name)?;
        self.workspace.export(name, dest)
    }

    /// Access to the registry, mainly for inspection tooling.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Polls the process with signal 0 until it exits or `grace` elapses.
fn wait_for_exit(pid: Pid, grace: Duration) -> bool {
    let deadline = std::time::Instant::now() + grace;
    while std::time::Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    !process_alive(pid)
}

/// Zero-signal liveness probe.
fn process_alive(pid: Pid) -> bool {
    kill(pid, None).is_ok()
}

/// Default name for anonymous containers: the id's first segment.
fn derive_name(id: &ContainerId) -> String {
    id.as_str().chars().take(12).collect()
}
