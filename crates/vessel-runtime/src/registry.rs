//! Persistent per-container metadata records.
//!
//! One JSON record per container lives at
//! `<data>/containers/<name>/config.json`; the container name is the
//! unique key. Mutations are whole-record: writes go through a temp file
//! plus rename, and read-modify-write cycles hold an advisory lock on the
//! container's directory so concurrent lifecycle commands cannot
//! interleave a lost update.

use std::fs::File;
use std::path::PathBuf;

use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use vessel_common::config::RuntimeConfig;
use vessel_common::constants::RECORD_FILE;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ContainerId, ContainerStatus};

/// Persisted record of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name, unique among all records.
    pub name: String,
    /// PID of the init process; `None` when not running.
    pub pid: Option<i32>,
    /// Command executed inside the container.
    pub command: Vec<String>,
    /// Image the workspace was built from.
    pub image: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Current lifecycle status.
    pub status: ContainerStatus,
    /// Volume spec (`hostPath:containerPath`), if any.
    pub volume: Option<String>,
    /// Port-mapping specs, recorded untouched for the network layer.
    pub ports: Vec<String>,
}

/// File-backed container registry keyed by name.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Registry {
    /// Creates a registry over the configured containers directory.
    #[must_use]
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            root: config.containers_dir(),
        }
    }

    fn container_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.container_dir(name).join(RECORD_FILE)
    }

    /// Persists a new record; the name must not already be in use.
    ///
    /// # Errors
    ///
    /// Returns a validation error on a duplicate name, or an I/O or
    /// serialization error if the record cannot be written.
    pub fn save(&self, record: &ContainerRecord) -> Result<()> {
        let path = self.record_path(&record.name);
        if path.exists() {
            return Err(VesselError::Validation {
                message: format!("container name already in use: {}", record.name),
            });
        }
        let dir = self.container_dir(&record.name);
        std::fs::create_dir_all(&dir).map_err(|e| VesselError::io(&dir, e))?;
        self.write_record(record)?;
        tracing::debug!(name = %record.name, id = %record.id, "record saved");
        Ok(())
    }

    /// Loads the record stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists, or an I/O or
    /// serialization error if it cannot be read.
    pub fn load(&self, name: &str) -> Result<ContainerRecord> {
        let path = self.record_path(name);
        let data = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VesselError::NotFound {
                    kind: "container",
                    id: name.to_owned(),
                }
            } else {
                VesselError::io(&path, e)
            }
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Applies `f` to the stored record under an exclusive lock and
    /// persists the result atomically.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists, or an I/O or
    /// serialization error.
    pub fn update(
        &self,
        name: &str,
        f: impl FnOnce(&mut ContainerRecord),
    ) -> Result<ContainerRecord> {
        // Existence check first: taking the lock would otherwise create
        // an empty container directory for a name that was never saved.
        if !self.record_path(name).exists() {
            return Err(VesselError::NotFound {
                kind: "container",
                id: name.to_owned(),
            });
        }
        let _lock = self.lock(name)?;
        let mut record = self.load(name)?;
        f(&mut record);
        self.write_record(&record)?;
        Ok(record)
    }

    /// Lists every stored record.
    ///
    /// Unreadable entries are skipped with a warning so one corrupt
    /// record cannot hide the rest.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the containers directory cannot be read.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| VesselError::io(&self.root, e))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.load(&name) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(name, error = %e, "skipping unreadable record"),
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    /// Deletes the record directory (record, lock file, and log).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists, or an I/O error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.container_dir(name);
        if !self.record_path(name).exists() {
            return Err(VesselError::NotFound {
                kind: "container",
                id: name.to_owned(),
            });
        }
        std::fs::remove_dir_all(&dir).map_err(|e| VesselError::io(&dir, e))?;
        tracing::debug!(name, "record deleted");
        Ok(())
    }

    /// Whole-record atomic write: temp file in the same directory, then rename.
    fn write_record(&self, record: &ContainerRecord) -> Result<()> {
        let path = self.record_path(&record.name);
        let tmp = self.container_dir(&record.name).join(".config.json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, data).map_err(|e| VesselError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| VesselError::io(&path, e))?;
        Ok(())
    }

    /// Takes an exclusive advisory lock scoped to one container name.
    ///
    /// The container directory must already exist; only saved names are
    /// ever locked.
    fn lock(&self, name: &str) -> Result<Flock<File>> {
        let lock_path = self.container_dir(name).join(".lock");
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| VesselError::io(&lock_path, e))?;
        Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, e)| VesselError::kernel("flock", e as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig::rooted_at(dir.path());
        (dir, Registry::new(&config))
    }

    fn record(name: &str) -> ContainerRecord {
        ContainerRecord {
            id: ContainerId::generate(),
            name: name.to_owned(),
            pid: Some(4321),
            command: vec!["echo".into(), "hello world".into()],
            image: "busybox".into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            status: ContainerStatus::Running,
            volume: Some("/data:/mnt/data".into()),
            ports: vec!["8080:80".into()],
        }
    }

    #[test]
    fn save_then_load_roundtrips_every_field() {
        let (_dir, registry) = registry();
        let original = record("web");
        registry.save(&original).expect("save");

        let loaded = registry.load("web").expect("load");
        assert_eq!(loaded, original);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let (_dir, registry) = registry();
        registry.save(&record("web")).expect("first save");

        let err = registry.save(&record("web")).expect_err("duplicate");
        assert!(matches!(err, VesselError::Validation { .. }));
    }

    #[test]
    fn load_of_unknown_name_is_not_found() {
        let (_dir, registry) = registry();
        let err = registry.load("ghost").expect_err("missing");
        assert!(matches!(
            err,
            VesselError::NotFound { kind: "container", .. }
        ));
    }

    #[test]
    fn update_persists_the_mutation() {
        let (_dir, registry) = registry();
        registry.save(&record("web")).expect("save");

        let updated = registry
            .update("web", |r| {
                r.status = ContainerStatus::Stopped;
                r.pid = None;
            })
            .expect("update");
        assert_eq!(updated.status, ContainerStatus::Stopped);

        let loaded = registry.load("web").expect("load");
        assert_eq!(loaded.status, ContainerStatus::Stopped);
        assert_eq!(loaded.pid, None);
    }

    #[test]
    fn update_of_unknown_name_leaves_no_trace() {
        let (_dir, registry) = registry();

        let err = registry
            .update("ghost", |r| r.pid = None)
            .expect_err("missing");
        assert!(matches!(err, VesselError::NotFound { .. }));

        // No stray container directory may appear for the unknown name,
        // and listing must stay clean.
        assert!(!registry.container_dir("ghost").exists());
        assert!(registry.list().expect("list").is_empty());
    }

    #[test]
    fn delete_removes_the_record() {
        let (_dir, registry) = registry();
        registry.save(&record("web")).expect("save");
        registry.delete("web").expect("delete");

        assert!(matches!(
            registry.load("web"),
            Err(VesselError::NotFound { .. })
        ));
        assert!(matches!(
            registry.delete("web"),
            Err(VesselError::NotFound { .. })
        ));
    }

    #[test]
    fn list_returns_all_records() {
        let (_dir, registry) = registry();
        registry.save(&record("a")).expect("save a");
        registry.save(&record("b")).expect("save b");

        let names: Vec<String> = registry
            .list()
            .expect("list")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_owned()));
        assert!(names.contains(&"b".to_owned()));
    }

    #[test]
    fn list_on_fresh_registry_is_empty() {
        let (_dir, registry) = registry();
        assert!(registry.list().expect("list").is_empty());
    }
}
