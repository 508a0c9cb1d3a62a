//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Vessel data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/vessel";

/// Returns the data directory, preferring `$HOME/.vessel` for non-root
/// environments, falling back to `/var/lib/vessel`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".vessel");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Root of the cgroup v1 hierarchy (one subdirectory per subsystem).
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Subdirectory created under each cgroup subsystem for Vessel containers.
pub const CGROUP_PREFIX: &str = "vessel";

/// File name of the persisted container record.
pub const RECORD_FILE: &str = "config.json";

/// File name of a detached container's log.
pub const LOG_FILE: &str = "container.log";

/// Descriptor index at which the child inherits the launch payload pipe.
///
/// Fixed by convention: 0-2 are stdio, the pipe's read end is dup'd to 3
/// before exec and read to EOF by the init sequence.
pub const PAYLOAD_FD: i32 = 3;

/// Temporary directory used to park the old root during `pivot_root(2)`.
pub const PIVOT_DIR: &str = ".pivot_root";

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "vessel";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "vessel";
