//! Layered container workspaces.
//!
//! A workspace is the union of a shared read-only lower layer (the
//! extracted image), a per-container writable upper layer, and the merged
//! mount point exposed as the container's root, plus an optional host
//! volume bound inside the merged view.

use std::path::{Path, PathBuf};

use vessel_common::config::RuntimeConfig;
use vessel_common::error::{Result, VesselError};
use vessel_core::filesystem::overlay::{self, OverlayConfig};
use vessel_core::filesystem::{bind, unmount_if_mounted};

/// A parsed `hostPath:containerPath` volume specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Absolute host directory bound into the container.
    pub host: PathBuf,
    /// Absolute path inside the container it appears at.
    pub container: PathBuf,
}

impl VolumeSpec {
    /// Parses a `hostPath:containerPath` string.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the spec is exactly two
    /// non-empty absolute paths separated by one colon.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || VesselError::Validation {
            message: format!("invalid volume spec (want /host/path:/container/path): {spec}"),
        };

        let (host, container) = spec.split_once(':').ok_or_else(invalid)?;
        let host = Path::new(host);
        let container = Path::new(container);
        if !host.is_absolute() || !container.is_absolute() || container.parent().is_none() {
            return Err(invalid());
        }
        Ok(Self {
            host: host.to_path_buf(),
            container: container.to_path_buf(),
        })
    }

    /// The volume's mount point inside a merged view.
    #[must_use]
    pub fn mount_point(&self, merged: &Path) -> PathBuf {
        // `container` is absolute; re-root it under the merged dir.
        let relative = self.container.components().skip(1).collect::<PathBuf>();
        merged.join(relative)
    }
}

/// Builds and tears down container root filesystems.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    config: RuntimeConfig,
}

impl WorkspaceManager {
    /// Creates a manager over the configured data layout.
    #[must_use]
    pub const fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Prepares the workspace for `container`: shared lower layer from
    /// `image`, exclusive upper layer, merged overlay mount, and the
    /// optional volume bind.
    ///
    /// Returns the merged mount point.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is missing, extraction fails, or a
    /// mount syscall fails. Partially created state is left for
    /// [`Self::destroy`], which is idempotent.
    pub fn create(
        &self,
        container: &str,
        image: &str,
        volume: Option<&VolumeSpec>,
    ) -> Result<PathBuf> {
        let lower = self.ensure_lower_layer(image)?;

        let overlay_config = OverlayConfig {
            lower_dir: lower,
            upper_dir: self.config.upper_dir(container),
            work_dir: self.config.work_dir(container),
            merged_dir: self.config.merged_dir(container),
        };
        overlay::mount_overlay(&overlay_config)?;

        if let Some(volume) = volume {
            bind::bind_mount(&volume.host, &volume.mount_point(&overlay_config.merged_dir))?;
        }

        tracing::info!(container, image, "workspace created");
        Ok(overlay_config.merged_dir)
    }

    /// Tears down the workspace: volume bind first, then the merged view,
    /// then the writable and mount-point directories.
    ///
    /// The unmount order is load-bearing: the merged view must outlive
    /// the volume bind nested inside it. The shared lower layer is never
    /// deleted. Idempotent: a second call on the same name succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if an unmount genuinely fails or a directory
    /// cannot be deleted.
    pub fn destroy(&self, container: &str, volume: Option<&VolumeSpec>) -> Result<()> {
        let merged = self.config.merged_dir(container);

        if let Some(volume) = volume {
            unmount_if_mounted(&volume.mount_point(&merged))?;
        }
        overlay::unmount_overlay(&merged)?;

        for dir in [
            self.config.upper_dir(container),
            self.config.work_dir(container),
            merged,
        ] {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| VesselError::io(&dir, e))?;
            }
        }

        tracing::info!(container, "workspace destroyed");
        Ok(())
    }

    /// Archives the container's merged tree into a gzip-compressed tar
    /// at `dest`. Independent of run state.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged directory is missing or archiving
    /// fails.
    pub fn export(&self, container: &str, dest: &Path) -> Result<()> {
        let merged = self.config.merged_dir(container);
        if !merged.exists() {
            return Err(VesselError::NotFound {
                kind: "workspace",
                id: container.to_owned(),
            });
        }

        let file = std::fs::File::create(dest).map_err(|e| VesselError::io(dest, e))?;
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_dir_all(".", &merged)
            .map_err(|e| VesselError::io(&merged, e))?;
        let encoder = builder.into_inner().map_err(|e| VesselError::io(dest, e))?;
        let _ = encoder.finish().map_err(|e| VesselError::io(dest, e))?;

        tracing::info!(container, dest = %dest.display(), "workspace exported");
        Ok(())
    }

    /// Extracts the image archive into the shared lower layer unless a
    /// previous container already did.
    fn ensure_lower_layer(&self, image: &str) -> Result<PathBuf> {
        let lower = self.config.lower_dir(image);
        if lower.exists() {
            tracing::debug!(image, "reusing extracted lower layer");
            return Ok(lower);
        }

        let archive = self.find_image_archive(image)?;
        std::fs::create_dir_all(&lower).map_err(|e| VesselError::io(&lower, e))?;

        let file = std::fs::File::open(&archive).map_err(|e| VesselError::io(&archive, e))?;
        let unpacked = if is_gzip_archive(&archive) {
            tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(&lower)
        } else {
            tar::Archive::new(file).unpack(&lower)
        };
        unpacked.map_err(|e| VesselError::io(&lower, e))?;

        tracing::info!(image, lower = %lower.display(), "image extracted");
        Ok(lower)
    }

    fn find_image_archive(&self, image: &str) -> Result<PathBuf> {
        let images = self.config.images_dir();
        for candidate in [
            images.join(format!("{image}.tar")),
            images.join(format!("{image}.tar.gz")),
        ] {
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(VesselError::NotFound {
            kind: "image",
            id: image.to_owned(),
        })
    }
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_spec_parses_two_absolute_paths() {
        let spec = VolumeSpec::parse("/data:/mnt/data").expect("parse");
        assert_eq!(spec.host, PathBuf::from("/data"));
        assert_eq!(spec.container, PathBuf::from("/mnt/data"));
    }

    #[test]
    fn volume_spec_rejects_missing_colon() {
        assert!(matches!(
            VolumeSpec::parse("/data"),
            Err(VesselError::Validation { .. })
        ));
    }

    #[test]
    fn volume_spec_rejects_relative_paths() {
        assert!(VolumeSpec::parse("data:/mnt/data").is_err());
        assert!(VolumeSpec::parse("/data:mnt").is_err());
        assert!(VolumeSpec::parse("/data:").is_err());
    }

    #[test]
    fn mount_point_reroots_the_container_path() {
        let spec = VolumeSpec::parse("/data:/mnt/data").expect("parse");
        assert_eq!(
            spec.mount_point(Path::new("/var/lib/vessel/overlay/merged/web")),
            PathBuf::from("/var/lib/vessel/overlay/merged/web/mnt/data")
        );
    }

    #[test]
    fn create_with_missing_image_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = WorkspaceManager::new(RuntimeConfig::rooted_at(dir.path()));

        let err = manager.create("c1", "nope", None).expect_err("missing image");
        assert!(matches!(err, VesselError::NotFound { kind: "image", .. }));
    }

    #[test]
    fn destroy_is_idempotent_without_mounts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig::rooted_at(dir.path());
        let manager = WorkspaceManager::new(config.clone());

        std::fs::create_dir_all(config.upper_dir("c1")).expect("mkdir upper");
        std::fs::create_dir_all(config.work_dir("c1")).expect("mkdir work");
        std::fs::create_dir_all(config.merged_dir("c1")).expect("mkdir merged");

        manager.destroy("c1", None).expect("first destroy");
        assert!(!config.upper_dir("c1").exists());
        assert!(!config.merged_dir("c1").exists());

        manager.destroy("c1", None).expect("second destroy");
    }

    #[test]
    fn destroy_leaves_the_lower_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig::rooted_at(dir.path());
        let manager = WorkspaceManager::new(config.clone());

        std::fs::create_dir_all(config.lower_dir("busybox")).expect("mkdir lower");
        std::fs::create_dir_all(config.merged_dir("c1")).expect("mkdir merged");

        manager.destroy("c1", None).expect("destroy");
        assert!(config.lower_dir("busybox").exists());
    }

    #[test]
    fn export_archives_the_merged_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig::rooted_at(dir.path());
        let manager = WorkspaceManager::new(config.clone());

        let merged = config.merged_dir("c1");
        std::fs::create_dir_all(merged.join("etc")).expect("mkdir");
        std::fs::write(merged.join("etc/hostname"), "c1\n").expect("write");

        let dest = dir.path().join("c1.tar.gz");
        manager.export("c1", &dest).expect("export");

        let file = std::fs::File::open(&dest).expect("open");
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        let names: Vec<String> = archive
            .entries()
            .expect("entries")
            .map(|e| {
                e.expect("entry")
                    .path()
                    .expect("path")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert!(names.iter().any(|n| n.contains("etc/hostname")));
    }

    #[test]
    fn export_of_unknown_container_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = WorkspaceManager::new(RuntimeConfig::rooted_at(dir.path()));
        assert!(matches!(
            manager.export("ghost", &dir.path().join("out.tar.gz")),
            Err(VesselError::NotFound { .. })
        ));
    }

    #[test]
    fn lower_layer_extraction_reuses_existing_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig::rooted_at(dir.path());
        let manager = WorkspaceManager::new(config.clone());

        let lower = config.lower_dir("busybox");
        std::fs::create_dir_all(&lower).expect("mkdir");
        std::fs::write(lower.join("marker"), "kept").expect("write");

        let resolved = manager.ensure_lower_layer("busybox").expect("reuse");
        assert_eq!(resolved, lower);
        assert!(lower.join("marker").exists());
    }
}
