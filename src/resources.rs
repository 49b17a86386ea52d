//! Detection and model resource handles.
//!
//! Stages that depend on on-disk resources (face/eye region models, the
//! super-resolution model, the object-detection model) never open paths
//! themselves. They receive a [`DetectionResources`] acquired up front and
//! consult handle availability; a missing or unreadable resource means the
//! stage skips gracefully instead of failing the pipeline.
//!
//! Handles are acquired explicitly and dropped when the caller is done —
//! nothing is cached between entry-point calls. A caller that wants to reuse
//! acquisitions across a batch simply keeps the `DetectionResources` alive.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configured locations of the detection/model resources.
#[derive(Debug, Clone)]
pub struct ResourcePaths {
    pub face_model: PathBuf,
    pub eye_model: PathBuf,
    pub super_resolution_model: PathBuf,
    pub object_model: PathBuf,
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self {
            face_model: PathBuf::from("models/face_regions.bin"),
            eye_model: PathBuf::from("models/eye_regions.bin"),
            super_resolution_model: PathBuf::from("models/super_resolution.bin"),
            object_model: PathBuf::from("models/object_proposals.bin"),
        }
    }
}

/// A validated handle to one on-disk resource.
///
/// Acquisition succeeds only when the file exists, is readable, and is
/// non-empty. The handle keeps the path, not the contents; consumers read
/// what they need.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    path: PathBuf,
}

impl ResourceHandle {
    /// Try to acquire the resource at `path`. Returns `None` (not an error)
    /// when the resource is missing or unusable — the stage-skip contract.
    pub fn acquire(path: &Path) -> Option<Self> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => {
                debug!(path = %path.display(), "resource missing; dependent stage will skip");
                return None;
            }
        };
        if !metadata.is_file() || metadata.len() == 0 {
            debug!(path = %path.display(), "resource empty or not a file; dependent stage will skip");
            return None;
        }
        if File::open(path).is_err() {
            debug!(path = %path.display(), "resource unreadable; dependent stage will skip");
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// All resource handles one pipeline run may consult.
#[derive(Debug, Clone, Default)]
pub struct DetectionResources {
    pub face_model: Option<ResourceHandle>,
    pub eye_model: Option<ResourceHandle>,
    pub super_resolution_model: Option<ResourceHandle>,
    pub object_model: Option<ResourceHandle>,
}

impl DetectionResources {
    /// Acquire every resource from its configured path. Individual failures
    /// leave that handle `None`; this function itself never fails.
    pub fn acquire(paths: &ResourcePaths) -> Self {
        Self {
            face_model: ResourceHandle::acquire(&paths.face_model),
            eye_model: ResourceHandle::acquire(&paths.eye_model),
            super_resolution_model: ResourceHandle::acquire(&paths.super_resolution_model),
            object_model: ResourceHandle::acquire(&paths.object_model),
        }
    }

    /// A resource set with nothing available — every model-gated stage skips.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_missing_path_is_none() {
        assert!(ResourceHandle::acquire(Path::new("/nonexistent/model.bin")).is_none());
    }

    #[test]
    fn acquire_empty_file_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        assert!(ResourceHandle::acquire(&path).is_none());
    }

    #[test]
    fn acquire_real_file_succeeds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("model.bin");
        std::fs::write(&path, b"weights").unwrap();

        let handle = ResourceHandle::acquire(&path).unwrap();
        assert_eq!(handle.path(), path);
    }

    #[test]
    fn acquire_all_tolerates_partial_availability() {
        let tmp = tempfile::TempDir::new().unwrap();
        let face = tmp.path().join("face.bin");
        std::fs::write(&face, b"weights").unwrap();

        let paths = ResourcePaths {
            face_model: face,
            eye_model: tmp.path().join("missing-eye.bin"),
            super_resolution_model: tmp.path().join("missing-sr.bin"),
            object_model: tmp.path().join("missing-obj.bin"),
        };
        let resources = DetectionResources::acquire(&paths);
        assert!(resources.face_model.is_some());
        assert!(resources.eye_model.is_none());
        assert!(resources.super_resolution_model.is_none());
        assert!(resources.object_model.is_none());
    }

    #[test]
    fn unavailable_has_no_handles() {
        let resources = DetectionResources::unavailable();
        assert!(resources.face_model.is_none());
        assert!(resources.super_resolution_model.is_none());
    }
}
