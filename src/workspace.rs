//! Per-conversion temporary workspace
//!
//! Layout:
//!
//! ```text
//! {root}/lottie-frames-XXXXXX/
//!     frames/frame_00000.png ...
//!     output.mp4
//! ```

use crate::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DIR_PREFIX: &str = "lottie-frames-";
const FRAMES_DIR: &str = "frames";
const OUTPUT_FILE: &str = "output.mp4";

/// A uniquely-named directory tree owned by exactly one conversion.
///
/// The tree is removed by [`Workspace::release`] or, failing that, when the
/// workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    frames_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace (and its `frames/` subdirectory) under `root`.
    pub fn acquire(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)
            .map_err(|e| {
                Error::WorkspaceError(format!(
                    "failed to create temp dir in {}: {}",
                    root.display(),
                    e
                ))
            })?;

        let path = dir.path().to_path_buf();
        let frames_dir = path.join(FRAMES_DIR);
        // On failure `dir` is dropped here and takes the half-built tree with it
        std::fs::create_dir(&frames_dir).map_err(|e| {
            Error::WorkspaceError(format!("failed to create {}: {}", frames_dir.display(), e))
        })?;

        debug!("acquired workspace {}", path.display());
        Ok(Self {
            dir: Some(dir),
            root: path,
            frames_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Where the encoder writes the video
    pub fn output_path(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE)
    }

    /// Recursively remove the workspace. Idempotent; missing paths are not
    /// an error and other removal failures are only logged.
    pub fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => debug!("released workspace {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove workspace {}: {}", self.root.display(), e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn acquire_creates_frames_dir() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();

        assert!(ws.frames_dir().is_dir());
        assert_eq!(ws.frames_dir().parent(), Some(ws.path()));
        assert_eq!(ws.output_path(), ws.path().join("output.mp4"));

        let name = ws.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("lottie-frames-"), "unexpected name {}", name);
    }

    #[test]
    fn workspaces_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(root.path()).unwrap();
        let b = Workspace::acquire(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(entries(root.path()), 2);
    }

    #[test]
    fn release_removes_tree_and_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut ws = Workspace::acquire(root.path()).unwrap();
        std::fs::write(ws.frames_dir().join("frame_00000.png"), b"png").unwrap();
        std::fs::write(ws.output_path(), b"mp4").unwrap();

        ws.release();
        assert_eq!(entries(root.path()), 0);

        ws.release();
        drop(ws);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn release_tolerates_missing_tree() {
        let root = tempfile::tempdir().unwrap();
        let mut ws = Workspace::acquire(root.path()).unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();

        ws.release();
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn drop_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        {
            let _ws = Workspace::acquire(root.path()).unwrap();
            assert_eq!(entries(root.path()), 1);
        }
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn acquire_fails_for_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        let err = Workspace::acquire(&missing).unwrap_err();
        assert!(matches!(err, Error::WorkspaceError(_)));
    }
}
