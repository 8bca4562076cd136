//! Per-request scratch directories
//!
//! Every grading run gets its own directory, named after the submission id
//! plus a random suffix, so concurrent runs never share a source or artifact
//! path. The directory and everything in it is removed when the
//! [`Workspace`] is dropped, whichever way the run ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::constants::WORKSPACE_PREFIX;
use crate::error::{GraderError, GraderResult};

/// Scoped working directory owned by exactly one grading run
#[derive(Debug)]
pub struct Workspace {
    submission_id: Uuid,
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh directory under `root`
    pub fn create(root: &Path, submission_id: Uuid) -> GraderResult<Self> {
        std::fs::create_dir_all(root).map_err(|source| GraderError::Workspace {
            path: root.to_path_buf(),
            source,
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", WORKSPACE_PREFIX, submission_id))
            .tempdir_in(root)
            .map_err(|source| GraderError::Workspace {
                path: root.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            submission_id = %submission_id,
            workspace = %dir.path().display(),
            "Created workspace"
        );

        Ok(Self { submission_id, dir })
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory now, logging instead of failing on error
    pub fn close(self) {
        let submission_id = self.submission_id;
        let path = self.dir.path().to_path_buf();

        match self.dir.close() {
            Ok(()) => tracing::debug!(
                submission_id = %submission_id,
                workspace = %path.display(),
                "Removed workspace"
            ),
            Err(e) => tracing::warn!(
                submission_id = %submission_id,
                workspace = %path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();

        let a = Workspace::create(root.path(), id).unwrap();
        let b = Workspace::create(root.path(), id).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));

        let name = a.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("gradebox-{}", id)));
    }

    #[test]
    fn test_close_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path(), Uuid::new_v4()).unwrap();
        std::fs::write(workspace.file("main.c"), "int main(){}").unwrap();

        let path = workspace.path().to_path_buf();
        workspace.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let workspace = Workspace::create(root.path(), Uuid::new_v4()).unwrap();
            std::fs::write(workspace.file("main"), b"\x7fELF").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let workspace = Workspace::create(&nested, Uuid::new_v4()).unwrap();
        assert!(workspace.path().starts_with(&nested));
    }
}
