//! Local staging of objects between download and upload.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// How object keys map onto local paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagingLayout {
    /// Root joined with the key's base name. Keys sharing a base name share
    /// a staging path.
    #[default]
    Flat,
    /// Root joined with the full key path.
    Mirrored,
}

/// A staged local file for one object.
///
/// Only [`Stager::release`] removes the file; dropping a `StagedFile` leaves
/// it on disk so a failed transfer can be inspected.
#[derive(Debug)]
pub struct StagedFile {
    key: String,
    path: PathBuf,
}

impl StagedFile {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates and removes staged files under a root directory.
#[derive(Debug, Clone)]
pub struct Stager {
    root: PathBuf,
    layout: StagingLayout,
}

impl Stager {
    pub fn new(root: impl Into<PathBuf>, layout: StagingLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a key.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let invalid = |reason: &str| SyncError::staging(key, &self.root, reason);

        match self.layout {
            StagingLayout::Flat => {
                let name = Path::new(key)
                    .file_name()
                    .filter(|_| !key.ends_with('/'))
                    .ok_or_else(|| invalid("key has no base name"))?;
                Ok(self.root.join(name))
            }
            StagingLayout::Mirrored => {
                let mut path = self.root.clone();
                let mut pushed = false;
                for component in Path::new(key).components() {
                    match component {
                        Component::Normal(part) => {
                            path.push(part);
                            pushed = true;
                        }
                        Component::CurDir | Component::RootDir => {}
                        Component::ParentDir | Component::Prefix(_) => {
                            return Err(invalid("key escapes the staging root"));
                        }
                    }
                }
                if !pushed || key.ends_with('/') {
                    return Err(invalid("key has no base name"));
                }
                Ok(path)
            }
        }
    }

    /// Prepare an empty local file for `key`, creating parent directories.
    pub async fn stage(&self, key: &str) -> Result<StagedFile> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            create_dirs(parent).await
                .map_err(|e| SyncError::staging(key, parent, e))?;
        }

        // Create or truncate; the handle is closed before returning
        tokio::fs::File::create(&path).await
            .map_err(|e| SyncError::staging(key, &path, e))?;

        debug!(key, path = %path.display(), "Staged local file");

        Ok(StagedFile {
            key: key.to_string(),
            path,
        })
    }

    /// Remove a staged file after a verified transfer.
    ///
    /// The object is already safe at the destination, so a failed removal
    /// only leaves a stray local file and is logged.
    pub async fn release(&self, staged: StagedFile) {
        match tokio::fs::remove_file(&staged.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                key = %staged.key,
                path = %staged.path.display(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}

#[cfg(unix)]
async fn create_dirs(path: &Path) -> std::io::Result<()> {
    tokio::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(path)
        .await
}

#[cfg(not(unix))]
async fn create_dirs(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
