//! Filesystem-backed artifact store.

use super::{check_name, ArtifactStore};
use crate::errors::ReconError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A store backed by a single flat directory.
///
/// The directory is created idempotently on open. No subdirectories, no
/// versioning, no locking.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ReconError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the directory backing the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path of an artifact name.
    ///
    /// Tools that take an input file on their command line are pointed at
    /// this path.
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn write(&self, name: &str, content: &str) -> Result<(), ReconError> {
        check_name(name)?;
        tokio::fs::write(self.path_of(name), content)
            .await
            .map_err(|err| ReconError::artifact(name, err))
    }

    async fn read(&self, name: &str) -> Result<String, ReconError> {
        check_name(name)?;
        tokio::fs::read_to_string(self.path_of(name))
            .await
            .map_err(|err| ReconError::artifact(name, err))
    }

    async fn list(&self) -> Result<Vec<String>, ReconError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn contains(&self, name: &str) -> Result<bool, ReconError> {
        check_name(name)?;
        Ok(tokio::fs::try_exists(self.path_of(name))
            .await
            .map_err(|err| ReconError::artifact(name, err))?)
    }
}
