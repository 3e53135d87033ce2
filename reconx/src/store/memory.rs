//! In-memory artifact store for tests.

use super::{check_name, ArtifactStore};
use crate::errors::ReconError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A store backed by an in-memory map.
///
/// Behaves like [`super::FsStore`] for the pipeline's purposes: flat
/// namespace, overwrite on re-produce, lexicographic listing.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemStore {
    async fn write(&self, name: &str, content: &str) -> Result<(), ReconError> {
        check_name(name)?;
        self.entries
            .write()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<String, ReconError> {
        check_name(name)?;
        self.entries.read().get(name).cloned().ok_or_else(|| {
            ReconError::artifact(
                name,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such artifact"),
            )
        })
    }

    async fn list(&self) -> Result<Vec<String>, ReconError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn contains(&self, name: &str) -> Result<bool, ReconError> {
        check_name(name)?;
        Ok(self.entries.read().contains_key(name))
    }
}
