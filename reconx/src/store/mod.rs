//! The artifact store: the sole data channel between stages.
//!
//! Stages never hand results to each other in memory; every task and
//! merge step persists a named artifact, and later stages read it back by
//! name. The store is a trait so tests can run against [`MemStore`]
//! without touching a filesystem, while real runs use [`FsStore`].

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemStore;

use crate::errors::ReconError;
use async_trait::async_trait;

/// A flat namespace of persisted artifacts.
///
/// Callers must never write the same name from two concurrent tasks;
/// the pipeline validator enforces this per stage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes an artifact, overwriting any previous content.
    async fn write(&self, name: &str, content: &str) -> Result<(), ReconError>;

    /// Reads an artifact's content.
    async fn read(&self, name: &str) -> Result<String, ReconError>;

    /// Lists artifact names in lexicographic order.
    async fn list(&self) -> Result<Vec<String>, ReconError>;

    /// Returns whether an artifact exists.
    async fn contains(&self, name: &str) -> Result<bool, ReconError>;
}

/// Checks that a name stays inside the store's flat namespace.
pub(crate) fn check_name(name: &str) -> Result<(), ReconError> {
    let flat = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if flat {
        Ok(())
    } else {
        Err(ReconError::artifact(
            name,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "artifact names must be flat file names",
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_name_accepts_flat_names() {
        assert!(check_name("subdomains.txt").is_ok());
        assert!(check_name("sub1.txt").is_ok());
    }

    #[test]
    fn test_check_name_rejects_paths() {
        assert!(check_name("").is_err());
        assert!(check_name("..").is_err());
        assert!(check_name("a/b.txt").is_err());
        assert!(check_name("a\\b.txt").is_err());
    }
}
