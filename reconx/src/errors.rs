//! Error types for the reconx pipeline.
//!
//! Failures of external tools are deliberately *not* represented here: a
//! broken tool degrades its artifact instead of raising (fail-soft). The
//! taxonomy below covers the failures that must abort a run — an invalid
//! pipeline definition, a broken artifact store, or cancellation.

use thiserror::Error;

/// The main error type for reconx operations.
#[derive(Debug, Error)]
pub enum ReconError {
    /// The pipeline definition failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// An artifact could not be read or written.
    ///
    /// The artifact store is the sole channel between stages, so this is
    /// always fatal to the run.
    #[error("artifact '{name}': {source}")]
    Artifact {
        /// The artifact name involved.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The tool catalog could not be loaded or parsed.
    #[error("tool catalog '{path}': {message}")]
    Catalog {
        /// Path of the catalog file.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The run was cancelled.
    #[error("run cancelled: {0}")]
    Cancelled(String),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error outside the artifact store (e.g. creating the output dir).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    /// Creates an artifact error for the given name.
    pub fn artifact(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Artifact {
            name: name.into(),
            source,
        }
    }

    /// Creates a catalog error for the given path.
    pub fn catalog(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Catalog {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Error raised when a pipeline definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The stage involved, if any.
    pub stage: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage: None,
        }
    }

    /// Attaches the offending stage label.
    #[must_use]
    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}
