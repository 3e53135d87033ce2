//! Pipeline specification and execution.
//!
//! This module provides:
//! - Stage, merge, and pipeline specs with up-front validation
//! - The sequential orchestrator with its per-run configuration
//! - The built-in reconnaissance pipeline definition

mod recon;
mod runner;
mod spec;

pub use recon::{recon_pipeline, SCOPE_ARTIFACT};
pub use runner::{Pipeline, PipelineConfig, RunSummary, StageRun};
pub use spec::{MergeKind, MergeSpec, PipelineSpec, StageSpec};
