//! # Reconx
//!
//! A staged reconnaissance pipeline orchestrator.
//!
//! Reconx models a recon workflow as an ordered chain of stages. Each
//! stage fans independent external tool invocations across a bounded
//! worker pool, joins on all of them, and merges their outputs into
//! named artifacts; later stages consume those artifacts, and a final
//! report aggregates the whole store. The design is deliberately
//! fail-soft: a broken or missing tool produces an empty artifact and
//! the run carries on.
//!
//! - **Stage-based execution**: strict stage order, bounded fan-out within
//!   a stage
//! - **Artifact store**: a flat directory (or in-memory map in tests) as
//!   the only channel between stages
//! - **Fail-soft tools, fatal store**: tool failures degrade output;
//!   store failures abort the run
//! - **Cooperative cancellation**: an optional per-task timeout and a
//!   shared cancel token kill hung tools instead of stalling the run
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use reconx::prelude::*;
//!
//! let store = Arc::new(FsStore::open("output")?);
//! let pipeline = Pipeline::new(
//!     recon_pipeline(Path::new("output")),
//!     PipelineConfig::default(),
//!     store,
//! )?;
//! let summary = pipeline.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bootstrap;
pub mod cancel;
pub mod errors;
pub mod events;
pub mod exec;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod report;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bootstrap::{ensure_present, DependencySpec, ToolCatalog, ToolSpec};
    pub use crate::cancel::CancelToken;
    pub use crate::errors::{ReconError, ValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::exec::{CommandRunner, CommandSpec};
    pub use crate::pipeline::{
        recon_pipeline, MergeKind, MergeSpec, Pipeline, PipelineConfig, PipelineSpec, RunSummary,
        StageRun, StageSpec, SCOPE_ARTIFACT,
    };
    pub use crate::pool::{Task, TaskOutput, TaskPool, TaskResult};
    pub use crate::progress::ConsoleProgress;
    pub use crate::report::{Report, ReportBuilder, HTML_ARTIFACT, TEXT_ARTIFACT};
    pub use crate::store::{ArtifactStore, FsStore, MemStore};
}
