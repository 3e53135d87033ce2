//! Bounded-concurrency execution of a batch of independent tasks.
//!
//! The pool fans a stage's tasks across at most `max_workers` concurrent
//! commands and joins on all of them before returning. Results are
//! collected in completion order, never submission order; every submitted
//! task yields exactly one result. Command failures are invisible here -
//! the executor is fail-soft - but artifact store failures abort the run.

use crate::errors::ReconError;
use crate::events::EventSink;
use crate::exec::{CommandRunner, CommandSpec};
use crate::store::ArtifactStore;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// Where a task's output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutput {
    /// Captured stdout is written to the named artifact.
    Capture(String),
    /// The tool writes the named artifact itself; the pool backfills an
    /// empty artifact if the tool failed to produce one.
    External(String),
    /// Output is discarded.
    Discard,
}

/// A single external tool invocation within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Name unique within the stage.
    pub name: String,
    /// The command to run.
    pub command: CommandSpec,
    /// Output destination.
    pub output: TaskOutput,
}

impl Task {
    /// Creates a task whose output is discarded.
    #[must_use]
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            output: TaskOutput::Discard,
        }
    }

    /// Captures the task's stdout to the named artifact.
    #[must_use]
    pub fn capture(mut self, artifact: impl Into<String>) -> Self {
        self.output = TaskOutput::Capture(artifact.into());
        self
    }

    /// Declares an artifact the tool writes on its own.
    #[must_use]
    pub fn external(mut self, artifact: impl Into<String>) -> Self {
        self.output = TaskOutput::External(artifact.into());
        self
    }

    /// Returns the artifact this task produces, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<&str> {
        match &self.output {
            TaskOutput::Capture(name) | TaskOutput::External(name) => Some(name),
            TaskOutput::Discard => None,
        }
    }
}

/// The record of one completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task name.
    pub name: String,
    /// Wall-clock duration of the command.
    pub elapsed: Duration,
}

/// Executes batches of tasks under a concurrency bound.
pub struct TaskPool {
    store: Arc<dyn ArtifactStore>,
    runner: CommandRunner,
    events: Arc<dyn EventSink>,
}

impl TaskPool {
    /// Creates a pool.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        runner: CommandRunner,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            runner,
            events,
        }
    }

    /// Runs every task and joins on all of them.
    ///
    /// An empty batch returns immediately. `max_workers` larger than the
    /// batch simply runs everything concurrently; `1` serializes.
    ///
    /// # Errors
    ///
    /// Returns an error only for artifact store failures; tool failures
    /// degrade the artifact instead.
    pub async fn run_parallel(
        &self,
        tasks: &[Task],
        max_workers: usize,
        label: &str,
    ) -> Result<Vec<TaskResult>, ReconError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        self.events
            .emit(
                "pool.started",
                Some(serde_json::json!({"label": label, "total": total})),
            )
            .await;

        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut in_flight = FuturesUnordered::new();

        for task in tasks.iter().cloned() {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let runner = self.runner.clone();

            in_flight.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                Self::run_task(&store, &runner, task).await
            }));
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = in_flight.next().await {
            let result = joined
                .map_err(|err| ReconError::Internal(format!("task join error: {err}")))??;

            self.events.try_emit(
                "pool.task_completed",
                Some(serde_json::json!({
                    "label": label,
                    "task": result.name,
                    "elapsed_ms": result.elapsed.as_millis(),
                    "finished": results.len() + 1,
                    "total": total,
                })),
            );
            results.push(result);
        }

        self.events
            .emit(
                "pool.completed",
                Some(serde_json::json!({"label": label, "total": total})),
            )
            .await;

        Ok(results)
    }

    /// Runs one task: resolve stdin, execute, persist output.
    async fn run_task(
        store: &Arc<dyn ArtifactStore>,
        runner: &CommandRunner,
        task: Task,
    ) -> Result<TaskResult, ReconError> {
        let start = Instant::now();

        let stdin = match &task.command.stdin_artifact {
            Some(name) => Some(store.read(name).await?),
            None => None,
        };

        let output = runner.run(&task.command, stdin.as_deref()).await;

        match &task.output {
            TaskOutput::Capture(name) => store.write(name, &output).await?,
            TaskOutput::External(name) => {
                if !store.contains(name).await? {
                    store.write(name, "").await?;
                }
            }
            TaskOutput::Discard => {}
        }

        let elapsed = start.elapsed();
        debug!(task = %task.name, elapsed_ms = elapsed.as_millis(), "task finished");

        Ok(TaskResult {
            name: task.name,
            elapsed,
        })
    }
}
