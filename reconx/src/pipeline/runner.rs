//! Sequential stage execution.
//!
//! Stages run strictly in declared order. Within a stage the task pool
//! fans tasks out under the concurrency bound; the stage's merge steps
//! run only after every task has joined. A stage whose tools all failed
//! still advances - its artifacts are just empty - and the run always
//! ends with report generation unless cancelled or the store breaks.

use super::spec::{MergeSpec, PipelineSpec};
use crate::cancel::CancelToken;
use crate::errors::ReconError;
use crate::events::{EventSink, NoOpEventSink};
use crate::exec::CommandRunner;
use crate::pool::{TaskPool, TaskResult};
use crate::report::{Report, ReportBuilder};
use crate::store::ArtifactStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrency bound for tasks within a stage.
    pub max_workers: usize,
    /// Wall-clock limit per task; `None` trusts tools to terminate.
    pub task_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            task_timeout: None,
        }
    }
}

/// The tasks joined by one stage.
#[derive(Debug, Clone)]
pub struct StageRun {
    /// The stage label.
    pub label: String,
    /// Per-task results in completion order.
    pub tasks: Vec<TaskResult>,
}

/// The outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Per-stage task results, in stage order.
    pub stages: Vec<StageRun>,
    /// The final report.
    pub report: Report,
    /// Total wall-clock time.
    pub elapsed: Duration,
}

/// Executes a validated pipeline against an artifact store.
///
/// All state lives in this value - no process-wide globals - so several
/// pipelines can run independently in one process.
pub struct Pipeline {
    spec: PipelineSpec,
    config: PipelineConfig,
    store: Arc<dyn ArtifactStore>,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancelToken>,
}

impl Pipeline {
    /// Creates a pipeline, validating the spec.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed spec.
    pub fn new(
        spec: PipelineSpec,
        config: PipelineConfig,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self, ReconError> {
        spec.validate()?;
        Ok(Self {
            spec,
            config,
            store,
            events: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancelToken::new()),
        })
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the token that cancels this pipeline's runs.
    #[must_use]
    pub fn cancel_token(&self) -> Arc<CancelToken> {
        self.cancel.clone()
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Runs every stage in order, then builds the report.
    ///
    /// # Errors
    ///
    /// Returns an error on store failure or cancellation; tool failures
    /// only degrade artifacts.
    pub async fn run(&self) -> Result<RunSummary, ReconError> {
        let start = Instant::now();
        let runner = CommandRunner::new(self.config.task_timeout, self.cancel.clone());
        let pool = TaskPool::new(self.store.clone(), runner, self.events.clone());

        let total = self.spec.stages.len();
        let mut stages = Vec::with_capacity(total);

        for (index, stage) in self.spec.stages.iter().enumerate() {
            self.check_cancelled()?;

            self.events
                .emit(
                    "stage.started",
                    Some(serde_json::json!({
                        "stage": stage.label,
                        "index": index + 1,
                        "of": total,
                    })),
                )
                .await;
            info!(stage = %stage.label, index = index + 1, of = total, "stage started");

            let stage_start = Instant::now();
            let tasks = pool
                .run_parallel(&stage.tasks, self.config.max_workers, &stage.label)
                .await?;

            // Merges only see fully-joined task artifacts.
            self.check_cancelled()?;
            for merge in &stage.merges {
                self.apply_merge(merge).await?;
            }

            self.events
                .emit(
                    "stage.completed",
                    Some(serde_json::json!({
                        "stage": stage.label,
                        "elapsed_ms": stage_start.elapsed().as_millis(),
                    })),
                )
                .await;

            stages.push(StageRun {
                label: stage.label.clone(),
                tasks,
            });
        }

        self.check_cancelled()?;
        let report = ReportBuilder::new(self.spec.name.as_str())
            .render_into(self.store.as_ref())
            .await?;

        let elapsed = start.elapsed();
        self.events
            .emit(
                "pipeline.completed",
                Some(serde_json::json!({"elapsed_ms": elapsed.as_millis()})),
            )
            .await;

        Ok(RunSummary {
            stages,
            report,
            elapsed,
        })
    }

    async fn apply_merge(&self, merge: &MergeSpec) -> Result<(), ReconError> {
        let mut inputs = Vec::with_capacity(merge.inputs.len());
        for name in &merge.inputs {
            inputs.push(self.store.read(name).await?);
        }
        let merged = merge.kind.apply(&inputs);
        self.store.write(&merge.artifact, &merged).await
    }

    fn check_cancelled(&self) -> Result<(), ReconError> {
        if self.cancel.is_cancelled() {
            let reason = self
                .cancel
                .reason()
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(ReconError::Cancelled(reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::exec::CommandSpec;
    use crate::pipeline::spec::{MergeSpec, StageSpec};
    use crate::pool::Task;
    use crate::store::MemStore;
    use pretty_assertions::assert_eq;

    fn echo(name: &str, line: &str, artifact: &str) -> Task {
        Task::new(name, CommandSpec::new("echo").arg(line)).capture(artifact)
    }

    #[tokio::test]
    async fn test_two_stage_run_flows_through_the_store() {
        // Stage 2 reads stage 1's merged artifact via stdin, proving the
        // store is the channel and the barrier held.
        let store = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("flow")
            .stage(
                StageSpec::new("discover")
                    .task(echo("one", "b.example.com", "sub1.txt"))
                    .task(echo("two", "a.example.com", "sub2.txt"))
                    .merge(MergeSpec::sort_unique("subdomains.txt", ["sub1.txt", "sub2.txt"])),
            )
            .stage(
                StageSpec::new("resolve").task(
                    Task::new("cat", CommandSpec::new("cat").stdin_artifact("subdomains.txt"))
                        .capture("resolved.txt"),
                ),
            );

        let pipeline =
            Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
        let summary = pipeline.run().await.expect("run");

        assert_eq!(summary.stages.len(), 2);
        assert_eq!(
            store.read("subdomains.txt").await.expect("merged"),
            "a.example.com\nb.example.com\n"
        );
        assert_eq!(
            store.read("resolved.txt").await.expect("resolved"),
            "a.example.com\nb.example.com\n"
        );
    }

    #[tokio::test]
    async fn test_stage_ordering_is_strict() {
        let store = Arc::new(MemStore::new());
        let sink = Arc::new(CollectingEventSink::new());

        let spec = PipelineSpec::new("ordered")
            .stage(StageSpec::new("first").task(echo("t", "1", "first.txt")))
            .stage(StageSpec::new("second").task(echo("t", "2", "second.txt")))
            .stage(StageSpec::new("third").task(echo("t", "3", "third.txt")));

        let pipeline = Pipeline::new(spec, PipelineConfig::default(), store)
            .expect("valid")
            .with_events(sink.clone());
        pipeline.run().await.expect("run");

        let starts: Vec<String> = sink
            .events()
            .into_iter()
            .filter(|(t, _)| t == "stage.started")
            .filter_map(|(_, data)| {
                data.and_then(|d| d.get("stage").and_then(|s| s.as_str().map(String::from)))
            })
            .collect();
        assert_eq!(starts, vec!["first", "second", "third"]);

        // Every stage.completed precedes the next stage.started.
        let types = sink.event_types();
        let relevant: Vec<&str> = types
            .iter()
            .map(String::as_str)
            .filter(|t| t.starts_with("stage."))
            .collect();
        assert_eq!(
            relevant,
            vec![
                "stage.started",
                "stage.completed",
                "stage.started",
                "stage.completed",
                "stage.started",
                "stage.completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_tool_still_reaches_report() {
        let store = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("degraded")
            .stage(
                StageSpec::new("broken").task(
                    Task::new("dead", CommandSpec::new("sh").args(["-c", "exit 1"]))
                        .capture("dead.txt"),
                ),
            )
            .stage(StageSpec::new("alive").task(echo("ok", "fine", "ok.txt")));

        let pipeline =
            Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
        let summary = pipeline.run().await.expect("run proceeds past failures");

        assert_eq!(store.read("dead.txt").await.expect("read"), "");
        assert!(summary.report.text.contains("===== dead.txt ====="));
        assert!(summary.report.text.contains("===== ok.txt =====\nfine"));
    }

    #[tokio::test]
    async fn test_empty_stage_completes_immediately() {
        let store = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("hollow")
            .stage(StageSpec::new("nothing"))
            .stage(StageSpec::new("something").task(echo("t", "x", "x.txt")));

        let pipeline =
            Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
        let summary = pipeline.run().await.expect("run");

        assert!(summary.stages[0].tasks.is_empty());
        assert_eq!(store.read("x.txt").await.expect("read"), "x\n");
    }

    #[tokio::test]
    async fn test_invalid_spec_rejected_at_construction() {
        let store: Arc<dyn ArtifactStore> = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("clash").stage(
            StageSpec::new("dup")
                .task(echo("a", "1", "same.txt"))
                .task(echo("b", "2", "same.txt")),
        );

        assert!(Pipeline::new(spec, PipelineConfig::default(), store).is_err());
    }

    #[tokio::test]
    async fn test_cancelled_pipeline_stops_between_stages() {
        let store = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("halted")
            .stage(StageSpec::new("first").task(echo("t", "1", "first.txt")));

        let pipeline = Pipeline::new(spec, PipelineConfig::default(), store).expect("valid");
        pipeline.cancel_token().cancel("operator interrupt");

        let err = pipeline.run().await.expect_err("cancelled run must error");
        assert!(matches!(err, ReconError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_report_written_into_store() {
        let store = Arc::new(MemStore::new());
        let spec =
            PipelineSpec::new("reported").stage(StageSpec::new("only").task(echo("t", "v", "v.txt")));

        let pipeline =
            Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
        pipeline.run().await.expect("run");

        assert!(store
            .contains(crate::report::TEXT_ARTIFACT)
            .await
            .expect("contains"));
        assert!(store
            .contains(crate::report::HTML_ARTIFACT)
            .await
            .expect("contains"));
    }

    #[tokio::test]
    async fn test_merge_runs_after_all_tasks_join() {
        // Both tasks must have written before the merge reads; a stale
        // read would drop one of the lines.
        let store = Arc::new(MemStore::new());
        let spec = PipelineSpec::new("joined").stage(
            StageSpec::new("fanout")
                .task(Task::new(
                    "slow",
                    CommandSpec::new("sh").args(["-c", "sleep 0.1; echo slow"]),
                )
                .capture("slow.txt"))
                .task(echo("fast", "fast", "fast.txt"))
                .merge(MergeSpec::sort_unique("both.txt", ["slow.txt", "fast.txt"])),
        );

        let pipeline =
            Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
        pipeline.run().await.expect("run");

        assert_eq!(store.read("both.txt").await.expect("read"), "fast\nslow\n");
    }
}
