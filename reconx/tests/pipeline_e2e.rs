//! End-to-end pipeline runs against a real filesystem store.

use pretty_assertions::assert_eq;
use reconx::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn echo(name: &str, line: &str, artifact: &str) -> Task {
    Task::new(name, CommandSpec::new("echo").arg(line)).capture(artifact)
}

/// A miniature recon-shaped pipeline: parallel discovery, merge,
/// a dependent stage reading the merged artifact, one broken tool.
fn mini_pipeline() -> PipelineSpec {
    PipelineSpec::new("Mini Recon")
        .stage(
            StageSpec::new("Discovery")
                .task(echo("one", "b.example.com", "sub1.txt"))
                .task(echo("two", "a.example.com", "sub2.txt"))
                .task(
                    Task::new("broken", CommandSpec::new("sh").args(["-c", "exit 9"]))
                        .capture("sub3.txt"),
                )
                .merge(MergeSpec::sort_unique(
                    "subdomains.txt",
                    ["sub1.txt", "sub2.txt", "sub3.txt"],
                )),
        )
        .stage(
            StageSpec::new("Resolution").task(
                Task::new("resolve", CommandSpec::new("cat").stdin_artifact("subdomains.txt"))
                    .capture("resolved.txt"),
            ),
        )
}

#[tokio::test]
async fn full_run_produces_artifacts_and_reports() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsStore::open(dir.path()).expect("open store"));

    let pipeline = Pipeline::new(mini_pipeline(), PipelineConfig::default(), store.clone())
        .expect("valid pipeline");
    let summary = pipeline.run().await.expect("run");

    assert_eq!(summary.stages.len(), 2);
    assert_eq!(summary.stages[0].tasks.len(), 3);

    // The broken tool degraded to an empty artifact, nothing aborted.
    assert_eq!(store.read("sub3.txt").await.expect("read"), "");
    assert_eq!(
        store.read("subdomains.txt").await.expect("read"),
        "a.example.com\nb.example.com\n"
    );
    assert_eq!(
        store.read("resolved.txt").await.expect("read"),
        "a.example.com\nb.example.com\n"
    );

    // Both report artifacts exist on disk.
    assert!(dir.path().join(TEXT_ARTIFACT).is_file());
    assert!(dir.path().join(HTML_ARTIFACT).is_file());

    // Text report transcribes artifacts in lexicographic order.
    let text = store.read(TEXT_ARTIFACT).await.expect("report");
    let positions: Vec<usize> = ["resolved.txt", "sub1.txt", "sub2.txt", "sub3.txt", "subdomains.txt"]
        .iter()
        .map(|name| {
            text.find(&format!("===== {name} ====="))
                .unwrap_or_else(|| panic!("missing section for {name}"))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn rerunning_over_the_same_store_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsStore::open(dir.path()).expect("open store"));

    let pipeline = Pipeline::new(mini_pipeline(), PipelineConfig::default(), store.clone())
        .expect("valid pipeline");

    let first = pipeline.run().await.expect("first run");
    let second = pipeline.run().await.expect("second run");

    // Deterministic commands, deterministic merges, reports excluded
    // from their own aggregation: byte-identical output.
    assert_eq!(first.report.text, second.report.text);
    assert_eq!(first.report.html, second.report.html);
}

#[tokio::test]
async fn independent_pipelines_share_one_process() {
    let dir_a = tempfile::tempdir().expect("tempdir");
    let dir_b = tempfile::tempdir().expect("tempdir");
    let store_a = Arc::new(FsStore::open(dir_a.path()).expect("open store"));
    let store_b = Arc::new(FsStore::open(dir_b.path()).expect("open store"));

    let spec_a = PipelineSpec::new("Run A")
        .stage(StageSpec::new("only").task(echo("t", "alpha", "a.txt")));
    let spec_b = PipelineSpec::new("Run B")
        .stage(StageSpec::new("only").task(echo("t", "beta", "a.txt")));

    let pipeline_a =
        Pipeline::new(spec_a, PipelineConfig::default(), store_a.clone()).expect("valid");
    let pipeline_b =
        Pipeline::new(spec_b, PipelineConfig::default(), store_b.clone()).expect("valid");

    let (res_a, res_b) = tokio::join!(pipeline_a.run(), pipeline_b.run());
    res_a.expect("run a");
    res_b.expect("run b");

    assert_eq!(store_a.read("a.txt").await.expect("read"), "alpha\n");
    assert_eq!(store_b.read("a.txt").await.expect("read"), "beta\n");
}

#[tokio::test]
async fn seeded_scope_flows_into_the_first_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsStore::open(dir.path()).expect("open store"));
    store
        .write(SCOPE_ARTIFACT, "example.com\n")
        .await
        .expect("seed scope");

    let spec = PipelineSpec::new("Scoped").input(SCOPE_ARTIFACT).stage(
        StageSpec::new("Discovery").task(
            Task::new("subs", CommandSpec::new("cat").stdin_artifact(SCOPE_ARTIFACT))
                .capture("sub1.txt"),
        ),
    );

    let pipeline =
        Pipeline::new(spec, PipelineConfig::default(), store.clone()).expect("valid");
    pipeline.run().await.expect("run");

    assert_eq!(store.read("sub1.txt").await.expect("read"), "example.com\n");
}

#[tokio::test]
async fn builtin_recon_pipeline_is_well_formed() {
    // The full catalog validates against an arbitrary output root.
    recon_pipeline(Path::new("output"))
        .validate()
        .expect("catalog must validate");
}
