//! The reconx command-line interface.

use anyhow::Context;
use clap::Parser;
use reconx::bootstrap::{ensure_present, ToolCatalog};
use reconx::pipeline::{recon_pipeline, Pipeline, PipelineConfig, SCOPE_ARTIFACT};
use reconx::progress::ConsoleProgress;
use reconx::store::{ArtifactStore, FsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Staged reconnaissance pipeline orchestrator.
#[derive(Parser, Debug)]
#[command(name = "reconx", version, about)]
struct Cli {
    /// File with the target scope, one domain per line.
    #[arg(short, long, default_value = "scope.txt")]
    scope: PathBuf,

    /// Directory artifacts and reports are written to.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Maximum number of concurrently running tools per stage.
    #[arg(short = 'w', long, default_value_t = 4)]
    workers: usize,

    /// Per-task timeout in seconds; hung tools are killed when it elapses.
    #[arg(long)]
    timeout: Option<u64>,

    /// Tool catalog consulted before the run.
    #[arg(long, default_value = "tools.toml")]
    tools: PathBuf,

    /// Skip the dependency bootstrap step.
    #[arg(long)]
    skip_bootstrap: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reconx=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if !cli.skip_bootstrap {
        let catalog = ToolCatalog::load(&cli.tools)
            .await
            .context("loading tool catalog")?;
        ensure_present(&catalog).await;
    }

    let scope = tokio::fs::read_to_string(&cli.scope)
        .await
        .with_context(|| format!("reading scope file '{}'", cli.scope.display()))?;

    let store = Arc::new(FsStore::open(&cli.output).context("creating output directory")?);
    store
        .write(SCOPE_ARTIFACT, &scope)
        .await
        .context("seeding scope artifact")?;

    let config = PipelineConfig {
        max_workers: cli.workers,
        task_timeout: cli.timeout.map(Duration::from_secs),
    };
    let pipeline = Pipeline::new(recon_pipeline(&cli.output), config, store)
        .context("building pipeline")?
        .with_events(Arc::new(ConsoleProgress::new()));

    let token = pipeline.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel("interrupted by user");
        }
    });

    let summary = pipeline.run().await?;
    println!("\n[✔] Recon complete in {:.2}s", summary.elapsed.as_secs_f64());

    Ok(())
}
