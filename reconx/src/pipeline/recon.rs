//! The built-in reconnaissance pipeline.
//!
//! Nine stages, each consuming the artifacts of earlier stages through
//! the store. The tool set here is configuration, not orchestration: the
//! pipeline treats every command as an opaque collaborator, and the
//! catalog can be swapped wholesale for a different one.

use super::spec::{MergeSpec, PipelineSpec, StageSpec};
use crate::exec::CommandSpec;
use crate::pool::Task;
use std::path::Path;

/// Artifact seeded with the target scope before the run starts.
pub const SCOPE_ARTIFACT: &str = "scope.txt";

/// Builds the default recon pipeline over a store rooted at `output_dir`.
///
/// Tools that take an input file on their command line are pointed at the
/// artifact's on-disk path under `output_dir`; tools that read standard
/// input are fed the artifact content directly.
#[must_use]
pub fn recon_pipeline(output_dir: &Path) -> PipelineSpec {
    let path = |name: &str| output_dir.join(name).to_string_lossy().into_owned();
    let scope = path(SCOPE_ARTIFACT);
    let subdomains = path("subdomains.txt");
    let resolved = path("resolved.txt");
    let alive = path("alive.txt");
    let params2 = path("params2.txt");

    PipelineSpec::new("ReconX Report")
        .input(SCOPE_ARTIFACT)
        .stage(
            StageSpec::new("Subdomain Discovery")
                .task(
                    Task::new(
                        "subfinder",
                        CommandSpec::new("subfinder").args(["-dL", scope.as_str(), "-silent"]),
                    )
                    .capture("sub1.txt"),
                )
                .task(
                    Task::new(
                        "assetfinder",
                        CommandSpec::new("assetfinder")
                            .arg("--subs-only")
                            .stdin_artifact(SCOPE_ARTIFACT),
                    )
                    .capture("sub2.txt"),
                )
                .task(
                    Task::new(
                        "amass",
                        CommandSpec::new("amass").args(["enum", "-passive", "-df", scope.as_str()]),
                    )
                    .capture("sub3.txt"),
                )
                .merge(MergeSpec::sort_unique(
                    "subdomains.txt",
                    ["sub1.txt", "sub2.txt", "sub3.txt"],
                )),
        )
        .stage(
            StageSpec::new("DNS Resolution").task(
                Task::new(
                    "dnsx",
                    CommandSpec::new("dnsx").args(["-l", subdomains.as_str(), "-silent"]),
                )
                .capture("resolved.txt"),
            ),
        )
        .stage(
            StageSpec::new("HTTP Probing").task(
                Task::new(
                    "httpx",
                    CommandSpec::new("httpx").args([
                        "-l",
                        resolved.as_str(),
                        "-status-code",
                        "-title",
                        "-tech-detect",
                    ]),
                )
                .capture("alive.txt"),
            ),
        )
        .stage(
            StageSpec::new("Port Scanning").task(
                Task::new(
                    "naabu",
                    CommandSpec::new("naabu").args([
                        "-l",
                        resolved.as_str(),
                        "-top-ports",
                        "1000",
                        "-silent",
                    ]),
                )
                .capture("ports.txt"),
            ),
        )
        .stage(
            StageSpec::new("Technology Fingerprinting").task(
                Task::new(
                    "whatweb",
                    CommandSpec::new("whatweb").args(["-i", alive.as_str()]),
                )
                .capture("tech.txt"),
            ),
        )
        .stage(
            StageSpec::new("URL Discovery")
                .task(
                    Task::new("gau", CommandSpec::new("gau").stdin_artifact("resolved.txt"))
                        .capture("urls1.txt"),
                )
                .task(
                    Task::new(
                        "waybackurls",
                        CommandSpec::new("waybackurls").stdin_artifact("resolved.txt"),
                    )
                    .capture("urls2.txt"),
                )
                .task(
                    Task::new(
                        "katana",
                        CommandSpec::new("katana").args(["-list", resolved.as_str(), "-silent"]),
                    )
                    .capture("urls3.txt"),
                )
                .merge(MergeSpec::sort_unique(
                    "urls.txt",
                    ["urls1.txt", "urls2.txt", "urls3.txt"],
                )),
        )
        .stage(
            StageSpec::new("JavaScript Recon").task(
                Task::new("subjs", CommandSpec::new("subjs").args(["-i", alive.as_str()]))
                    .capture("js.txt"),
            ),
        )
        .stage(
            StageSpec::new("Parameter Mining")
                .task(
                    Task::new(
                        "paramspider",
                        CommandSpec::new("python3").args([
                            "ParamSpider/paramspider.py",
                            "-l",
                            resolved.as_str(),
                        ]),
                    )
                    .capture("params1.txt"),
                )
                .task(
                    // arjun writes its result file itself instead of
                    // printing to stdout.
                    Task::new(
                        "arjun",
                        CommandSpec::new("arjun").args([
                            "-i",
                            alive.as_str(),
                            "-oT",
                            params2.as_str(),
                        ]),
                    )
                    .external("params2.txt"),
                )
                .merge(MergeSpec::sort_unique(
                    "params.txt",
                    ["params1.txt", "params2.txt"],
                )),
        )
        .stage(
            StageSpec::new("Vulnerability Scanning").task(
                Task::new(
                    "nuclei",
                    CommandSpec::new("nuclei").args([
                        "-l",
                        alive.as_str(),
                        "-severity",
                        "low,medium,high",
                        "-silent",
                    ]),
                )
                .capture("nuclei.txt"),
            ),
        )
}
