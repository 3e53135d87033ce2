//! Dependency bootstrap: ensure declared tools are present.
//!
//! Consulted once before the pipeline starts. Each catalog entry is a
//! check/install pair; a failing check triggers the install command, and
//! a failing install is logged and skipped - the pipeline runs with
//! whatever tools it ends up having (their tasks fail soft).
//!
//! Check and install lines are user-supplied shell snippets from the
//! catalog file, run through `sh -c`; they are configuration, not
//! orchestrated tasks.

use crate::errors::ReconError;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// A system-level dependency with an explicit check command.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencySpec {
    /// Display name.
    pub name: String,
    /// Shell command whose exit status signals presence.
    pub check: String,
    /// Shell command run when the check fails.
    pub install: String,
}

/// A reconnaissance tool; the check defaults to a `command -v` probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSpec {
    /// Binary name.
    pub name: String,
    /// Override for the presence check.
    #[serde(default)]
    pub check: Option<String>,
    /// Shell command run when the check fails.
    pub install: String,
}

impl ToolSpec {
    /// Returns the presence check, synthesizing the default probe.
    ///
    /// Go-based tools often land in `~/go/bin` without being on `PATH`,
    /// so the default probes there as well.
    #[must_use]
    pub fn check_command(&self) -> String {
        self.check.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            format!(
                "command -v {name} >/dev/null 2>&1 || test -x {home}/go/bin/{name}",
                name = self.name
            )
        })
    }
}

/// The declarative tool catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCatalog {
    /// System dependencies checked first.
    #[serde(default, rename = "system_dependency")]
    pub system_dependencies: Vec<DependencySpec>,
    /// Reconnaissance tools.
    #[serde(default, rename = "tool")]
    pub tools: Vec<ToolSpec>,
}

impl ToolCatalog {
    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a catalog error on malformed TOML.
    pub fn from_toml(text: &str) -> Result<Self, ReconError> {
        toml::from_str(text).map_err(|err| ReconError::catalog("<inline>", err.to_string()))
    }

    /// Loads a catalog from a file.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the file is missing or malformed.
    pub async fn load(path: &Path) -> Result<Self, ReconError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| ReconError::catalog(path.display().to_string(), err.to_string()))?;
        toml::from_str(&text)
            .map_err(|err| ReconError::catalog(path.display().to_string(), err.to_string()))
    }
}

/// Checks every catalog entry, installing what is missing.
///
/// Best-effort by design: a failed install logs a warning and the loop
/// moves on to the next entry.
pub async fn ensure_present(catalog: &ToolCatalog) {
    for dep in &catalog.system_dependencies {
        ensure_one(&dep.name, &dep.check, &dep.install).await;
    }
    for tool in &catalog.tools {
        ensure_one(&tool.name, &tool.check_command(), &tool.install).await;
    }
}

async fn ensure_one(name: &str, check: &str, install: &str) {
    if shell_succeeds(check).await {
        info!("[✔] {name} found");
        return;
    }

    info!("[!] Installing {name}");
    if !shell_succeeds(install).await {
        warn!("[!] Install of {name} failed; continuing without it");
    }
}

/// Runs a shell snippet, reporting only whether it exited zero.
async fn shell_succeeds(script: &str) -> bool {
    Command::new("sh")
        .args(["-c", script])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
