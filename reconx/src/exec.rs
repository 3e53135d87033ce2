//! Fail-soft execution of external commands.
//!
//! Every reconnaissance tool is an opaque external collaborator: the
//! runner captures its standard output, discards its error stream, and
//! never fails because of it. A tool that exits non-zero, is missing, or
//! gets killed by the timeout simply yields whatever output it produced.

use crate::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// A structured external command: program plus argument list.
///
/// Commands are never interpreted by a shell, so there is no quoting or
/// injection ambiguity. Input redirection is expressed by naming an
/// artifact to feed to the child's stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// The program to run.
    pub program: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Artifact whose content is piped to the child's stdin.
    #[serde(default)]
    pub stdin_artifact: Option<String>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_artifact: None,
        }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pipes the named artifact's content to the child's stdin.
    #[must_use]
    pub fn stdin_artifact(mut self, name: impl Into<String>) -> Self {
        self.stdin_artifact = Some(name.into());
        self
    }

    /// Renders the command line for logging.
    #[must_use]
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Runs external commands with an optional per-command timeout and a
/// shared cancellation token.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Option<Duration>,
    cancel: Arc<CancelToken>,
}

impl CommandRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(timeout: Option<Duration>, cancel: Arc<CancelToken>) -> Self {
        Self { timeout, cancel }
    }

    /// Creates a runner with no timeout and a private token.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, Arc::new(CancelToken::new()))
    }

    /// Runs the command to completion and returns its captured stdout.
    ///
    /// `stdin` is the resolved content of `spec.stdin_artifact`, if any.
    /// Stderr is discarded. On spawn failure, non-zero exit, timeout, or
    /// cancellation the output captured so far (possibly empty) is
    /// returned - this layer never raises.
    pub async fn run(&self, spec: &CommandSpec, stdin: Option<&str>) -> String {
        debug!(command = %spec.display(), "running command");

        let mut child = match Command::new(&spec.program)
            .args(&spec.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %spec.program, %err, "failed to spawn command");
                return String::new();
            }
        };

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let mut captured = Vec::new();

        let drive = async {
            let feed = async {
                if let Some(mut pipe) = stdin_pipe {
                    if let Some(data) = stdin {
                        let _ = pipe.write_all(data.as_bytes()).await;
                    }
                    // Dropping the pipe closes the child's stdin.
                }
            };
            let read = async {
                if let Some(mut pipe) = stdout_pipe {
                    let _ = pipe.read_to_end(&mut captured).await;
                }
            };
            tokio::join!(feed, read);
            let _ = child.wait().await;
        };

        let completed = tokio::select! {
            () = drive => true,
            () = self.cancel.cancelled() => false,
            () = expire(self.timeout) => false,
        };

        if !completed {
            let _ = child.kill().await;
            warn!(
                command = %spec.display(),
                cancelled = self.cancel.is_cancelled(),
                "command interrupted"
            );
        }

        String::from_utf8_lossy(&captured).into_owned()
    }
}

/// Sleeps for the given duration, or forever when no limit is set.
async fn expire(limit: Option<Duration>) {
    match limit {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
