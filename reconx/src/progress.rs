//! Console progress rendering.
//!
//! An [`EventSink`] implementation that turns pool events into indicatif
//! progress bars: one bar per parallel batch, a header line per stage.
//! The core never talks to the terminal directly.

use crate::events::EventSink;
use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Renders stage headers and per-batch progress bars.
pub struct ConsoleProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    /// Creates a progress renderer drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a renderer that draws nowhere (quiet runs and tests).
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:>24} [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn handle(&self, event_type: &str, data: Option<&serde_json::Value>) {
        match event_type {
            "stage.started" => {
                let stage = field_str(data, "stage").unwrap_or("?");
                let index = field_u64(data, "index").unwrap_or(0);
                let of = field_u64(data, "of").unwrap_or(0);
                let _ = self.multi.println(format!("\n[{index}/{of}] {stage}"));
            }
            "pool.started" => {
                let label = field_str(data, "label").unwrap_or("tasks").to_string();
                let total = field_u64(data, "total").unwrap_or(0);
                let bar = self.multi.add(ProgressBar::new(total));
                bar.set_style(Self::bar_style());
                bar.set_prefix(label.clone());
                self.bars.lock().insert(label, bar);
            }
            "pool.task_completed" => {
                let label = field_str(data, "label").unwrap_or("tasks");
                if let Some(bar) = self.bars.lock().get(label) {
                    if let Some(task) = field_str(data, "task") {
                        bar.set_message(task.to_string());
                    }
                    bar.inc(1);
                }
            }
            "pool.completed" => {
                let label = field_str(data, "label").unwrap_or("tasks");
                if let Some(bar) = self.bars.lock().remove(label) {
                    bar.finish();
                }
            }
            _ => {}
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for ConsoleProgress {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.handle(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.handle(event_type, data.as_ref());
    }
}

fn field_str<'a>(data: Option<&'a serde_json::Value>, key: &str) -> Option<&'a str> {
    data.and_then(|d| d.get(key)).and_then(|v| v.as_str())
}

fn field_u64(data: Option<&serde_json::Value>, key: &str) -> Option<u64> {
    data.and_then(|d| d.get(key)).and_then(serde_json::Value::as_u64)
}
