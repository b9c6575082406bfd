//! Batch-processing progress reporting.
//!
//! Reports observable progress while `intake process --pending` works
//! through the queue, so operators see which document is being processed
//! and how much is left. Progress is emitted on **stderr** so stdout
//! remains parseable for scripts.

use std::io::Write;

/// A single progress event for batch processing.
#[derive(Clone, Debug)]
pub enum ProcessProgressEvent {
    /// Document n of total has been claimed and is being processed.
    Started {
        document: String,
        n: u64,
        total: u64,
    },
    /// Document finished with the given outcome ("completed" / "failed").
    Finished { document: String, outcome: String },
}

/// Reports processing progress. Implementations write to stderr (human or JSON).
pub trait ProcessProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the processing loop.
    fn report(&self, event: ProcessProgressEvent);
}

/// Human-friendly progress on stderr: "process 3f2a91d0  2 / 14".
pub struct StderrProgress;

impl ProcessProgressReporter for StderrProgress {
    fn report(&self, event: ProcessProgressEvent) {
        let line = match &event {
            ProcessProgressEvent::Started { document, n, total } => {
                format!(
                    "process {}  {} / {}\n",
                    short_id(document),
                    format_number(*n),
                    format_number(*total)
                )
            }
            ProcessProgressEvent::Finished { document, outcome } => {
                format!("process {}  {}\n", short_id(document), outcome)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProcessProgressReporter for JsonProgress {
    fn report(&self, event: ProcessProgressEvent) {
        let obj = match &event {
            ProcessProgressEvent::Started { document, n, total } => serde_json::json!({
                "event": "progress",
                "document": document,
                "n": n,
                "total": total
            }),
            ProcessProgressEvent::Finished { document, outcome } => serde_json::json!({
                "event": "finished",
                "document": document,
                "outcome": outcome
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProcessProgressReporter for NoProgress {
    fn report(&self, _event: ProcessProgressEvent) {}
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag value; `None` keeps the TTY default.
    pub fn from_flag(flag: Option<&str>) -> anyhow::Result<Self> {
        match flag {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => anyhow::bail!(
                "invalid progress mode '{}': expected off, human, or json",
                other
            ),
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProcessProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
