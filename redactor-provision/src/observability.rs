//! Observability: tracing init, step journal, console progress.
//!
//! Uses config::ObservabilityConfig for PROVISION_QUIET, LOG_LEVEL, LOG_JSON, JOURNAL.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use provision_core::config::ObservabilityConfig;
use provision_env::{ProvisionError, Step, StepListener};
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When PROVISION_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "redactor_provision=warn,provision_env=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Prints step progress to stderr and appends step events to the journal.
pub struct StepReporter {
    quiet: bool,
    journal: Option<String>,
}

impl StepReporter {
    pub fn new(quiet: bool, journal: Option<String>) -> Self {
        Self { quiet, journal }
    }

    pub fn from_env(quiet: bool) -> Self {
        let cfg = ObservabilityConfig::from_env();
        Self::new(quiet || cfg.quiet, cfg.journal.clone())
    }

    fn record(&self, record: serde_json::Value) {
        if let Some(ref path) = self.journal {
            append_jsonl(path, &record);
        }
    }
}

impl StepListener for StepReporter {
    fn step_started(&self, step: Step) {
        if !self.quiet {
            eprintln!("[{}/{}] {}...", step.number(), Step::ALL.len(), step);
        }
        self.record(json!({
            "ts": now(),
            "event": "step_started",
            "step": step,
        }));
    }

    fn step_finished(&self, step: Step, elapsed: Duration) {
        self.record(json!({
            "ts": now(),
            "event": "step_finished",
            "step": step,
            "elapsed_ms": elapsed.as_millis() as u64,
        }));
    }

    fn step_failed(&self, step: Step, error: &ProvisionError) {
        eprintln!("✗ {} failed", step);
        self.record(json!({
            "ts": now(),
            "event": "step_failed",
            "step": step,
            "error": error.to_string(),
            "exit_code": error.exit_code(),
        }));
    }
}
