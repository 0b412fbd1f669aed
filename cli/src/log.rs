//! JSONL session log.
//!
//! One JSON object per line. Every record carries `schema_version`,
//! `record_type` and a unix timestamp `ts`.
//!
//! | `record_type` | When |
//! |---------------|------|
//! | `session_start` | once, before scheduling |
//! | `benchmark` | after a benchmark ran |
//! | `plan_item` | once per planned file (debug level only) |
//! | `task` | once per terminal task transition |
//! | `summary` | once, at the end |

use ccopy::{
    BenchmarkResult, SessionConfig, SessionReport, SessionRoots, TaskEvent, TaskObserver,
    TaskStatus, TransferTask,
};
use clap::ValueEnum;
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA_VERSION: &str = "1.0";

/// Detail of the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    /// Session, benchmark, task and summary records
    Info,
    /// Additionally, the full plan before scheduling
    Debug,
}

/// Append-only JSONL sink, shared by all workers.
pub struct JsonlLog {
    out: Mutex<BufWriter<File>>,
    level: LogLevel,
    broken: AtomicBool,
}

impl JsonlLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path, level: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
            level,
            broken: AtomicBool::new(false),
        })
    }

    pub fn session_start(&self, roots: &SessionRoots, config: &SessionConfig) {
        self.write(&json!({
            "record_type": "session_start",
            "version": env!("CARGO_PKG_VERSION"),
            "source": roots.source.display().to_string(),
            "destination": roots.destination.display().to_string(),
            "config": config_value(config),
        }));
    }

    pub fn benchmark(&self, result: &BenchmarkResult) {
        self.write(&json!({
            "record_type": "benchmark",
            "result": serde_json::to_value(result).unwrap_or(Value::Null),
        }));
    }

    pub fn plan(&self, tasks: &[TransferTask]) {
        if self.level < LogLevel::Debug {
            return;
        }
        for task in tasks {
            let action = match task.status {
                TaskStatus::Skipped => "skip",
                _ => "transfer",
            };
            self.write(&json!({
                "record_type": "plan_item",
                "source": task.source_path.display().to_string(),
                "destination": task.dest_path.display().to_string(),
                "size": task.size_bytes,
                "action": action,
            }));
        }
    }

    fn write(&self, record: &Value) {
        if self.broken.load(Ordering::Relaxed) {
            return;
        }
        let mut record = record.clone();
        if let Value::Object(map) = &mut record {
            map.insert("schema_version".to_owned(), Value::from(SCHEMA_VERSION));
            map.insert("ts".to_owned(), Value::from(unix_now()));
        }

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = serde_json::to_writer(&mut *out, &record)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"));
        if let Err(e) = result {
            // Report once; the transfer itself must not stop over a log file
            self.broken.store(true, Ordering::Relaxed);
            tracing::warn!("session log write failed, logging disabled: {e}");
        }
    }

    fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.flush() {
            tracing::warn!("session log flush failed: {e}");
        }
    }
}

impl TaskObserver for JsonlLog {
    fn on_task(&self, event: &TaskEvent) {
        let mut record = serde_json::to_value(event).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut record {
            map.insert("record_type".to_owned(), Value::from("task"));
        }
        self.write(&record);
    }

    fn on_summary(&self, report: &SessionReport) {
        self.write(&json!({
            "record_type": "summary",
            "total": report.total,
            "completed": report.completed,
            "skipped": report.skipped,
            "failed": report.failed,
            "aborted": report.aborted,
            "bytes_transferred": report.bytes_transferred,
            "move_warnings": report.move_warnings,
            "interrupted": report.interrupted,
            "volume_lost": report.volume_lost,
            "dry_run": report.dry_run,
            "duration_secs": report.duration.as_secs_f64(),
            "exit_code": report.exit_code(),
        }));
        self.flush();
    }
}

fn config_value(config: &SessionConfig) -> Value {
    json!({
        "threads": config.threads,
        "buffer_bytes": config.buffer_size,
        "verification": config.verification.as_str(),
        "update": config.update,
        "move": config.move_files,
        "dry_run": config.dry_run,
        "fsync": config.fsync,
        "mtime_tolerance_secs": config.mtime_tolerance.as_secs_f64(),
    })
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
