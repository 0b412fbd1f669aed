//! Session outcome aggregation.
//!
//! Workers hand every finished [`TransferTask`] to the [`Aggregator`], which
//! folds it into a lock-protected [`SessionReport`] and then publishes a
//! [`TaskEvent`] to every subscribed [`TaskObserver`]. Observers only ever
//! see copies; they cannot alter the report.

use crate::task::{TaskStatus, TransferTask};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Exit code for a fully successful session.
pub const EXIT_OK: i32 = 0;
/// Exit code when any file failed or was aborted.
pub const EXIT_FAILED: i32 = 1;
/// Exit code when the user interrupted the session (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Counts and totals for one session.
///
/// Invariant once finished: `completed + skipped + failed + aborted == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionReport {
    /// Tasks built for this session
    pub total: usize,
    /// Tasks that reached `Completed`
    pub completed: usize,
    /// Tasks skipped as unchanged
    pub skipped: usize,
    /// Tasks that reached `Failed`
    pub failed: usize,
    /// Tasks aborted by cancellation or volume loss
    pub aborted: usize,
    /// Bytes in completed tasks
    pub bytes_transferred: u64,
    /// Completed moves whose source could not be removed
    pub move_warnings: usize,
    /// The user cancelled the session before every task finished
    pub interrupted: bool,
    /// The destination volume disappeared mid-session
    pub volume_lost: bool,
    /// Nothing was written; counts describe what a live run would do
    pub dry_run: bool,
    /// Wall time of the scheduling phase
    pub duration: Duration,
}

impl SessionReport {
    /// Process exit code for this outcome.
    ///
    /// | Condition | Code |
    /// |-----------|------|
    /// | User interruption left tasks aborted | 130 |
    /// | Any task failed or aborted | 1 |
    /// | Otherwise | 0 |
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if self.failed > 0 || self.aborted > 0 {
            EXIT_FAILED
        } else {
            EXIT_OK
        }
    }

    /// Number of tasks that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.skipped + self.failed + self.aborted
    }

    /// Whether every task either completed or was skipped.
    pub fn is_success(&self) -> bool {
        self.exit_code() == EXIT_OK
    }

    /// Throughput in MB/s over the scheduling phase.
    pub fn throughput_mbps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_transferred as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        }
    }
}

/// One terminal task transition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskEvent {
    /// Path relative to the session roots
    pub path: PathBuf,
    /// Terminal status
    pub status: TaskStatus,
    /// Size of the file
    pub bytes: u64,
    /// Hex SHA-256 of the source, when verification ran
    pub digest: Option<String>,
    /// Failure reason
    pub error: Option<String>,
    /// Non-fatal problem (source not removed)
    pub warning: Option<String>,
    /// Outcome is a dry-run prediction
    pub dry_run: bool,
}

impl TaskEvent {
    fn from_task(task: &TransferTask, dry_run: bool) -> Self {
        Self {
            path: task.relative_path.clone(),
            status: task.status,
            bytes: task.size_bytes,
            digest: task.computed_hash.map(|d| d.to_hex()),
            error: task.error_detail.as_ref().map(ToString::to_string),
            warning: task.warning.clone(),
            dry_run,
        }
    }
}

/// Receives session events.
///
/// Callbacks run on worker threads and must not block for long.
pub trait TaskObserver: Send + Sync {
    /// A task reached a terminal state.
    fn on_task(&self, _event: &TaskEvent) {}

    /// `bytes` more were written to some destination.
    fn on_bytes(&self, _bytes: u64) {}

    /// The session finished; called exactly once.
    fn on_summary(&self, _report: &SessionReport) {}
}

/// Thread-safe fold of task outcomes.
pub struct Aggregator {
    report: Mutex<SessionReport>,
    observers: Vec<Arc<dyn TaskObserver>>,
    started: Instant,
}

impl Aggregator {
    /// Start a report for `total` tasks.
    pub fn new(total: usize, dry_run: bool, observers: Vec<Arc<dyn TaskObserver>>) -> Self {
        Self {
            report: Mutex::new(SessionReport {
                total,
                dry_run,
                ..SessionReport::default()
            }),
            observers,
            started: Instant::now(),
        }
    }

    /// Fold one terminal task into the report and notify observers.
    ///
    /// Non-terminal tasks are counted as aborted.
    pub fn record(&self, task: &TransferTask) {
        let event = {
            let mut report = self.lock();
            match task.status {
                TaskStatus::Completed => {
                    report.completed += 1;
                    report.bytes_transferred += task.size_bytes;
                    if task.warning.is_some() {
                        report.move_warnings += 1;
                    }
                }
                TaskStatus::Skipped => report.skipped += 1,
                TaskStatus::Failed => report.failed += 1,
                TaskStatus::Aborted
                | TaskStatus::Pending
                | TaskStatus::Copying
                | TaskStatus::Verifying => report.aborted += 1,
            }
            TaskEvent::from_task(task, report.dry_run)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %event.path.display(),
            status = %event.status,
            bytes = event.bytes,
            digest = event.digest.as_deref(),
            error = event.error.as_deref(),
            "task finished"
        );

        for observer in &self.observers {
            observer.on_task(&event);
        }
    }

    /// Forward byte progress to observers.
    pub fn add_bytes(&self, bytes: u64) {
        for observer in &self.observers {
            observer.on_bytes(bytes);
        }
    }

    /// Flag that the destination volume went away.
    pub fn mark_volume_lost(&self) {
        self.lock().volume_lost = true;
    }

    /// Consistent copy of the current counts.
    pub fn snapshot(&self) -> SessionReport {
        self.lock().clone()
    }

    /// Close the report and publish the summary.
    ///
    /// A cancellation that arrived after the last task finished left
    /// nothing undone, so it does not mark the report interrupted.
    pub fn finish(self, cancelled: bool) -> SessionReport {
        let mut report = self
            .report
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        report.interrupted = cancelled && report.aborted > 0;
        report.duration = self.started.elapsed();

        #[cfg(feature = "tracing")]
        tracing::info!(
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed,
            aborted = report.aborted,
            bytes = report.bytes_transferred,
            interrupted = report.interrupted,
            "session finished"
        );

        for observer in &self.observers {
            observer.on_summary(&report);
        }
        report
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionReport> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
