//! Progress reporting support (requires `progress` feature)

use crate::report::{SessionReport, TaskEvent, TaskObserver};
use crate::task::TaskStatus;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a default byte progress bar for a session
#[must_use]
pub fn create_progress_bar(total_bytes: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// [`TaskObserver`] that drives an indicatif bar.
///
/// Bytes advance as chunks are written. A failed file's partial bytes stay
/// counted, so the bar can overshoot the work actually kept.
#[derive(Debug, Clone)]
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Wrap an existing bar
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    /// The underlying bar
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl TaskObserver for ProgressObserver {
    fn on_task(&self, event: &TaskEvent) {
        match event.status {
            TaskStatus::Failed => self.bar.println(format!(
                "FAILED {}: {}",
                event.path.display(),
                event.error.as_deref().unwrap_or("unknown error")
            )),
            TaskStatus::Completed if event.dry_run => self.bar.inc(event.bytes),
            _ => {}
        }
        self.bar.set_message(event.path.display().to_string());
    }

    fn on_bytes(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn on_summary(&self, _report: &SessionReport) {
        self.bar.finish_and_clear();
    }
}
