//! Builder API for running a whole session in one expression.
//!
//! The builder pattern provides a fluent interface over [`SessionConfig`]
//! and [`Session`]. It is usually the most convenient entry point.
//!
//! # Examples
//!
//! ## Safe Backup
//!
//! ```no_run
//! use ccopy::SessionBuilder;
//!
//! let report = SessionBuilder::new("photos", "/mnt/usb/photos")
//!     .update()
//!     .verify_after()
//!     .run()?;
//! println!("{} copied, {} unchanged", report.completed, report.skipped);
//! # Ok::<(), ccopy::Error>(())
//! ```
//!
//! ## Auto-Tuned Move
//!
//! ```no_run
//! use ccopy::SessionBuilder;
//!
//! // Benchmark the drives, then move with post-verification
//! let report = SessionBuilder::new("inbox", "/archive/inbox")
//!     .auto()
//!     .move_files()
//!     .run()?;
//! std::process::exit(report.exit_code());
//! # Ok::<(), ccopy::Error>(())
//! ```

use crate::benchmark::StorageBenchmark;
use crate::error::Result;
use crate::options::{SessionConfig, VerificationMode};
use crate::report::{SessionReport, TaskObserver};
use crate::session::Session;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// A builder for configuring and running a transfer session.
///
/// # Example
///
/// ```no_run
/// use ccopy::SessionBuilder;
///
/// let report = SessionBuilder::new("/data/project", "/backup/project")
///     .threads(4)
///     .buffer_mb(8)
///     .verify_inline()
///     .run()?;
/// # Ok::<(), ccopy::Error>(())
/// ```
#[derive(Clone)]
pub struct SessionBuilder {
    src: PathBuf,
    dst: PathBuf,
    config: SessionConfig,
    benchmark: Option<StorageBenchmark>,
    observers: Vec<Arc<dyn TaskObserver>>,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("config", &self.config)
            .field("benchmark", &self.benchmark)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SessionBuilder {
    /// Create a builder with conservative defaults (one worker, 1 MiB
    /// buffer, no verification).
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Self {
        Self {
            src: src.as_ref().to_path_buf(),
            dst: dst.as_ref().to_path_buf(),
            config: SessionConfig::default(),
            benchmark: None,
            observers: Vec::new(),
        }
    }

    /// Set the number of workers.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.config = self.config.with_threads(threads);
        self
    }

    /// Set the per-worker chunk size in MiB.
    #[must_use]
    pub fn buffer_mb(mut self, mb: usize) -> Self {
        self.config = self.config.with_buffer_mb(mb);
        self
    }

    /// Skip files that are unchanged at the destination.
    #[must_use]
    pub fn update(mut self) -> Self {
        self.config = self.config.with_update();
        self
    }

    /// Delete each source once its copy is complete.
    ///
    /// Without an explicit verification mode this enables
    /// post-verification.
    #[must_use]
    pub fn move_files(mut self) -> Self {
        self.config = self.config.with_move();
        self
    }

    /// Plan and tally without touching any file.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.config = self.config.with_dry_run();
        self
    }

    /// Compare read and write digests in memory during the copy.
    #[must_use]
    pub fn verify_inline(mut self) -> Self {
        self.config = self.config.with_verification(VerificationMode::Inline);
        self
    }

    /// Re-read every committed file from disk and compare digests.
    #[must_use]
    pub fn verify_after(mut self) -> Self {
        self.config = self.config.with_verification(VerificationMode::PostVerify);
        self
    }

    /// Benchmark the storage first and use the recommended settings.
    ///
    /// Implies post-verification. Ignored under [`dry_run`](Self::dry_run).
    #[must_use]
    pub fn auto(self) -> Self {
        self.auto_with(StorageBenchmark::default())
    }

    /// Like [`auto`](Self::auto) with custom benchmark parameters.
    #[must_use]
    pub fn auto_with(mut self, benchmark: StorageBenchmark) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    /// Allowed mtime difference for `update` comparisons.
    #[must_use]
    pub fn mtime_tolerance(mut self, tolerance: Duration) -> Self {
        self.config = self.config.with_mtime_tolerance(tolerance);
        self
    }

    /// Disable fsync of temporary files (faster, less durable).
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.config = self.config.without_fsync();
        self
    }

    /// Set a cancellation token.
    ///
    /// ```no_run
    /// use ccopy::SessionBuilder;
    /// use std::sync::Arc;
    /// use std::sync::atomic::AtomicBool;
    ///
    /// let cancel = Arc::new(AtomicBool::new(false));
    /// let report = SessionBuilder::new("src", "dst")
    ///     .cancel_token(cancel.clone())
    ///     .run()?;
    /// # Ok::<(), ccopy::Error>(())
    /// ```
    #[must_use]
    pub fn cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.config = self.config.with_cancel_token(token);
        self
    }

    /// Set a warning handler.
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.config = self.config.with_warn_handler(handler);
        self
    }

    /// Subscribe an observer to task events.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The configuration that will be used (before benchmarking).
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session.
    ///
    /// # Errors
    ///
    /// Any error from [`Session::prepare`], [`Session::benchmark`] or
    /// [`Session::run`]. Per-file failures are in the report.
    pub fn run(self) -> Result<SessionReport> {
        let mut session = Session::prepare(&self.src, &self.dst, self.config)?;
        let dry_run = session.config().dry_run;
        if let Some(bench) = self.benchmark.filter(|_| !dry_run) {
            let result = session.benchmark(&bench)?;
            session.apply_benchmark(&result);
        }
        session.run(self.observers)
    }
}
