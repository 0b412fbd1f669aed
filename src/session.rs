//! Session orchestration.
//!
//! A session runs in three phases:
//!
//! 1. [`Session::prepare`] checks the roots, walks the source and builds the
//!    task list. Nothing is written.
//! 2. Optionally, [`Session::benchmark`] measures the storage and
//!    [`Session::apply_benchmark`] adopts its recommendation.
//! 3. [`Session::run`] drives every task to a terminal state and returns the
//!    [`SessionReport`].
//!
//! Any [`Error`] is raised before the first file is transferred.

use crate::benchmark::{BenchmarkResult, StorageBenchmark};
use crate::engine::scheduler;
use crate::error::{Error, Result};
use crate::options::{SessionConfig, VerificationMode};
use crate::plan::build_tasks;
use crate::report::{Aggregator, SessionReport, TaskObserver};
use crate::task::{SourceEntry, TaskStatus, TransferTask};
use crate::utils::path::{is_within, normalize, safe_path};
use crate::walk::discover;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canonical session roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRoots {
    /// Source directory, canonicalized
    pub source: PathBuf,
    /// Destination directory, absolute and normalized (may not exist yet)
    pub destination: PathBuf,
}

/// Validate the source and destination roots.
///
/// # Errors
///
/// - [`Error::SourceNotFound`] if `src` does not exist
/// - [`Error::NotADirectory`] if `src` is not a directory
/// - [`Error::DestinationInsideSource`] if `dst` is `src` or lies beneath it
///   (after resolving symlinks on the existing part of `dst`)
pub fn preflight(src: &Path, dst: &Path) -> Result<SessionRoots> {
    let meta = fs::metadata(src).map_err(|_| Error::SourceNotFound(src.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(Error::NotADirectory(src.to_path_buf()));
    }

    let source = fs::canonicalize(src)?;
    let destination = resolve_destination(dst)?;

    if is_within(&destination, &source) {
        return Err(Error::DestinationInsideSource {
            source_root: source,
            dest: destination,
        });
    }

    Ok(SessionRoots {
        source,
        destination,
    })
}

/// Absolute, normalized destination with its longest existing ancestor
/// canonicalized, so a symlink into the source tree is still caught.
fn resolve_destination(dst: &Path) -> Result<PathBuf> {
    let absolute = normalize(&std::path::absolute(dst)?);

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut base) => {
                base.extend(rest.iter().rev());
                return Ok(base);
            }
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    rest.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Ok(absolute),
            },
        }
    }
}

/// Summary of a prepared session, before anything is transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanSummary {
    /// Regular files found under the source
    pub files: usize,
    /// Their combined size
    pub total_bytes: u64,
    /// Files that will be transferred
    pub to_transfer: usize,
    /// Bytes that will be transferred
    pub bytes_to_transfer: u64,
    /// Files that are unchanged at the destination
    pub to_skip: usize,
    /// Bytes the benchmark would read from the source
    pub benchmark_sample_bytes: u64,
    /// Verification that will run
    pub verification: VerificationMode,
}

impl PlanSummary {
    /// `SAFE` when transfers are verified, `FAST` otherwise.
    pub fn intent(&self) -> &'static str {
        if self.verification.computes_digest() {
            "SAFE"
        } else {
            "FAST"
        }
    }
}

/// A planned transfer session.
///
/// # Example
///
/// ```no_run
/// use ccopy::{Session, SessionConfig, StorageBenchmark};
///
/// let mut session = Session::prepare("photos", "/mnt/usb/photos", SessionConfig::default())?;
/// let bench = session.benchmark(&StorageBenchmark::default())?;
/// session.apply_benchmark(&bench);
/// let report = session.run(Vec::new())?;
/// std::process::exit(report.exit_code());
/// # Ok::<(), ccopy::Error>(())
/// ```
#[derive(Debug)]
pub struct Session {
    roots: SessionRoots,
    config: SessionConfig,
    entries: Vec<SourceEntry>,
    tasks: Vec<TransferTask>,
}

impl Session {
    /// Check roots, walk the source and build the task list.
    ///
    /// # Errors
    ///
    /// Any [`preflight`] error, or [`Error::Io`] if the source root cannot
    /// be read.
    pub fn prepare<P: AsRef<Path>, Q: AsRef<Path>>(
        src: P,
        dst: Q,
        config: SessionConfig,
    ) -> Result<Self> {
        let roots = preflight(src.as_ref(), dst.as_ref())?;
        let config = config.resolved();
        let entries = discover(&roots.source, &config)?;
        let tasks = build_tasks(entries.clone(), &roots.source, &roots.destination, &config);

        #[cfg(feature = "tracing")]
        tracing::info!(
            source = %roots.source.display(),
            destination = %roots.destination.display(),
            files = tasks.len(),
            verification = config.verification.as_str(),
            "session prepared"
        );

        Ok(Self {
            roots,
            config,
            entries,
            tasks,
        })
    }

    /// Session roots.
    pub fn roots(&self) -> &SessionRoots {
        &self.roots
    }

    /// Effective configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Planned tasks, in walk order.
    pub fn tasks(&self) -> &[TransferTask] {
        &self.tasks
    }

    /// Counts and sizes of the plan.
    pub fn summary(&self) -> PlanSummary {
        let (to_skip, skipped_bytes) = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Skipped)
            .fold((0, 0), |(n, b), t| (n + 1, b + t.size_bytes));
        let total_bytes = self.tasks.iter().map(|t| t.size_bytes).sum();

        PlanSummary {
            files: self.tasks.len(),
            total_bytes,
            to_transfer: self.tasks.len() - to_skip,
            bytes_to_transfer: total_bytes - skipped_bytes,
            to_skip,
            benchmark_sample_bytes: StorageBenchmark::default().sample_bytes(&self.entries),
            verification: self.config.verification,
        }
    }

    /// Measure source read and destination write throughput.
    ///
    /// Creates the destination root if needed; leaves nothing else behind.
    ///
    /// # Errors
    ///
    /// [`Error::Benchmark`] if the destination is not writable,
    /// [`Error::Interrupted`] if cancelled.
    pub fn benchmark(&self, bench: &StorageBenchmark) -> Result<BenchmarkResult> {
        fs::create_dir_all(safe_path(&self.roots.destination)).map_err(|source| {
            Error::Benchmark {
                path: self.roots.destination.clone(),
                source,
            }
        })?;
        bench.run(
            &self.roots.source,
            &self.roots.destination,
            &self.entries,
            &self.config,
        )
    }

    /// Adopt a benchmark's threads and buffer size; forces post-verification.
    pub fn apply_benchmark(&mut self, result: &BenchmarkResult) {
        self.config = self.config.clone().apply_benchmark(result);
    }

    /// Transfer every planned file.
    ///
    /// Per-file failures are reported in the returned [`SessionReport`],
    /// never as an `Err`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the destination root cannot be created.
    pub fn run(self, observers: Vec<Arc<dyn TaskObserver>>) -> Result<SessionReport> {
        let Self {
            roots,
            config,
            tasks,
            ..
        } = self;

        if !config.dry_run {
            fs::create_dir_all(safe_path(&roots.destination))?;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            threads = config.threads,
            buffer_bytes = config.buffer_size,
            verification = config.verification.as_str(),
            update = config.update,
            move_files = config.move_files,
            dry_run = config.dry_run,
            "session starting"
        );

        let aggregator = Aggregator::new(tasks.len(), config.dry_run, observers);
        scheduler::run(tasks, &roots.destination, &config, &aggregator);
        Ok(aggregator.finish(config.is_cancelled()))
    }
}
