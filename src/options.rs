//! Session configuration.
//!
//! This module provides [`SessionConfig`], the immutable set of run
//! parameters handed to the scheduler, and [`VerificationMode`] which
//! selects the pipeline's verification path.
//!
//! # Example
//!
//! ```
//! use ccopy::{SessionConfig, VerificationMode};
//!
//! let config = SessionConfig::default()
//!     .with_threads(4)
//!     .with_buffer_mb(8)
//!     .with_update()
//!     .with_verification(VerificationMode::PostVerify);
//! ```

use crate::benchmark::BenchmarkResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default worker count when neither an override nor a benchmark is given.
pub const DEFAULT_THREADS: usize = 1;

/// Default chunk size in MiB.
pub const DEFAULT_BUFFER_MB: usize = 1;

/// Default slack when comparing modification times for `--update`.
///
/// FAT and exFAT store mtimes with 2 second resolution, so an exact copy
/// on such a volume can differ from its source by up to that much.
pub const DEFAULT_MTIME_TOLERANCE: Duration = Duration::from_secs(2);

const MIB: usize = 1024 * 1024;

/// How a transferred file is verified.
///
/// # Default
///
/// The default is [`VerificationMode::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VerificationMode {
    /// No digest is computed.
    #[default]
    None,
    /// Compare a digest of bytes read with a digest of bytes written,
    /// in memory, during the copy pass.
    ///
    /// This cannot detect corruption introduced after the bytes leave the
    /// process (write cache, media errors).
    Inline,
    /// Everything `Inline` does, then re-read the committed destination
    /// from disk and compare against the source digest.
    PostVerify,
}

impl VerificationMode {
    /// Whether a digest is computed during the copy pass.
    pub fn computes_digest(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the committed file is re-read from disk.
    pub fn rereads_destination(self) -> bool {
        matches!(self, Self::PostVerify)
    }

    /// Short name used in logs and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Inline => "inline",
            Self::PostVerify => "post_verify",
        }
    }
}

/// Immutable run parameters for one session.
///
/// Use [`Default::default()`] to get conservative defaults, then customize
/// using the builder methods.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `threads` | 1 | Concurrent workers |
/// | `buffer_size` | 1 MiB | Chunk size per worker |
/// | `update` | `false` | Skip unchanged destination files |
/// | `move_files` | `false` | Delete sources after verified copy |
/// | `dry_run` | `false` | Plan only |
/// | `verification` | `None` | No digest |
/// | `mtime_tolerance` | 2 s | Slack for `update` comparisons |
/// | `fsync` | `true` | Sync temp file before rename |
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionConfig {
    /// Number of parallel workers (at least 1)
    pub threads: usize,

    /// Chunk size in bytes used by each worker's copy loop
    pub buffer_size: usize,

    /// Skip files whose destination has the same size and mtime
    pub update: bool,

    /// Delete each source after its copy is proven correct
    pub move_files: bool,

    /// Enumerate and tally without touching any file
    pub dry_run: bool,

    /// Verification path for the pipeline
    pub verification: VerificationMode,

    /// Allowed mtime difference for `update` skips
    pub mtime_tolerance: Duration,

    /// Whether to sync the temporary file to disk before the rename
    ///
    /// Disabling this makes post-verification read back the page cache
    /// rather than the media.
    pub fsync: bool,

    /// Cooperative cancellation flag (optional)
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel_token: Option<Arc<AtomicBool>>,

    /// Callback for warnings (optional)
    ///
    /// If not set and `tracing` feature is enabled, warnings are logged via tracing.
    /// Otherwise, warnings are silently ignored.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            buffer_size: DEFAULT_BUFFER_MB * MIB,
            update: false,
            move_files: false,
            dry_run: false,
            verification: VerificationMode::None,
            mtime_tolerance: DEFAULT_MTIME_TOLERANCE,
            fsync: true,
            cancel_token: None,
            warn_handler: None,
        }
    }
}

impl SessionConfig {
    /// Build a configuration from a benchmark.
    ///
    /// Auto mode always verifies after commit, regardless of what else was
    /// requested.
    #[must_use]
    pub fn from_benchmark(result: &BenchmarkResult) -> Self {
        Self::default().apply_benchmark(result)
    }

    /// Take threads and buffer size from a benchmark and force
    /// [`VerificationMode::PostVerify`].
    #[must_use]
    pub fn apply_benchmark(mut self, result: &BenchmarkResult) -> Self {
        self.threads = result.recommended_threads.max(1);
        self.buffer_size = result.recommended_buffer_mb.max(1) * MIB;
        self.verification = VerificationMode::PostVerify;
        self
    }

    /// Set the number of workers
    ///
    /// Value is clamped to at least 1.
    #[must_use]
    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = n.max(1);
        self
    }

    /// Set the chunk size in MiB (clamped to at least 1)
    #[must_use]
    pub fn with_buffer_mb(mut self, mb: usize) -> Self {
        self.buffer_size = mb.max(1) * MIB;
        self
    }

    /// Set the chunk size in bytes (clamped to at least 4 KiB)
    #[must_use]
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes.max(4096);
        self
    }

    /// Skip files that are unchanged at the destination
    #[must_use]
    pub fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    /// Delete sources after a verified copy
    #[must_use]
    pub fn with_move(mut self) -> Self {
        self.move_files = true;
        self
    }

    /// Plan only
    #[must_use]
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Set the verification mode
    #[must_use]
    pub fn with_verification(mut self, mode: VerificationMode) -> Self {
        self.verification = mode;
        self
    }

    /// Set the mtime tolerance used by `update`
    #[must_use]
    pub fn with_mtime_tolerance(mut self, tolerance: Duration) -> Self {
        self.mtime_tolerance = tolerance;
        self
    }

    /// Disable fsync of the temporary file
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Set a cancellation token for cooperative cancellation.
    ///
    /// When the token is set to `true`, workers stop claiming tasks, abandon
    /// in-flight copies at the next chunk boundary and the remaining queue
    /// is marked aborted.
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Settle interdependent flags before scheduling.
    ///
    /// Moving without verification is never allowed to silently skip it:
    /// the mode is upgraded to [`VerificationMode::PostVerify`] and a
    /// warning is emitted.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        if self.move_files && self.verification == VerificationMode::None {
            self.warn("--move without verification: enabling post-copy verification");
            self.verification = VerificationMode::PostVerify;
        }
        self.threads = self.threads.max(1);
        self
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|t| t.load(Ordering::Relaxed))
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("{}", msg);
        }
    }
}
