//! Error types for ccopy.
//!
//! Two layers of errors exist:
//!
//! - [`Error`] is returned by session-level operations. Every variant aborts
//!   the session before any file is transferred.
//! - [`TaskError`] describes why a single file transfer did not complete. It
//!   never escapes a worker; it is captured into the task's terminal state
//!   and folded into the [`SessionReport`](crate::SessionReport).
//!
//! # Error Categories
//!
//! | Category | Errors |
//! |----------|--------|
//! | Precondition | [`Error::SourceNotFound`], [`Error::NotADirectory`], [`Error::DestinationInsideSource`], [`Error::Benchmark`], [`Error::Io`] |
//! | Session interrupt | [`Error::Interrupted`] |
//! | Task I/O | [`TaskError::Io`] |
//! | Verification | [`TaskError::InlineMismatch`], [`TaskError::PostVerifyMismatch`] |
//! | Interrupt | [`TaskError::Cancelled`] |

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for ccopy session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    if error.raw_os_error() == Some(libc::ENOSPC) {
        return true;
    }

    #[cfg(windows)]
    {
        const ERROR_DISK_FULL: i32 = 112;
        if error.raw_os_error() == Some(ERROR_DISK_FULL) {
            return true;
        }
    }

    false
}

/// Check if an IO error means the destination volume itself went away.
///
/// A removed USB disk or a dropped network mount surfaces as one of these
/// codes on every subsequent call, so continuing the queue would only
/// produce a cascade of identical failures.
pub fn is_volume_lost(error: &io::Error) -> bool {
    #[cfg(unix)]
    if let Some(code) = error.raw_os_error() {
        return matches!(
            code,
            libc::ENODEV | libc::ENXIO | libc::EIO | libc::ESTALE | libc::ENOTCONN
        );
    }

    #[cfg(windows)]
    if let Some(code) = error.raw_os_error() {
        // ERROR_NOT_READY, ERROR_DEV_NOT_EXIST, ERROR_DEVICE_NOT_CONNECTED
        return matches!(code, 21 | 55 | 1167);
    }

    false
}

/// Errors that abort a whole session.
///
/// All errors include relevant path information to aid debugging.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error while preparing the session (walking the source,
    /// creating the destination root).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Source path does not exist
    #[error("Source does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// Source is not a directory
    #[error("Source must be a directory: {0}")]
    NotADirectory(PathBuf),

    /// Destination is the source itself or lies inside it
    #[error("Destination cannot be inside source directory: {dest} is within {source_root}")]
    DestinationInsideSource {
        /// Source root
        source_root: PathBuf,
        /// Offending destination
        dest: PathBuf,
    },

    /// Storage benchmark could not run
    ///
    /// Usually means the destination is not writable. Nothing was
    /// transferred.
    #[error("Benchmark failed on {path}: {source}")]
    Benchmark {
        /// Path the benchmark was probing
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Cancelled before scheduling started (during the benchmark)
    #[error("Interrupted before any file was transferred")]
    Interrupted,
}

/// The step of the per-file pipeline at which an IO error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    /// Opening or reading the source file
    ReadSource,
    /// Creating the temporary file next to the destination
    CreateTemp,
    /// Writing or syncing the temporary file
    WriteTemp,
    /// Renaming the temporary file over the destination
    Commit,
    /// Re-reading the committed destination
    PostVerify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadSource => "read source",
            Self::CreateTemp => "create temporary file",
            Self::WriteTemp => "write temporary file",
            Self::Commit => "commit",
            Self::PostVerify => "post-verify read",
        };
        f.write_str(s)
    }
}

/// Coarse classification of a [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Per-file read/write/permission/space failure
    TaskIo,
    /// Digest mismatch, destination cleaned
    Verification,
    /// User-requested cancellation
    Interrupt,
}

/// Why a single transfer task did not reach `Completed`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TaskError {
    /// IO failure at some pipeline stage
    #[error("{stage} failed for {path}: {source}")]
    Io {
        /// Pipeline step
        stage: Stage,
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Digest of bytes read differs from digest of bytes written
    #[error("inline verification mismatch")]
    InlineMismatch,

    /// Committed destination re-read from disk differs from the source
    #[error("post-verification mismatch: destination unreliable")]
    PostVerifyMismatch,

    /// Cancelled while the copy pass was in flight; temp file removed
    #[error("cancelled")]
    Cancelled,
}

impl TaskError {
    pub(crate) fn io(stage: Stage, path: &Path, source: io::Error) -> Self {
        Self::Io {
            stage,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io { .. } => ErrorClass::TaskIo,
            Self::InlineMismatch | Self::PostVerifyMismatch => ErrorClass::Verification,
            Self::Cancelled => ErrorClass::Interrupt,
        }
    }

    /// The underlying IO error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this failure means the destination volume is gone.
    ///
    /// Only write-side stages count: a source disk vanishing does not
    /// make the destination unusable.
    pub fn is_volume_lost(&self) -> bool {
        match self {
            Self::Io { stage, source, .. } => {
                !matches!(stage, Stage::ReadSource) && is_volume_lost(source)
            }
            _ => false,
        }
    }
}
