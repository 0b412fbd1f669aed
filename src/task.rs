//! Transfer task data model.

use crate::error::TaskError;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// One file found under the source root by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Size in bytes at discovery time
    pub size: u64,
    /// Modification time at discovery time
    pub mtime: SystemTime,
}

/// Lifecycle state of a [`TransferTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TaskStatus {
    /// Waiting in the queue
    Pending,
    /// Unchanged at the destination (`update`); never copied, never moved
    Skipped,
    /// Streaming into the temporary file
    Copying,
    /// Re-reading the committed destination
    Verifying,
    /// Copied (and verified, if requested)
    Completed,
    /// Did not complete; destination holds no partial or bad data
    Failed,
    /// Never claimed, or abandoned mid-copy, because the session stopped
    Aborted,
}

impl TaskStatus {
    /// Whether the task has reached its final state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::Completed | Self::Failed | Self::Aborted
        )
    }

    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Copying => "copying",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

/// One file to copy or move.
///
/// Created by the task builder, then owned by exactly one worker from the
/// moment it is claimed until it is folded into the session report.
#[derive(Debug)]
pub struct TransferTask {
    /// Path relative to the session roots; unique per session
    pub relative_path: PathBuf,
    /// Absolute source path
    pub source_path: PathBuf,
    /// Absolute final destination path
    pub dest_path: PathBuf,
    /// Source size at discovery
    pub size_bytes: u64,
    /// Source modification time at discovery
    pub source_mtime: SystemTime,
    /// Current state
    pub status: TaskStatus,
    /// Digest of the source bytes, when verification is active
    pub computed_hash: Option<Digest>,
    /// Failure reason; set only in `Failed` (or `Aborted` mid-copy)
    pub error_detail: Option<TaskError>,
    /// Non-fatal problem after completion (source could not be removed)
    pub warning: Option<String>,
}

impl TransferTask {
    pub(crate) fn new(
        entry: SourceEntry,
        source_path: PathBuf,
        dest_path: PathBuf,
        status: TaskStatus,
    ) -> Self {
        Self {
            relative_path: entry.relative_path,
            source_path,
            dest_path,
            size_bytes: entry.size,
            source_mtime: entry.mtime,
            status,
            computed_hash: None,
            error_detail: None,
            warning: None,
        }
    }

    /// Move to `Failed` with the given reason.
    pub(crate) fn fail(&mut self, error: TaskError) {
        self.status = TaskStatus::Failed;
        self.error_detail = Some(error);
    }

    /// Move to `Aborted`; `reason` is kept when the task was abandoned mid-copy.
    pub(crate) fn abort(&mut self, reason: Option<TaskError>) {
        self.status = TaskStatus::Aborted;
        self.error_detail = reason;
    }
}
