//! Task builder: turns walker output into an ordered task sequence.
//!
//! The `update` skip decision is made here, up front, from metadata alone.
//! File contents are never read.

use crate::options::SessionConfig;
use crate::task::{SourceEntry, TaskStatus, TransferTask};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Build one task per entry, in input order.
///
/// Each entry's destination mirrors its relative path under `dst_root`.
/// With [`SessionConfig::update`], an existing regular destination file with
/// the same size and an mtime within [`SessionConfig::mtime_tolerance`] makes
/// the task [`TaskStatus::Skipped`]; everything else is
/// [`TaskStatus::Pending`].
pub fn build_tasks(
    entries: Vec<SourceEntry>,
    src_root: &Path,
    dst_root: &Path,
    config: &SessionConfig,
) -> Vec<TransferTask> {
    entries
        .into_iter()
        .map(|entry| {
            let source_path = src_root.join(&entry.relative_path);
            let dest_path = dst_root.join(&entry.relative_path);
            let status = if config.update && is_unchanged(&entry, &dest_path, config) {
                TaskStatus::Skipped
            } else {
                TaskStatus::Pending
            };
            TransferTask::new(entry, source_path, dest_path, status)
        })
        .collect()
}

fn is_unchanged(entry: &SourceEntry, dest: &Path, config: &SessionConfig) -> bool {
    match fs::symlink_metadata(dest) {
        Ok(meta) => matches_entry(entry, &meta, config.mtime_tolerance),
        // Missing or unreadable: copy (conservative)
        Err(_) => false,
    }
}

/// Same regular-file size, and mtime within `tolerance`.
fn matches_entry(entry: &SourceEntry, dest: &Metadata, tolerance: Duration) -> bool {
    if !dest.file_type().is_file() || dest.len() != entry.size {
        return false;
    }
    match dest.modified() {
        Ok(dst_mtime) => within(entry.mtime, dst_mtime, tolerance),
        Err(_) => false,
    }
}

#[inline]
fn within(a: SystemTime, b: SystemTime, tolerance: Duration) -> bool {
    let diff = a
        .duration_since(b)
        .or_else(|_| b.duration_since(a))
        .unwrap_or(Duration::MAX);
    diff <= tolerance
}
