//! Source removal for move mode.

use crate::options::SessionConfig;
use crate::task::{TaskStatus, TransferTask};
use crate::utils::path::safe_path;
use std::fs;

/// Delete the source of a completed task.
///
/// Does nothing unless the task is `Completed`; `Skipped` tasks never reach
/// here. The source is left alone if it changed after it was streamed, since
/// the verified copy no longer represents it. Any problem becomes a warning
/// on the task: the destination copy is good either way.
pub(crate) fn release_source(task: &mut TransferTask, config: &SessionConfig) {
    if task.status != TaskStatus::Completed {
        return;
    }

    let src = safe_path(&task.source_path);
    let unchanged = fs::symlink_metadata(&src).is_ok_and(|meta| {
        meta.is_file()
            && meta.len() == task.size_bytes
            && meta.modified().is_ok_and(|m| m == task.source_mtime)
    });
    if !unchanged {
        let msg = format!(
            "Source changed during transfer, not removed: {}",
            task.source_path.display()
        );
        config.warn(&msg);
        task.warning = Some(msg);
        return;
    }

    if let Err(e) = fs::remove_file(&src) {
        let msg = format!(
            "Copied but could not remove source {}: {}",
            task.source_path.display(),
            e
        );
        config.warn(&msg);
        task.warning = Some(msg);
    }
}
