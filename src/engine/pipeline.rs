//! Per-file copy/verify pipeline.
//!
//! ```text
//! Pending -> Copying -> [Verifying] -> Completed
//!                  \           \
//!                   +-----------+--> Failed | Aborted
//! ```
//!
//! The destination is only ever touched by one atomic rename. Until then
//! the data lives in `<finalname>.<random>.ccopy_tmp` beside it, which is
//! removed on every early exit by dropping the `NamedTempFile`.

use super::stream::{StreamError, StreamOutcome, copy_chunks, hash_reader};
use crate::error::{Stage, TaskError};
use crate::options::SessionConfig;
use crate::task::{TaskStatus, TransferTask};
use crate::utils::path::{TEMP_SUFFIX, safe_path, temp_prefix};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Drive `task` from `Pending` to a terminal state.
///
/// Never returns an error: every failure is captured into the task.
/// `dst_root` is the session's destination root; it is never recreated.
/// `on_bytes` receives the size of each chunk written to the destination.
pub(crate) fn transfer(
    task: &mut TransferTask,
    dst_root: &Path,
    buf: &mut [u8],
    config: &SessionConfig,
    on_bytes: &dyn Fn(u64),
) {
    task.status = TaskStatus::Copying;

    if let Err(e) = copy_and_commit(task, dst_root, buf, config, on_bytes) {
        match e {
            TaskError::Cancelled => task.abort(Some(e)),
            e => {
                config.warn(&format!(
                    "Failed to copy {}: {}",
                    task.source_path.display(),
                    e
                ));
                task.fail(e);
            }
        }
        return;
    }

    if config.verification.rereads_destination() {
        task.status = TaskStatus::Verifying;
        if let Err(e) = post_verify(task, buf, config) {
            config.warn(&format!(
                "Verification failed for {}: {}",
                task.dest_path.display(),
                e
            ));
            task.fail(e);
            return;
        }
    }

    task.status = TaskStatus::Completed;
}

/// Stream the source into a temporary file and rename it over the
/// destination.
///
/// With verification active, the in-memory digests of both sides must
/// agree before the rename; the source digest is stored on the task.
pub(crate) fn copy_and_commit(
    task: &mut TransferTask,
    dst_root: &Path,
    buf: &mut [u8],
    config: &SessionConfig,
    on_bytes: &dyn Fn(u64),
) -> Result<(), TaskError> {
    let src = task.source_path.as_path();
    let dst = task.dest_path.as_path();

    let mut src_file =
        File::open(safe_path(src)).map_err(|e| TaskError::io(Stage::ReadSource, src, e))?;
    let src_meta = src_file
        .metadata()
        .map_err(|e| TaskError::io(Stage::ReadSource, src, e))?;

    let parent = dst.parent().unwrap_or(Path::new("."));
    create_dirs_below(dst_root, parent)
        .map_err(|e| TaskError::io(Stage::CreateTemp, parent, e))?;
    let safe_parent = safe_path(parent);

    let mut temp = tempfile::Builder::new()
        .prefix(&temp_prefix(dst))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(&safe_parent)
        .map_err(|e| TaskError::io(Stage::CreateTemp, parent, e))?;

    let hash = config.verification.computes_digest();
    let outcome = copy_chunks(
        &mut src_file,
        temp.as_file_mut(),
        buf,
        hash,
        || config.is_cancelled(),
        on_bytes,
    )
    .map_err(|e| match e {
        StreamError::Read(e) => TaskError::io(Stage::ReadSource, src, e),
        StreamError::Write(e) => TaskError::io(Stage::WriteTemp, temp.path(), e),
        StreamError::Cancelled => TaskError::Cancelled,
    })?;

    if hash {
        check_inline(&outcome)?;
    }

    // Carry mtime and mode over so a later `update` run recognises the copy
    let mtime = FileTime::from_last_modification_time(&src_meta);
    if let Err(e) = filetime::set_file_handle_times(temp.as_file(), None, Some(mtime)) {
        config.warn(&format!(
            "Failed to set modification time on {}: {}",
            dst.display(),
            e
        ));
    }
    if let Err(e) = temp.as_file().set_permissions(src_meta.permissions()) {
        config.warn(&format!(
            "Failed to set permissions on {}: {}",
            dst.display(),
            e
        ));
    }

    if config.fsync {
        temp.as_file()
            .sync_all()
            .map_err(|e| TaskError::io(Stage::WriteTemp, temp.path(), e))?;
    }

    temp.persist(safe_path(dst))
        .map_err(|e| TaskError::io(Stage::Commit, dst, e.error))?;

    task.size_bytes = outcome.bytes_read;
    task.computed_hash = outcome.read_digest;
    Ok(())
}

/// Create `dir` and its missing ancestors, stopping at `root`.
///
/// `root` itself must already exist. If it vanished (an unmounted disk),
/// recreating it would silently write to whatever lies underneath the
/// mount point, so this fails with `NotFound` instead.
fn create_dirs_below(root: &Path, dir: &Path) -> io::Result<()> {
    if !safe_path(root).is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("destination root {} is missing", root.display()),
        ));
    }
    let relative = dir.strip_prefix(root).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is outside {}", dir.display(), root.display()),
        )
    })?;

    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        let safe = safe_path(&current);
        match fs::create_dir(&safe) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && safe.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Compare the two in-memory digests of a copy pass.
pub(crate) fn check_inline(outcome: &StreamOutcome) -> Result<(), TaskError> {
    if outcome.sides_match() {
        Ok(())
    } else {
        Err(TaskError::InlineMismatch)
    }
}

/// Re-read the committed destination and compare it with the source digest.
///
/// On any failure the destination is removed: a file that could not be
/// proven correct must not be left looking like a good copy.
pub(crate) fn post_verify(
    task: &TransferTask,
    buf: &mut [u8],
    config: &SessionConfig,
) -> Result<(), TaskError> {
    let dst = task.dest_path.as_path();
    let result = File::open(safe_path(dst))
        .and_then(|mut f| hash_reader(&mut f, buf))
        .map_err(|e| TaskError::io(Stage::PostVerify, dst, e))
        .and_then(|(len, digest)| {
            if len == task.size_bytes && Some(digest) == task.computed_hash {
                Ok(())
            } else {
                Err(TaskError::PostVerifyMismatch)
            }
        });

    if result.is_err() {
        if let Err(e) = fs::remove_file(safe_path(dst)) {
            config.warn(&format!(
                "Failed to remove unverified file {}: {}",
                dst.display(),
                e
            ));
        }
    }
    result
}
