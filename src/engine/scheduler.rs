//! Worker pool: `threads` long-lived workers draining one shared queue.

use super::{mover, pipeline};
use crate::error::{Stage, TaskError};
use crate::options::SessionConfig;
use crate::report::Aggregator;
use crate::task::{TaskStatus, TransferTask};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Run every task to a terminal state and fold it into `aggregator`.
///
/// `Skipped` tasks are recorded immediately. `Pending` tasks go through the
/// pipeline, one worker per task, in queue order. When cancellation is
/// requested or the destination volume goes away, unclaimed tasks are
/// recorded as `Aborted`.
pub(crate) fn run(
    tasks: Vec<TransferTask>,
    dst_root: &Path,
    config: &SessionConfig,
    aggregator: &Aggregator,
) {
    let mut queue = VecDeque::with_capacity(tasks.len());
    for task in tasks {
        if task.status == TaskStatus::Skipped {
            aggregator.record(&task);
        } else {
            queue.push_back(task);
        }
    }

    if config.dry_run {
        tally(queue, aggregator);
        return;
    }

    let queue = Mutex::new(queue);
    let halted = AtomicBool::new(false);
    let workers = config.threads.max(1);

    let shared = Shared {
        queue: &queue,
        halted: &halted,
        dst_root,
        config,
        aggregator,
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("ccopy-worker-{i}"))
        .build()
    {
        Ok(pool) => pool.scope(|s| spawn_workers(s, workers, shared)),
        Err(e) => {
            config.warn(&format!(
                "Failed to create thread pool ({e}), using global pool"
            ));
            rayon::scope(|s| spawn_workers(s, workers, shared));
        }
    }

    // Whatever is left was never claimed
    let remaining = queue.into_inner().unwrap_or_else(PoisonError::into_inner);
    for mut task in remaining {
        task.abort(None);
        aggregator.record(&task);
    }
}

/// State every worker borrows for the duration of the pool scope.
#[derive(Clone, Copy)]
struct Shared<'a> {
    queue: &'a Mutex<VecDeque<TransferTask>>,
    halted: &'a AtomicBool,
    dst_root: &'a Path,
    config: &'a SessionConfig,
    aggregator: &'a Aggregator,
}

fn spawn_workers<'a>(scope: &rayon::Scope<'a>, workers: usize, shared: Shared<'a>) {
    for _ in 0..workers {
        scope.spawn(move |_| worker_loop(shared));
    }
}

fn worker_loop(shared: Shared<'_>) {
    let Shared {
        queue,
        halted,
        dst_root,
        config,
        aggregator,
    } = shared;
    // Each worker owns its chunk buffer for the whole session
    let mut buf = vec![0u8; config.buffer_size.max(4096)];
    let on_bytes = |n: u64| aggregator.add_bytes(n);

    loop {
        if config.is_cancelled() || halted.load(Ordering::Acquire) {
            return;
        }
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(mut task) = next else {
            return;
        };

        pipeline::transfer(&mut task, dst_root, &mut buf, config, &on_bytes);

        if config.move_files {
            mover::release_source(&mut task, config);
        }

        // Only the first worker to notice reports it
        if task.status == TaskStatus::Failed
            && destination_gone(&task, dst_root)
            && !halted.swap(true, Ordering::AcqRel)
        {
            config.warn(&format!(
                "Destination volume lost at {}; aborting remaining transfers",
                dst_root.display()
            ));
            aggregator.mark_volume_lost();
        }

        aggregator.record(&task);
    }
}

/// A write-side failure that means no further task can succeed.
fn destination_gone(task: &TransferTask, dst_root: &Path) -> bool {
    match &task.error_detail {
        Some(e @ TaskError::Io { .. }) => {
            e.is_volume_lost() || (!is_source_side(e) && !dst_root.exists())
        }
        _ => false,
    }
}

fn is_source_side(e: &TaskError) -> bool {
    matches!(
        e,
        TaskError::Io {
            stage: Stage::ReadSource,
            ..
        }
    )
}

/// Dry run: report what a live run would do without touching any file.
fn tally(queue: VecDeque<TransferTask>, aggregator: &Aggregator) {
    for mut task in queue {
        task.status = TaskStatus::Completed;
        aggregator.record(&task);
    }
}
