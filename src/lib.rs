//! # ccopy
//!
//! Safety-first bulk file transfer for Rust.
//!
//! ccopy copies (or moves) a directory tree so that every destination file
//! is, at all times, either absent or a complete copy. It is meant for the
//! transfers where "probably fine" is not good enough: backups to external
//! disks, archives, moving the only copy of some data.
//!
//! ## Core Features
//!
//! - **Atomic writes**: data goes to `<name>.<random>.ccopy_tmp` and is renamed
//!   into place only once it is complete (and synced)
//! - **Verification**: SHA-256 of bytes read vs. bytes written (inline), or a
//!   full re-read of the committed file from disk (post-verify)
//! - **Safe moves**: a source is deleted only after its copy is proven correct
//! - **Incremental**: skip files whose size and mtime already match
//! - **Auto-tuning**: a short storage benchmark picks threads and buffer size
//! - **Cooperative cancellation**: in-flight temporaries are cleaned up
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use ccopy::SessionBuilder;
//!
//! let report = SessionBuilder::new("photos", "/mnt/usb/photos")
//!     .update()
//!     .verify_after()
//!     .run()?;
//! println!(
//!     "{} copied, {} unchanged, {} failed",
//!     report.completed, report.skipped, report.failed
//! );
//! # Ok::<(), ccopy::Error>(())
//! ```
//!
//! ## Phased API
//!
//! For a look at the plan before committing to it, use [`Session`]:
//!
//! ```no_run
//! use ccopy::{Session, SessionConfig, StorageBenchmark, VerificationMode};
//!
//! let config = SessionConfig::default().with_verification(VerificationMode::Inline);
//! let mut session = Session::prepare("src", "dst", config)?;
//! let plan = session.summary();
//! println!("{} files, {} bytes to transfer", plan.to_transfer, plan.bytes_to_transfer);
//!
//! let bench = session.benchmark(&StorageBenchmark::default())?;
//! session.apply_benchmark(&bench);
//! let report = session.run(Vec::new())?;
//! # Ok::<(), ccopy::Error>(())
//! ```
//!
//! ## Safety Guarantees
//!
//! ### Atomic Commit
//!
//! Each file is streamed into a temporary file in its destination directory,
//! synced, and renamed over the final path. An interrupted transfer leaves
//! either the previous destination or nothing.
//!
//! ### Verification
//!
//! | Mode | Detects |
//! |------|---------|
//! | [`VerificationMode::None`] | nothing |
//! | [`VerificationMode::Inline`] | bytes lost or altered between read and write |
//! | [`VerificationMode::PostVerify`] | the above, plus corruption on the way to the media |
//!
//! A file failing post-verification is deleted from the destination.
//!
//! ### Move Safety
//!
//! Moving without verification is upgraded to post-verification. Sources
//! are never deleted for skipped, failed or aborted files, nor when they
//! changed after being read.
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Byte progress bar with indicatif |
//! | `tracing` | Structured logging with tracing crate |
//! | `serde` | Serialize/Deserialize for config, events and reports |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod benchmark;
mod builder;
mod engine;
mod error;
mod options;
mod plan;
mod report;
mod session;
mod task;
mod utils;
mod walk;

#[cfg(feature = "progress")]
mod progress;

pub use benchmark::{
    BenchmarkResult, DEFAULT_TIERS, StorageBenchmark, StorageTier, TierRule, recommend,
};
pub use builder::SessionBuilder;
pub use error::{Error, ErrorClass, Result, Stage, TaskError, is_no_space_error, is_volume_lost};
pub use options::{
    DEFAULT_BUFFER_MB, DEFAULT_MTIME_TOLERANCE, DEFAULT_THREADS, SessionConfig, VerificationMode,
};
pub use plan::build_tasks;
pub use report::{
    Aggregator, EXIT_FAILED, EXIT_INTERRUPTED, EXIT_OK, SessionReport, TaskEvent, TaskObserver,
};
pub use session::{PlanSummary, Session, SessionRoots, preflight};
pub use task::{Digest, SourceEntry, TaskStatus, TransferTask};
pub use utils::path::TEMP_SUFFIX;
pub use walk::discover;

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::{ProgressObserver, create_progress_bar};
