//! ccopy - Careful Copy
//!
//! Copy or move a directory tree with atomic commits, optional SHA-256
//! verification and storage auto-tuning, powered by the ccopy library.

mod log;

use clap::Parser;
use dialoguer::Confirm;
use log::{JsonlLog, LogLevel};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use ccopy::{
    BenchmarkResult, EXIT_FAILED, EXIT_INTERRUPTED, EXIT_OK, PlanSummary, ProgressObserver,
    Session, SessionConfig, SessionReport, StorageBenchmark, TaskObserver, VerificationMode,
    create_progress_bar,
};

/// ccopy - Careful file copy
///
/// Copy or move the contents of SOURCE into DESTINATION. Every file is written
/// to a temporary name and renamed into place once complete, so the
/// destination never holds a half-written file.
///
/// Usage:
///   ccopy SOURCE DESTINATION
///   ccopy --update --verify-after SOURCE DESTINATION
///   ccopy --benchmark --ask SOURCE DESTINATION
#[derive(Parser, Debug)]
#[command(name = "ccopy", version, about, long_about = None)]
struct Args {
    /// Source directory
    source: PathBuf,

    /// Destination directory (created if missing)
    destination: PathBuf,

    /// Skip files whose size and modification time already match
    #[arg(short = 'u', long)]
    update: bool,

    /// Delete each source file once its copy is complete and verified
    ///
    /// Implies --verify-after unless --verify is given.
    #[arg(short = 'm', long = "move")]
    move_files: bool,

    /// Show what would be transferred without touching any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Compare SHA-256 of the bytes read against the bytes written
    #[arg(long)]
    verify: bool,

    /// Re-read every committed file from disk and compare SHA-256
    ///
    /// Also compares in memory before the rename, so it includes --verify.
    #[arg(long, conflicts_with = "verify")]
    verify_after: bool,

    /// Benchmark the storage and run with the recommended settings
    ///
    /// Overrides --threads and --buffer and enables --verify-after.
    #[arg(long)]
    auto: bool,

    /// Benchmark the storage and print the recommended settings
    #[arg(long)]
    benchmark: bool,

    /// After --benchmark, ask whether to run with the recommended settings
    #[arg(long, requires = "benchmark")]
    ask: bool,

    /// Number of parallel workers
    #[arg(short = 't', long, value_name = "N")]
    threads: Option<usize>,

    /// Per-worker buffer size in MB
    #[arg(short = 'b', long, value_name = "MB")]
    buffer: Option<usize>,

    /// Append a JSONL record per file to PATH (default: ccopy.log)
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "ccopy.log"
    )]
    log: Option<PathBuf>,

    /// Detail of the --log file
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

impl Args {
    fn verification(&self) -> VerificationMode {
        if self.verify_after {
            VerificationMode::PostVerify
        } else if self.verify {
            VerificationMode::Inline
        } else {
            VerificationMode::None
        }
    }

    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default().with_verification(self.verification());
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(mb) = self.buffer {
            config = config.with_buffer_mb(mb);
        }
        if self.update {
            config = config.with_update();
        }
        if self.move_files {
            config = config.with_move();
        }
        if self.dry_run {
            config = config.with_dry_run();
        }
        config
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] ccopy::Error),

    #[error("Failed to open log file: {path}: {source}")]
    LogFile { path: PathBuf, source: io::Error },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Session(ccopy::Error::Interrupted) => EXIT_INTERRUPTED,
            Self::Session(_) | Self::LogFile { .. } => EXIT_FAILED,
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging();

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            if error.exit_code() == EXIT_INTERRUPTED {
                eprintln!("Cancelled before any file was transferred.");
            } else {
                eprintln!("error: {error}");
            }
            std::process::exit(error.exit_code());
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> CliResult<i32> {
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel_clone = cancel.clone();
        ctrlc::set_handler(move || {
            if request_cancel(&cancel_clone) {
                eprintln!("\nStill cancelling... waiting for in-flight files to clean up.");
            } else {
                eprintln!(
                    "\nCancelling... in-flight files stop at the next chunk and their partial copies are removed."
                );
            }
        })
        .ok();
    }
    let config = args.session_config().with_cancel_token(cancel);

    let log = args
        .log
        .as_ref()
        .map(|path| {
            JsonlLog::open(path, args.log_level).map_err(|source| CliError::LogFile {
                path: path.clone(),
                source,
            })
        })
        .transpose()?
        .map(Arc::new);

    let mut session = Session::prepare(&args.source, &args.destination, config)?;
    if let Some(log) = &log {
        log.session_start(session.roots(), session.config());
        log.plan(session.tasks());
    }

    if session.config().dry_run {
        print_plan(&session.summary());
        let report = session.run(log_observers(log.as_ref()))?;
        return Ok(report.exit_code());
    }

    if args.benchmark || args.auto {
        println!("Benchmarking storage...");
        let result = session.benchmark(&StorageBenchmark::default())?;
        if let Some(log) = &log {
            log.benchmark(&result);
        }
        print_benchmark(&result);

        if !args.auto {
            println!();
            println!("Recommended flags: {}", recommended_flags(&result));
            if !args.ask || !confirm_recommended() {
                return Ok(EXIT_OK);
            }
        }
        session.apply_benchmark(&result);
    }

    print_header(session.config());

    let bar = create_progress_bar(session.summary().bytes_to_transfer);
    let mut observers = log_observers(log.as_ref());
    observers.push(Arc::new(ProgressObserver::new(bar)));

    let report = session.run(observers)?;
    print_report(&report);
    Ok(report.exit_code())
}

/// Raise the cancel flag; returns whether it was already raised.
///
/// Repeated presses never exit the process directly: workers must get the
/// chance to drop their temporary files.
fn request_cancel(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::Relaxed)
}

fn log_observers(log: Option<&Arc<JsonlLog>>) -> Vec<Arc<dyn TaskObserver>> {
    log.iter()
        .map(|log| Arc::clone(log) as Arc<dyn TaskObserver>)
        .collect()
}

/// A missing terminal or a declined prompt both mean "do not run".
fn confirm_recommended() -> bool {
    match Confirm::new()
        .with_prompt("Run with the recommended settings?")
        .default(true)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            eprintln!("Cannot prompt ({e}); not starting the transfer.");
            false
        }
    }
}

fn recommended_flags(result: &BenchmarkResult) -> String {
    format!(
        "--threads {} --buffer {} --verify-after",
        result.recommended_threads, result.recommended_buffer_mb
    )
}

fn print_plan(summary: &PlanSummary) {
    println!("Dry run: no files will be changed.");
    println!("  Files:          {}", summary.files);
    println!("  Total size:     {}", format_bytes(summary.total_bytes));
    println!(
        "  To transfer:    {} ({})",
        summary.to_transfer,
        format_bytes(summary.bytes_to_transfer)
    );
    println!("  To skip:        {}", summary.to_skip);
    println!("  Sample:         {} bytes", summary.benchmark_sample_bytes);
    println!("  Intent:         {}", summary.intent());
}

fn print_benchmark(result: &BenchmarkResult) {
    println!("Benchmark results:");
    println!("  Source read:    {:.1} MB/s", result.source_read_mbps);
    println!("  Dest write:     {:.1} MB/s", result.dest_write_mbps);
    println!("  Storage tier:   {}", result.tier.description());
    println!("  Threads:        {}", result.recommended_threads);
    println!("  Buffer:         {} MB", result.recommended_buffer_mb);
}

fn print_header(config: &SessionConfig) {
    println!("Threads:        {}", config.threads);
    println!("Buffer:         {}", format_bytes(config.buffer_size as u64));
    println!("Verification:   {}", config.verification.as_str());
    let mode = if config.move_files { "MOVE" } else { "COPY" };
    println!("Mode:           {mode}");
}

fn print_report(report: &SessionReport) {
    println!();
    if report.interrupted {
        println!("Interrupted. Re-run with --update to continue.");
    }
    if report.volume_lost {
        println!("Destination volume was lost; remaining files were not transferred.");
    }
    println!("  Completed:      {}", report.completed);
    println!("  Skipped:        {}", report.skipped);
    println!("  Failed:         {}", report.failed);
    println!("  Aborted:        {}", report.aborted);
    println!("  Transferred:    {}", format_bytes(report.bytes_transferred));
    if report.move_warnings > 0 {
        println!("  Sources kept:   {}", report.move_warnings);
    }
    let secs = report.duration.as_secs_f64();
    if secs > 0.0 {
        println!("  Time:           {secs:.2}s ({:.1} MB/s)", report.throughput_mbps());
    }
    if report.failed > 0 {
        eprintln!();
        eprintln!(
            "WARNING: {} file(s) failed. Their destination data must not be trusted.",
            report.failed
        );
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
