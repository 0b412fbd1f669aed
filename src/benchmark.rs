//! Storage benchmark and auto-tuning.
//!
//! The benchmark times a sequential write of a synthetic sample to the
//! destination (including `fsync`, so the figure reflects the media and not
//! the page cache) and a sequential read of existing source files. The slower
//! of the two is mapped onto a small lookup table of storage tiers, each with
//! a conservative `(threads, buffer)` pair.
//!
//! # Example
//!
//! ```no_run
//! use ccopy::{SessionConfig, StorageBenchmark};
//! use std::path::Path;
//!
//! let result = StorageBenchmark::default().run(
//!     Path::new("/data"),
//!     Path::new("/backup"),
//!     &[],
//!     &SessionConfig::default(),
//! )?;
//! println!(
//!     "{:?}: --threads {} --buffer {}",
//!     result.tier, result.recommended_threads, result.recommended_buffer_mb
//! );
//! # Ok::<(), ccopy::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::options::SessionConfig;
use crate::task::SourceEntry;
use crate::utils::path::TEMP_SUFFIX;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, Instant};

const MIB: u64 = 1024 * 1024;

/// Broad class of storage inferred from measured throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StorageTier {
    /// Seek-bound media (spinning disks, slow USB sticks, remote shares)
    Rotational,
    /// SATA SSD class
    Ssd,
    /// NVMe class
    Nvme,
}

impl StorageTier {
    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Rotational => "slow / rotational",
            Self::Ssd => "moderate / SSD",
            Self::Nvme => "fast / NVMe",
        }
    }
}

/// One row of the auto-tuning table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRule {
    /// Tier this row selects
    pub tier: StorageTier,
    /// Inclusive upper bound of effective throughput in MB/s
    pub max_mbps: f64,
    /// Workers for this tier
    pub threads: usize,
    /// Chunk size in MiB for this tier
    pub buffer_mb: usize,
}

/// Default tuning table.
///
/// Slow media gets one worker and a large sequential buffer (parallel
/// access thrashes seek-bound disks); fast media gets more workers to fill
/// its command queues. Bounds are inclusive, so a measurement exactly on a
/// boundary selects the safer row.
pub const DEFAULT_TIERS: &[TierRule] = &[
    TierRule {
        tier: StorageTier::Rotational,
        max_mbps: 150.0,
        threads: 1,
        buffer_mb: 8,
    },
    TierRule {
        tier: StorageTier::Ssd,
        max_mbps: 1000.0,
        threads: 4,
        buffer_mb: 4,
    },
    TierRule {
        tier: StorageTier::Nvme,
        max_mbps: f64::INFINITY,
        threads: 8,
        buffer_mb: 2,
    },
];

/// Pick the first row whose bound covers `effective_mbps`.
///
/// Falls back to the first (safest) row for an empty table or a NaN
/// measurement.
pub fn recommend(effective_mbps: f64, table: &[TierRule]) -> TierRule {
    table
        .iter()
        .find(|rule| effective_mbps <= rule.max_mbps)
        .or_else(|| table.first())
        .copied()
        .unwrap_or(DEFAULT_TIERS[0])
}

/// Immutable benchmark outcome.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BenchmarkResult {
    /// Sequential read throughput on the source, MB/s
    pub source_read_mbps: f64,
    /// Sequential write throughput on the destination, MB/s
    pub dest_write_mbps: f64,
    /// Tier selected from the slower figure
    pub tier: StorageTier,
    /// Workers to use
    pub recommended_threads: usize,
    /// Chunk size to use, MiB
    pub recommended_buffer_mb: usize,
    /// Bytes read from the source sample
    pub sample_bytes: u64,
}

impl BenchmarkResult {
    /// Build a result from raw measurements using `table`.
    pub fn from_measurements(
        source_read_mbps: f64,
        dest_write_mbps: f64,
        sample_bytes: u64,
        table: &[TierRule],
    ) -> Self {
        let rule = recommend(source_read_mbps.min(dest_write_mbps), table);
        Self {
            source_read_mbps,
            dest_write_mbps,
            tier: rule.tier,
            recommended_threads: rule.threads,
            recommended_buffer_mb: rule.buffer_mb,
            sample_bytes,
        }
    }

    /// The throughput that decided the tier.
    pub fn effective_mbps(&self) -> f64 {
        self.source_read_mbps.min(self.dest_write_mbps)
    }
}

/// Benchmark parameters.
#[derive(Debug, Clone)]
pub struct StorageBenchmark {
    /// Size of the synthetic file written to the destination
    pub write_sample_bytes: u64,
    /// Upper bound on bytes read from source files
    pub max_read_bytes: u64,
    /// Upper bound on source files read
    pub max_read_files: usize,
    /// I/O chunk size
    pub chunk_size: usize,
    /// Tuning table
    pub tiers: &'static [TierRule],
}

impl Default for StorageBenchmark {
    fn default() -> Self {
        Self {
            write_sample_bytes: 32 * MIB,
            max_read_bytes: 1024 * MIB,
            max_read_files: 100,
            chunk_size: MIB as usize,
            tiers: DEFAULT_TIERS,
        }
    }
}

impl StorageBenchmark {
    /// Set the size of the destination write sample
    #[must_use]
    pub fn with_write_sample_bytes(mut self, bytes: u64) -> Self {
        self.write_sample_bytes = bytes.max(1);
        self
    }

    /// Replace the tuning table
    #[must_use]
    pub fn with_tiers(mut self, tiers: &'static [TierRule]) -> Self {
        self.tiers = tiers;
        self
    }

    /// Measure `dst_root` write and `src_root` read throughput.
    ///
    /// `sample` is the walker output for `src_root`; files are read in order
    /// until the byte or file budget is exhausted. If it holds no data, the
    /// destination sample is read back instead so a figure is still produced.
    ///
    /// The destination sample is a temporary file removed on every exit
    /// path, including errors and cancellation.
    ///
    /// # Errors
    ///
    /// - [`Error::Benchmark`] if the destination cannot be written
    /// - [`Error::Interrupted`] if cancellation was requested
    pub fn run(
        &self,
        src_root: &Path,
        dst_root: &Path,
        sample: &[SourceEntry],
        config: &SessionConfig,
    ) -> Result<BenchmarkResult> {
        let bench_err = |source: io::Error| Error::Benchmark {
            path: dst_root.to_path_buf(),
            source,
        };

        let mut probe = tempfile::Builder::new()
            .prefix(".ccopy_bench.")
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dst_root)
            .map_err(bench_err)?;

        let mut buf = vec![0u8; self.chunk_size.max(4096)];
        fill_pattern(&mut buf);

        let start = Instant::now();
        let mut remaining = self.write_sample_bytes;
        while remaining > 0 {
            if config.is_cancelled() {
                return Err(Error::Interrupted);
            }
            let n = remaining.min(buf.len() as u64) as usize;
            probe.as_file_mut().write_all(&buf[..n]).map_err(bench_err)?;
            remaining -= n as u64;
        }
        probe.as_file().sync_all().map_err(bench_err)?;
        let dest_write_mbps = mbps(self.write_sample_bytes, start.elapsed());

        let (read_bytes, read_elapsed) =
            self.read_source_sample(src_root, sample, &mut buf, config)?;
        let (sample_bytes, source_read_mbps) = if read_bytes > 0 {
            (read_bytes, mbps(read_bytes, read_elapsed))
        } else {
            let file = probe.as_file_mut();
            file.seek(SeekFrom::Start(0)).map_err(bench_err)?;
            let start = Instant::now();
            let n = read_all(file, &mut buf, config).map_err(bench_err)?;
            (0, mbps(n, start.elapsed()))
        };

        let result = BenchmarkResult::from_measurements(
            source_read_mbps,
            dest_write_mbps,
            sample_bytes,
            self.tiers,
        );

        #[cfg(feature = "tracing")]
        tracing::info!(
            read_mbps = result.source_read_mbps,
            write_mbps = result.dest_write_mbps,
            tier = ?result.tier,
            threads = result.recommended_threads,
            buffer_mb = result.recommended_buffer_mb,
            "benchmark complete"
        );

        // `probe` is dropped here, removing the sample file
        Ok(result)
    }

    /// The leading run of `entries` the read pass would use.
    pub fn select_sample<'a>(&self, entries: &'a [SourceEntry]) -> &'a [SourceEntry] {
        let mut bytes = 0u64;
        let count = entries
            .iter()
            .take(self.max_read_files)
            .take_while(|entry| {
                bytes = bytes.saturating_add(entry.size);
                bytes <= self.max_read_bytes
            })
            .count();
        &entries[..count]
    }

    /// Bytes the read pass would consume from `entries`.
    pub fn sample_bytes(&self, entries: &[SourceEntry]) -> u64 {
        self.select_sample(entries).iter().map(|e| e.size).sum()
    }

    fn read_source_sample(
        &self,
        src_root: &Path,
        sample: &[SourceEntry],
        buf: &mut [u8],
        config: &SessionConfig,
    ) -> Result<(u64, Duration)> {
        let mut total = 0u64;
        let start = Instant::now();

        for entry in self.select_sample(sample) {
            if config.is_cancelled() {
                return Err(Error::Interrupted);
            }
            let path = src_root.join(&entry.relative_path);
            match File::open(&path).and_then(|mut f| read_all(&mut f, buf, config)) {
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted && config.is_cancelled() => {
                    return Err(Error::Interrupted);
                }
                Err(e) => {
                    config.warn(&format!(
                        "Benchmark could not read {}: {}",
                        path.display(),
                        e
                    ));
                }
            }
        }

        Ok((total, start.elapsed()))
    }
}

fn read_all(reader: &mut impl Read, buf: &mut [u8], config: &SessionConfig) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        if config.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
        }
        match reader.read(buf) {
            Ok(0) => return Ok(total),
            Ok(n) => total += n as u64,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-6);
    (bytes as f64 / MIB as f64) / secs
}

/// Fill with a non-repeating pattern so compressing or deduplicating
/// filesystems cannot shortcut the write.
fn fill_pattern(buf: &mut [u8]) {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    for chunk in buf.chunks_mut(8) {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let bytes = state.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}
