//! Chunked streaming with optional SHA-256 digests on both sides.
//!
//! The read digest covers bytes returned by the source reader; the write
//! digest covers only bytes the destination writer reported as accepted.
//! Comparing the two (plus the byte counts) proves that what was read is
//! exactly what was handed to the destination file.

use crate::task::Digest;
use sha2::{Digest as _, Sha256};
use std::io::{self, Read, Write};

/// Wraps a writer and hashes exactly the bytes it accepts.
pub(crate) struct HashingWriter<W> {
    inner: W,
    hasher: Option<Sha256>,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub(crate) fn new(inner: W, hash: bool) -> Self {
        Self {
            inner,
            hasher: hash.then(Sha256::new),
            written: 0,
        }
    }

    fn finish(self) -> (u64, Option<Digest>) {
        (self.written, self.hasher.map(finalize))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Byte counts and digests from one copy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamOutcome {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub read_digest: Option<Digest>,
    pub write_digest: Option<Digest>,
}

impl StreamOutcome {
    /// Both sides saw the same bytes.
    ///
    /// Without digests only the byte counts can be compared.
    pub(crate) fn sides_match(&self) -> bool {
        self.bytes_read == self.bytes_written && self.read_digest == self.write_digest
    }
}

/// Why a copy pass stopped early.
#[derive(Debug)]
pub(crate) enum StreamError {
    Read(io::Error),
    Write(io::Error),
    Cancelled,
}

/// Copy `reader` into `writer` one `buf`-sized chunk at a time.
///
/// `cancelled` is polled before every chunk; `on_chunk` receives the size
/// of every chunk fully written.
pub(crate) fn copy_chunks<R, W>(
    reader: &mut R,
    writer: W,
    buf: &mut [u8],
    hash: bool,
    cancelled: impl Fn() -> bool,
    mut on_chunk: impl FnMut(u64),
) -> Result<StreamOutcome, StreamError>
where
    R: Read + ?Sized,
    W: Write,
{
    let mut read_hasher = hash.then(Sha256::new);
    let mut writer = HashingWriter::new(writer, hash);
    let mut bytes_read = 0u64;

    loop {
        if cancelled() {
            return Err(StreamError::Cancelled);
        }
        let n = match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Read(e)),
        };
        bytes_read += n as u64;
        if let Some(hasher) = read_hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        writer.write_all(&buf[..n]).map_err(StreamError::Write)?;
        on_chunk(n as u64);
    }
    writer.flush().map_err(StreamError::Write)?;

    let (bytes_written, write_digest) = writer.finish();
    Ok(StreamOutcome {
        bytes_read,
        bytes_written,
        read_digest: read_hasher.map(finalize),
        write_digest,
    })
}

/// Hash everything `reader` yields. Not cancellable.
pub(crate) fn hash_reader<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> io::Result<(u64, Digest)> {
    let mut hasher = Sha256::new();
    let mut total = 0u64;
    loop {
        match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                total += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok((total, finalize(hasher)))
}

fn finalize(hasher: Sha256) -> Digest {
    Digest(hasher.finalize().into())
}
