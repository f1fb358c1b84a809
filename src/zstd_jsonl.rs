use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder;

/// A `Read` wrapper that counts compressed bytes read.
pub struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

pub type ArchiveDecoder = Decoder<'static, BufReader<CountingReader<File>>>;

/// Lazy sequence of raw NDJSON lines pulled from any byte source in fixed-size chunks.
///
/// Only the current chunk plus the unfinished tail of the buffer is kept, so working
/// memory is bounded by `chunk_bytes + longest line`. Empty lines are dropped and a
/// trailing `\r` is stripped. A read error is yielded once and ends the sequence.
pub struct ArchiveLines<R: Read> {
    reader: R,
    chunk: Vec<u8>,
    buf: Vec<u8>,
    start: usize,   // first unconsumed byte in `buf`
    scanned: usize, // bytes after `start` already known to hold no newline
    done: bool,
}

impl<R: Read> ArchiveLines<R> {
    pub fn new(reader: R, chunk_bytes: usize) -> Self {
        let cap = chunk_bytes.max(1);
        Self {
            reader,
            chunk: vec![0u8; cap],
            buf: Vec::with_capacity(cap),
            start: 0,
            scanned: 0,
            done: false,
        }
    }

    fn take_line(&mut self, end: usize) -> Vec<u8> {
        let mut line = self.buf[self.start..end].to_vec();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        line
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }
}

impl<R: Read> Iterator for ArchiveLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let from = self.start + self.scanned;
            if let Some(off) = self.buf[from..].iter().position(|&b| b == b'\n') {
                let end = from + off;
                let line = self.take_line(end);
                self.start = end + 1;
                self.scanned = 0;
                if line.is_empty() {
                    continue;
                }
                return Some(Ok(line));
            }
            self.scanned = self.buf.len() - self.start;

            if self.done {
                if self.start < self.buf.len() {
                    let end = self.buf.len();
                    let line = self.take_line(end);
                    self.start = end;
                    self.scanned = 0;
                    if !line.is_empty() {
                        return Some(Ok(line));
                    }
                }
                return None;
            }

            self.compact();
            match self.reader.read(&mut self.chunk) {
                Ok(0) => self.done = true,
                Ok(n) => self.buf.extend_from_slice(&self.chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    self.buf.clear();
                    self.start = 0;
                    self.scanned = 0;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Open a zstd NDJSON archive for streaming.
///
/// We request `window_log_max` up front (31 for the long-window dumps) to avoid
/// "Frame requires too much memory". The returned counter tracks compressed bytes
/// consumed so callers can drive a byte progress bar.
pub fn open_archive(
    path: &Path,
    chunk_bytes: usize,
    window_log_max: u32,
) -> Result<(ArchiveLines<ArchiveDecoder>, Arc<AtomicU64>)> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let counter = Arc::new(AtomicU64::new(0));
    let cnt = CountingReader { inner: file, counter: counter.clone() };
    let mut decoder = Decoder::new(cnt).with_context(|| format!("init decoder for {}", path.display()))?;
    decoder
        .window_log_max(window_log_max)
        .with_context(|| format!("set window_log_max={} for {}", window_log_max, path.display()))?;
    Ok((ArchiveLines::new(decoder, chunk_bytes), counter))
}

// ----------------------------- Integrity checks ----------------------------------

/// Mode for archive integrity checks.
#[derive(Clone, Copy, Debug)]
pub enum IntegrityMode {
    /// Decode only the first `sample_bytes` (decompressed).
    /// Fast and catches header corruption; cannot detect late/trailing corruption.
    Quick { sample_bytes: u64 },
    /// Decode the entire stream; slowest but validates checksums.
    Full,
}

/// Decode the archive according to `mode` with the same window limit the filter uses,
/// discarding output.
pub fn check_archive(path: &Path, mode: IntegrityMode, window_log_max: u32) -> Result<()> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let mut decoder = Decoder::new(file)?;
    decoder
        .window_log_max(window_log_max)
        .with_context(|| format!("set window_log_max={} for {}", window_log_max, path.display()))?;
    let res = match mode {
        IntegrityMode::Quick { sample_bytes } => io::copy(&mut decoder.take(sample_bytes), &mut io::sink()),
        IntegrityMode::Full => io::copy(&mut decoder, &mut io::sink()),
    };
    res.with_context(|| format!("decode {}", path.display()))?;
    Ok(())
}
