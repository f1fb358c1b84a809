//! Streaming primitives: the one-pass archive filter that consumes a lazy line
//! sequence and appends matching rows to a CSV sink.

use crate::config::RecordKind;
use crate::filters::{classify_line, Allowlist, LineOutcome, SkipReason};
use crate::util::{append_with_backoff, open_with_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Counters for one archive pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub written: u64,
    pub skipped: u64,
    /// Lines from communities outside the allow-list (never written, never skipped).
    pub out_of_scope: u64,
    pub malformed: u64,
    pub missing_community: u64,
    pub invalid: u64,
}

impl FilterStats {
    fn record_skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        match reason {
            SkipReason::Malformed => self.malformed += 1,
            SkipReason::MissingCommunity => self.missing_community += 1,
            SkipReason::Invalid => self.invalid += 1,
        }
    }

    /// The `(written, skipped)` pair reported per archive.
    pub fn counts(&self) -> (u64, u64) {
        (self.written, self.skipped)
    }
}

/// Filter every line of `lines` into `out`. Read errors abort the pass; rows already
/// handed to `out` stay there.
pub fn stream_lines<I, W>(
    lines: I,
    kind: RecordKind,
    allow: &Allowlist,
    fields: &[String],
    human_timestamps: bool,
    out: &mut csv::Writer<W>,
    mut on_line: impl FnMut(),
) -> Result<FilterStats>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
    W: Write,
{
    let mut stats = FilterStats::default();
    for (i, line) in lines.enumerate() {
        let line = line.with_context(|| format!("decode failed after {} lines", i))?;
        match classify_line(&line, kind, allow, fields, human_timestamps) {
            LineOutcome::Keep(row) => {
                out.write_record(&row)?;
                stats.written += 1;
            }
            LineOutcome::OutOfScope => stats.out_of_scope += 1,
            LineOutcome::Skip(reason) => stats.record_skip(reason),
        }
        on_line();
    }
    out.flush()?;
    Ok(stats)
}

/// Open `path` as an append-mode CSV sink. The header is written only when the file is
/// new or empty; an existing file with a different header is appended to with a warning.
/// An unterminated last row left by an interrupted run is dropped first.
pub fn open_append_csv(path: &Path, fields: &[String], write_buf: usize) -> Result<csv::Writer<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
    }
    let mut existing_len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if existing_len > 0 && !ends_with_newline(path, existing_len)? {
        existing_len = drop_partial_row(path, existing_len)?;
    }
    if existing_len > 0 {
        warn_on_header_mismatch(path, fields);
    }

    let f = append_with_backoff(path, 16, 50).with_context(|| format!("open for append {}", path.display()))?;
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(write_buf.max(8 * 1024), f));
    if existing_len == 0 {
        w.write_record(fields)?;
    }
    Ok(w)
}

fn ends_with_newline(path: &Path, len: u64) -> Result<bool> {
    let mut f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    f.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// An interrupted run can leave the last record unterminated. Cut the file back to
/// where that record starts so the next append begins on a fresh row. Returns the new length.
fn drop_partial_row(path: &Path, len: u64) -> Result<u64> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(f));
    let mut rec = csv::ByteRecord::new();
    let mut last_start = 0u64;
    while rdr
        .read_byte_record(&mut rec)
        .with_context(|| format!("scan {}", path.display()))?
    {
        last_start = rec.position().map(|p| p.byte()).unwrap_or(last_start);
    }

    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|f| f.set_len(last_start))
        .with_context(|| format!("truncate {}", path.display()))?;
    tracing::warn!(
        path = %path.display(),
        dropped_bytes = len - last_start,
        "Dropped unterminated trailing row before appending"
    );
    Ok(last_start)
}

fn warn_on_header_mismatch(path: &Path, fields: &[String]) {
    let header = open_with_backoff(path, 16, 50).ok().and_then(|f| {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(BufReader::new(f));
        rdr.headers().ok().map(|h| h.iter().map(str::to_string).collect::<Vec<_>>())
    });
    if let Some(h) = header {
        if h != fields {
            tracing::warn!(path=%path.display(), existing=?h, expected=?fields, "Appending to CSV with a different header");
        }
    }
}
