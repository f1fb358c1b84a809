use anyhow::{Context, Result};

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Lowercase, trim, and drop a leading `r/`.
#[inline]
pub fn normalize_community(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if let Some(rest) = s.strip_prefix("r/") { rest.to_string() } else { s }
}

// -------- allow-list defaults + merging from env/file --------

/// The IBD support communities covered by the corpus (normalized, sorted).
pub fn default_communities() -> Vec<String> {
    let defaults = [
        "crohnsdisease",
        "ulcerativecolitis",
        "ibd",
        "crohnsandcolitis",
        "crohnsdiseasediet",
        "ulcerativecolitisrdla",
        "ibddiet",
        "ulcerativecolitisdiet",
    ];
    let mut v: Vec<String> = defaults.iter().map(|s| normalize_community(s)).collect();
    v.sort();
    v.dedup();
    v
}

/// Merge extra communities from env/file into the provided vector (in-place).
/// - CORPUS_EXTRA_COMMUNITIES: comma/semicolon/space separated names
/// - CORPUS_COMMUNITIES_FILE: path to newline-separated file of names
/// All entries are normalized, then the list is sort+dedup.
pub fn merge_extra_communities(target: &mut Vec<String>) {
    use std::io::{BufRead, BufReader};

    if let Ok(s) = std::env::var("CORPUS_EXTRA_COMMUNITIES") {
        for raw in s.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
            let n = normalize_community(raw);
            if !n.is_empty() {
                target.push(n);
            }
        }
    }

    if let Ok(path) = std::env::var("CORPUS_COMMUNITIES_FILE") {
        if !path.trim().is_empty() {
            if let Ok(f) = File::open(&path) {
                let r = BufReader::new(f);
                for line in r.lines().map_while(|l| l.ok()) {
                    let n = normalize_community(&line);
                    if !n.is_empty() {
                        target.push(n);
                    }
                }
            } else {
                tracing::warn!("CORPUS_COMMUNITIES_FILE is set but cannot be opened: {}", path);
            }
        }
    }

    for s in target.iter_mut() {
        *s = normalize_community(s);
    }
    target.sort();
    target.dedup();
}

// -------- robust open/create with backoff (Windows-friendly) --------

use std::fs;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

/// Return true for transient/retriable I/O errors often seen on Windows when
/// filter drivers (AV/backup), USB/NAS volumes, or sharing violations occur.
#[cfg(windows)]
fn is_retriable_io_error(e: &io::Error) -> bool {
    // 5 access denied, 32 sharing violation, 33 lock violation, 21 device not ready,
    // 1224 user-mapped section open
    matches!(e.raw_os_error(), Some(5) | Some(32) | Some(33) | Some(21) | Some(1224))
}

// Those codes mean EIO/EISDIR/... elsewhere; nothing is retried.
#[cfg(not(windows))]
fn is_retriable_io_error(_e: &io::Error) -> bool {
    false
}

fn with_backoff<T>(
    tries: usize,
    delay_ms: u64,
    what: &str,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, format!("{what} failed"))))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "open", || File::open(path))
}

/// Create (truncate) a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "create", || File::create(path))
}

/// Open a file for appending (creating it if needed) with retries/backoff.
pub fn append_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "append", || {
        OpenOptions::new().create(true).append(true).open(path)
    })
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    match with_backoff(tries, delay_ms, "remove", || fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Atomically replace `dest` with `tmp` (Windows-friendly).
/// If rename fails (e.g., due to sharing), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    match with_backoff(tries, delay_ms, "rename", || fs::rename(tmp, dest)) {
        Ok(()) => Ok(()),
        Err(_) => {
            if dest.exists() {
                remove_with_backoff(dest, tries, delay_ms)?;
            }
            with_backoff(tries, delay_ms, "copy", || fs::copy(tmp, dest))
                .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
            remove_with_backoff(tmp, tries, delay_ms)
        }
    }
}

/// Write `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json_report<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    use std::io::{BufWriter, Write};

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
    }
    let f = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value).with_context(|| format!("serialize report to {}", path.display()))?;
    w.flush()?;
    Ok(())
}
