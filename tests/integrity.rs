#[path = "common/mod.rs"]
mod common;

use common::*;
use ibd_corpus::{check_archive, CorpusETL, IntegrityMode};

/// A directory with one non-zstd archive: both modes flag exactly that file and
/// leave the healthy ones alone.
#[test]
fn integrity_check_detects_corrupt_archive() {
    let raw = make_archive_dir();
    let bad = add_corrupt_archive(&raw);
    let etl = CorpusETL::new().progress(false);

    let quick = etl.check_archives(&raw, IntegrityMode::Quick { sample_bytes: 64 * 1024 }).unwrap();
    assert_eq!(quick.len(), 1, "quick integrity should flag the corrupt file");
    assert_eq!(quick[0].0, bad);

    let full = etl.check_archives(&raw, IntegrityMode::Full).unwrap();
    assert_eq!(full.len(), 1, "full integrity should also flag the corrupt file");
}

#[test]
fn integrity_check_passes_valid_archives() {
    let raw = make_archive_dir();
    assert!(check_archive(&raw.join("CrohnsDisease_comments.zst"), IntegrityMode::Full, 31).is_ok());
    assert!(CorpusETL::new()
        .progress(false)
        .check_archives(&raw, IntegrityMode::Full)
        .unwrap()
        .is_empty());
}

/// Truncating a valid archive is caught by a full decode.
#[test]
fn integrity_full_detects_truncation() {
    let raw = make_archive_dir();
    let p = raw.join("CrohnsDisease_submissions.zst");
    let bytes = std::fs::read(&p).unwrap();
    std::fs::write(&p, &bytes[..bytes.len() / 2]).unwrap();

    assert!(check_archive(&p, IntegrityMode::Full, 31).is_err());
}

/// The sweep decodes with the configured window limit: a limit below the frame's
/// window size rejects archives the default accepts.
#[test]
fn integrity_uses_configured_window_limit() {
    let raw = make_archive_dir();

    let strict = CorpusETL::new()
        .progress(false)
        .window_log_max(10)
        .check_archives(&raw, IntegrityMode::Quick { sample_bytes: 64 * 1024 })
        .unwrap();
    assert_eq!(strict.len(), 3);

    let default = CorpusETL::new()
        .progress(false)
        .check_archives(&raw, IntegrityMode::Quick { sample_bytes: 64 * 1024 })
        .unwrap();
    assert!(default.is_empty());
}
