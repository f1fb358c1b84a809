#[path = "common/mod.rs"]
mod common;

use common::*;
use ibd_corpus::{discover_archives, discover_live_snapshots, discover_live_sources, RecordKind};
use std::fs;

#[test]
fn archives_are_found_by_name() {
    let raw = make_archive_dir();
    fs::write(raw.join("notes.txt"), "ignore me").unwrap();
    fs::write(raw.join("IBD_users.zst"), "").unwrap();

    let jobs = discover_archives(&raw);
    let found: Vec<(&str, RecordKind)> = jobs.iter().map(|j| (j.community.as_str(), j.kind)).collect();
    assert_eq!(
        found,
        vec![
            ("CrohnsDisease", RecordKind::Comment),
            ("CrohnsDisease", RecordKind::Post),
            ("UlcerativeColitis", RecordKind::Post),
        ]
    );
    assert_eq!(jobs[0].output_file_name(), "CrohnsDisease_historical_comments.csv");
    assert!(discover_archives(&raw.join("absent")).is_empty());
}

#[test]
fn live_snapshots_parse_limit_and_date() {
    let dir = tempdir_path();
    write_csv(&dir.join("crohnsdisease_last500_20240315.csv"), &[&["id"], &["a"]]);
    write_csv(&dir.join("ibd_last100_20241301.csv"), &[&["id"], &["b"]]);
    write_csv(&dir.join("CrohnsDisease_historical_comments.csv"), &[&["id"], &["c"]]);

    let snaps = discover_live_snapshots(&dir);
    assert_eq!(snaps.len(), 1, "invalid month and non-snapshot names are ignored");
    assert_eq!(snaps[0].community, "crohnsdisease");
    assert_eq!(snaps[0].limit, 500);
    assert_eq!(snaps[0].date, time::macros::date!(2024 - 03 - 15));

    let sources = discover_live_sources(&dir);
    assert_eq!(sources[0].name, "crohnsdisease_last500");
    assert_eq!(sources[0].path, dir.join("crohnsdisease_last500_20240315.csv"));
}

#[test]
fn record_kind_parses_file_stems() {
    assert_eq!("submissions".parse::<RecordKind>().unwrap(), RecordKind::Post);
    assert_eq!("Comments".parse::<RecordKind>().unwrap(), RecordKind::Comment);
    assert!("users".parse::<RecordKind>().is_err());
}
