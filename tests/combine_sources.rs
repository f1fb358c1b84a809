#[path = "common/mod.rs"]
mod common;

use common::*;
use ibd_corpus::{
    high_missing_columns, reconcile_columns, union_tables, Cell, CorpusETL, NamedSource, Reconciled, Table,
};
use regex::Regex;

fn limited() -> Regex {
    Regex::new(r"(?i)last\d+|_\d+$").unwrap()
}

fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut t = Table::new(columns.iter().copied());
    for r in rows {
        t.push_row(r.iter().map(|s| Cell::from_field(s)).collect()).unwrap();
    }
    t
}

#[test]
fn limited_window_sources_get_canonical_comment_column() {
    let mut t = table(&["id", "author_comments"], &[&["a", "['x']"]]);
    assert_eq!(reconcile_columns("crohnsdisease_last500", &mut t, &limited()), Reconciled::Renamed);
    assert_eq!(t.columns(), &["id", "comments"]);

    let mut both = table(&["comments", "author_comments"], &[&["[]", "[]"]]);
    assert_eq!(reconcile_columns("ibd_2024", &mut both, &limited()), Reconciled::AlreadyCanonical);
    assert_eq!(both.columns(), &["comments", "author_comments"]);

    let mut neither = table(&["id"], &[&["a"]]);
    assert_eq!(reconcile_columns("IBD_LAST100", &mut neither, &limited()), Reconciled::NoCommentColumn);

    let mut historical = table(&["author_comments"], &[&["[]"]]);
    assert_eq!(
        reconcile_columns("CrohnsDisease_historical", &mut historical, &limited()),
        Reconciled::NotApplicable
    );
    assert_eq!(historical.columns(), &["author_comments"]);
}

/// Rows are concatenated in source order over the union of columns; cells a source
/// has no column for are missing. Duplicated rows are kept.
#[test]
fn union_fills_missing_and_keeps_every_row() {
    let a = table(&["id", "title"], &[&["1", "t1"], &["2", "t2"]]);
    let b = table(&["id", "comments", "title"], &[&["3", "[]", "t3"], &["3", "[]", "t3"]]);

    let u = union_tables(vec![a, b]);

    assert_eq!(u.columns(), &["id", "title", "comments"]);
    assert_eq!(u.len(), 4);
    assert_eq!(u.get(0, "comments"), Some(&Cell::Missing));
    assert_eq!(u.get(2, "title"), Some(&Cell::text("t3")));
    assert_eq!(u.rows()[2], u.rows()[3]);
}

#[test]
fn high_missing_is_strictly_above_threshold() {
    let t = table(&["a", "b", "c"], &[&["1", "", ""], &["2", "x", ""]]);
    let high = high_missing_columns(&t, 0.5);
    assert_eq!(high.len(), 1);
    let (col, n, frac) = &high[0];
    assert_eq!(col, "c");
    assert_eq!(*n, 2);
    assert!((frac - 1.0).abs() < f64::EPSILON);
    assert!(high_missing_columns(&Table::new(["a"]), 0.5).is_empty());
}

/// A source that fails to load is reported and left out; the rest are combined and
/// written, creating the output directory.
#[test]
fn combine_skips_failed_sources_and_reports() {
    let dir = tempdir_path();
    let hist = dir.join("CrohnsDisease_combined_data.csv");
    write_csv(
        &hist,
        &[
            &["id", "subreddit", "title", "comments", "score"],
            &["p1", "CrohnsDisease", "Flare", "['a']", "3"],
            &["p2", "CrohnsDisease", "Diet", "[]", "1"],
        ],
    );
    let live = dir.join("ibd_last100_20240102.csv");
    write_csv(
        &live,
        &[&["id", "subreddit", "title", "author_comments"], &["q1", "IBD", "New here", "['hi']"]],
    );

    let sources = vec![
        NamedSource::new("CrohnsDisease_historical", &hist),
        NamedSource::new("ibd_last100", &live),
        NamedSource::new("ghost_last50", dir.join("missing.csv")),
    ];
    let out = dir.join("processed").join("unified.csv");
    let (unified, report) = CorpusETL::new().progress(false).combine(&sources, &out).unwrap();

    assert_eq!(unified.len(), 3);
    assert_eq!(unified.columns(), &["id", "subreddit", "title", "comments", "score"]);
    assert_eq!(unified.get(2, "comments"), Some(&Cell::text("['hi']")));
    assert_eq!(unified.get(2, "score"), Some(&Cell::Missing));

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.total_columns, 5);
    assert_eq!(
        report.loaded,
        vec![("CrohnsDisease_historical".to_string(), 2), ("ibd_last100".to_string(), 1)]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "ghost_last50");
    assert_eq!(
        report.per_community,
        vec![("CrohnsDisease".to_string(), 2), ("IBD".to_string(), 1)]
    );
    assert!(report.high_missing.is_empty());

    assert_eq!(column(&out, "id"), vec!["p1", "p2", "q1"]);
    assert_eq!(column(&out, "score"), vec!["3", "1", ""]);
}

#[test]
fn combine_with_no_loadable_source_fails() {
    let dir = tempdir_path();
    let res = CorpusETL::new()
        .progress(false)
        .combine(&[NamedSource::new("x", dir.join("nope.csv"))], &dir.join("out.csv"));
    assert!(res.is_err());
}

/// An empty file has no header and is reported as a failed source.
#[test]
fn combine_reports_empty_file_as_failed() {
    let dir = tempdir_path();
    let good = dir.join("good.csv");
    write_csv(&good, &[&["id", "subreddit"], &["p1", "IBD"]]);
    let empty = dir.join("ibd_last100_20240102.csv");
    std::fs::write(&empty, "").unwrap();

    assert!(Table::read_csv(&empty).is_err());

    let sources = vec![NamedSource::new("good", &good), NamedSource::new("ibd_last100", &empty)];
    let (unified, report) = CorpusETL::new()
        .progress(false)
        .combine(&sources, &dir.join("out.csv"))
        .unwrap();

    assert_eq!(unified.len(), 1);
    assert_eq!(report.loaded, vec![("good".to_string(), 1)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "ibd_last100");
}
