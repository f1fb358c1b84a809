#[path = "common/mod.rs"]
mod common;

use common::*;
use ibd_corpus::{join_comments, parse_list, strip_type_prefix, Cell, CorpusETL, RecordKind, Table};

fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut t = Table::new(columns.iter().copied());
    for r in rows {
        t.push_row(r.iter().map(|s| Cell::from_field(s)).collect()).unwrap();
    }
    t
}

#[test]
fn prefix_is_stripped_only_at_the_start() {
    assert_eq!(strip_type_prefix("t3_abc", "t3_"), "abc");
    assert_eq!(strip_type_prefix("abc", "t3_"), "abc");
    assert_eq!(strip_type_prefix("xt3_abc", "t3_"), "xt3_abc");
    assert_eq!(strip_type_prefix("t1_abc", "t3_"), "t1_abc");
}

/// Every post keeps its position; comments are attached in source order and the
/// count matches the list length. Posts without comments get an empty list.
#[test]
fn join_attaches_comments_in_order() {
    let posts = table(&["id", "title"], &[&["p1", "first"], &["p2", "second"], &["p3", "third"]]);
    let comments = table(
        &["id", "body", "link_id"],
        &[
            &["c1", "one", "t3_p2"],
            &["c2", "two", "t3_p1"],
            &["c3", "three", "t3_p2"],
            &["c4", "stray", "t3_zz"],
            &["c5", "", "t3_p1"],
            &["c6", "unlinked", ""],
        ],
    );

    let (joined, stats) = join_comments(&comments, &posts, "link_id", "t3_").unwrap();

    assert_eq!(joined.columns(), &["id", "title", "comments", "comment_count"]);
    assert_eq!(joined.len(), 3);
    assert_eq!(joined.get(0, "comments"), Some(&Cell::List(vec!["two".into()])));
    assert_eq!(joined.get(1, "comments"), Some(&Cell::List(vec!["one".into(), "three".into()])));
    assert_eq!(joined.get(2, "comments"), Some(&Cell::List(vec![])));
    assert_eq!(joined.get(1, "comment_count"), Some(&Cell::text("2")));
    assert_eq!(joined.get(2, "comment_count"), Some(&Cell::text("0")));

    assert_eq!(stats.posts, 3);
    assert_eq!(stats.comments_indexed, 4);
    assert_eq!(stats.comments_ignored, 2);
    assert_eq!(stats.comments_joined, 3);
    assert_eq!(stats.posts_with_comments, 2);
    assert_eq!(stats.posts_without_comments, 1);
}

#[test]
fn join_requires_link_and_id_columns() {
    let posts = table(&["id"], &[&["p1"]]);
    let no_link = table(&["id", "body"], &[&["c1", "x"]]);
    assert!(join_comments(&no_link, &posts, "link_id", "t3_").is_err());

    let comments = table(&["body", "link_id"], &[&["x", "t3_p1"]]);
    let no_id = table(&["title"], &[&["t"]]);
    assert!(join_comments(&comments, &no_id, "link_id", "t3_").is_err());
}

/// Filtered archive CSVs joined on disk; the list column is persisted as a literal
/// sequence that parses back to the same comments.
#[test]
fn join_files_persists_literal_lists() {
    let raw = make_archive_dir();
    let interim = raw.parent().unwrap().join("interim");
    let etl = CorpusETL::new().progress(false);
    let posts_csv = interim.join("posts.csv");
    let comments_csv = interim.join("comments.csv");
    etl.filter_archive(&raw.join("CrohnsDisease_submissions.zst"), RecordKind::Post, &posts_csv)
        .unwrap();
    etl.filter_archive(&raw.join("CrohnsDisease_comments.zst"), RecordKind::Comment, &comments_csv)
        .unwrap();

    let out = interim.join("CrohnsDisease_combined_data.csv");
    let stats = etl.join_files(&comments_csv, &posts_csv, &out).unwrap();
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.comments_joined, 3);

    let lists = column(&out, "comments");
    assert_eq!(
        parse_list(&lists[0]).unwrap(),
        vec!["Hang in there.".to_string(), "Same here, it gets better.".to_string()]
    );
    assert_eq!(parse_list(&lists[1]).unwrap(), vec!["Yes, it helped me.".to_string()]);
    assert_eq!(column(&out, "comment_count"), vec!["2", "1"]);
    assert_eq!(column(&out, "id"), vec!["p1", "p2"]);
}

#[test]
fn join_files_missing_input_is_fatal() {
    let dir = tempdir_path();
    let posts = dir.join("posts.csv");
    write_csv(&posts, &[&["id", "title"], &["p1", "t"]]);

    let res = CorpusETL::new()
        .progress(false)
        .join_files(&dir.join("absent.csv"), &posts, &dir.join("out.csv"));
    assert!(res.is_err());
    assert!(!dir.join("out.csv").exists());
}
