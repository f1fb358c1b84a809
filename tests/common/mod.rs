use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Write `rows` (header first) as a CSV file.
pub fn write_csv(path: &Path, rows: &[&[&str]]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut w = csv::Writer::from_path(path).unwrap();
    for r in rows {
        w.write_record(*r).unwrap();
    }
    w.flush().unwrap();
}

/// Read a CSV file into `(header, rows)` as plain strings.
pub fn read_csv_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut r = csv::ReaderBuilder::new().flexible(true).from_path(path).unwrap();
    let header = r.headers().unwrap().iter().map(str::to_string).collect();
    let rows = r
        .records()
        .map(|rec| rec.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

/// Value of `column` in every row.
pub fn column(path: &Path, column: &str) -> Vec<String> {
    let (header, rows) = read_csv_rows(path);
    let idx = header.iter().position(|h| h == column).unwrap();
    rows.into_iter().map(|mut r| r.swap_remove(idx)).collect()
}

pub fn tempdir_path() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// Build a small archive directory:
/// - `CrohnsDisease_submissions.zst`: p1 (title+body), p2 (body only), p3 (empty, invalid),
///   one AskReddit post (out of scope) and one malformed line.
/// - `CrohnsDisease_comments.zst`: two comments on p1, one on p2, one with an empty body
///   and one without a community.
/// - `UlcerativeColitis_submissions.zst`: a single post u1.
pub fn make_archive_dir() -> PathBuf {
    let base = tempdir_path().join("raw");

    let posts = vec![
        json!({"id":"p1","subreddit":"CrohnsDisease","author":"ann","title":"Flare after surgery",
               "selftext":"Week two and still sore.","created_utc":1609459200,"score":12,"num_comments":2})
        .to_string(),
        json!({"id":"p2","subreddit":"crohnsdisease","author":"ben","title":"",
               "selftext":"Anyone tried the new biologic?","created_utc":1609462800,"score":3,"num_comments":1})
        .to_string(),
        json!({"id":"p3","subreddit":"CrohnsDisease","author":"cat","title":"","selftext":"",
               "created_utc":1609466400,"score":0,"num_comments":0})
        .to_string(),
        json!({"id":"x1","subreddit":"AskReddit","author":"dan","title":"Unrelated",
               "selftext":"","created_utc":1609470000,"score":99,"num_comments":0})
        .to_string(),
        "{not json".to_string(),
    ];
    write_zst_lines(&base.join("CrohnsDisease_submissions.zst"), &posts);

    let comments = vec![
        json!({"id":"c1","subreddit":"CrohnsDisease","author":"eve","body":"Hang in there.",
               "created_utc":1609459300,"score":4,"parent_id":"t3_p1","link_id":"t3_p1"})
        .to_string(),
        json!({"id":"c2","subreddit":"CrohnsDisease","author":"fay","body":"Same here, it gets better.",
               "created_utc":1609459400,"score":2,"parent_id":"t1_c1","link_id":"t3_p1"})
        .to_string(),
        json!({"id":"c3","subreddit":"CrohnsDisease","author":"gus","body":"Yes, it helped me.",
               "created_utc":1609462900,"score":1,"parent_id":"t3_p2","link_id":"t3_p2"})
        .to_string(),
        json!({"id":"c4","subreddit":"CrohnsDisease","author":"hal","body":"",
               "created_utc":1609463000,"score":1,"parent_id":"t3_p2","link_id":"t3_p2"})
        .to_string(),
        json!({"id":"c5","author":"ivy","body":"orphan","created_utc":1609463100,"link_id":"t3_p2"}).to_string(),
    ];
    write_zst_lines(&base.join("CrohnsDisease_comments.zst"), &comments);

    let uc_posts = vec![json!({"id":"u1","subreddit":"UlcerativeColitis","author":"jo","title":"Diet tips?",
                               "selftext":"","created_utc":1609480000,"score":5,"num_comments":0})
    .to_string()];
    write_zst_lines(&base.join("UlcerativeColitis_submissions.zst"), &uc_posts);

    base
}

/// Add an archive with non-zstd contents to `dir`.
pub fn add_corrupt_archive(dir: &Path) -> PathBuf {
    let p = dir.join("IBD_comments.zst");
    fs::write(&p, b"this is definitely not a zstd frame").unwrap();
    p
}
