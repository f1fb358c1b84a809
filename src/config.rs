use crate::util::{default_communities, merge_extra_communities, normalize_community};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Community field shared by posts and comments.
pub const COMMUNITY_FIELD: &str = "subreddit";

pub const POST_FIELDS: [&str; 8] = [
    "id", "subreddit", "author", "title", "selftext", "created_utc", "score", "num_comments",
];
pub const COMMENT_FIELDS: [&str; 8] = [
    "id", "subreddit", "author", "body", "created_utc", "score", "parent_id", "link_id",
];

/// Archive record kind (submissions vs comments dumps).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Post,    // <Community>_submissions.zst
    Comment, // <Community>_comments.zst
}

impl RecordKind {
    pub fn default_fields(self) -> &'static [&'static str] {
        match self {
            RecordKind::Post => &POST_FIELDS,
            RecordKind::Comment => &COMMENT_FIELDS,
        }
    }

    /// Plural file stem used by the archive dumps and the filtered CSVs.
    pub fn file_stem(self) -> &'static str {
        match self {
            RecordKind::Post => "submissions",
            RecordKind::Comment => "comments",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Post => write!(f, "post"),
            RecordKind::Comment => write!(f, "comment"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "post" | "posts" | "submission" | "submissions" => Ok(RecordKind::Post),
            "comment" | "comments" => Ok(RecordKind::Comment),
            other => Err(format!("unknown record kind '{other}' (expected post or comment)")),
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CorpusOptions {
    pub communities: Vec<String>,        // normalized lowercase, sorted + dedup
    pub post_fields: Vec<String>,
    pub comment_fields: Vec<String>,

    // archive decoding
    pub chunk_bytes: usize,              // decompressed bytes pulled per read
    pub window_log_max: u32,             // zstd long-window archives need 31

    pub write_buffer_bytes: usize,       // BufWriter capacity
    pub progress: bool,                  // show progress bars
    pub progress_label: Option<String>,  // optional label for progress bars

    // output formatting
    pub human_readable_timestamps: bool, // created_utc as RFC3339 in filtered rows

    // joiner
    pub link_column: String,             // comment column carrying the post reference
    pub link_prefix: String,             // type marker stripped from the reference

    // combiner
    pub limited_window_pattern: Regex,   // names of "last N" snapshot sources
    pub missing_threshold: f64,          // report columns missing in more than this fraction

    // structurer
    pub comment_max_chars: usize,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        let mut communities = default_communities();
        merge_extra_communities(&mut communities);

        Self {
            communities,
            post_fields: owned(RecordKind::Post.default_fields()),
            comment_fields: owned(RecordKind::Comment.default_fields()),
            chunk_bytes: 1 << 20,
            window_log_max: 31,
            write_buffer_bytes: 256 * 1024,
            progress: true,
            progress_label: None,
            human_readable_timestamps: false,
            link_column: "link_id".to_string(),
            link_prefix: "t3_".to_string(),
            limited_window_pattern: limited_window_regex(),
            missing_threshold: 0.5,
            comment_max_chars: 500,
        }
    }
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|s| s.to_string()).collect()
}

fn limited_window_regex() -> Regex {
    Regex::new(r"(?i)last\d+|_\d+$").expect("static regex")
}

impl CorpusOptions {
    /// Field set projected for `kind`.
    pub fn fields_for(&self, kind: RecordKind) -> &[String] {
        match kind {
            RecordKind::Post => &self.post_fields,
            RecordKind::Comment => &self.comment_fields,
        }
    }

    /// Replace the allow-list (no env augmentation is applied here).
    pub fn with_communities<I, S>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut v: Vec<String> = communities
            .into_iter()
            .map(|s| normalize_community(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        v.sort();
        v.dedup();
        self.communities = v;
        self
    }
    pub fn with_fields<I, S>(mut self, kind: RecordKind, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let v = fields.into_iter().map(Into::into).collect();
        match kind {
            RecordKind::Post => self.post_fields = v,
            RecordKind::Comment => self.comment_fields = v,
        }
        self
    }
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }
    pub fn with_window_log_max(mut self, log: u32) -> Self {
        self.window_log_max = log;
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_readable_timestamps = yes;
        self
    }
    pub fn with_link(mut self, column: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.link_column = column.into();
        self.link_prefix = prefix.into();
        self
    }
    pub fn with_limited_window_pattern(mut self, re: Regex) -> Self {
        self.limited_window_pattern = re;
        self
    }
    pub fn with_missing_threshold(mut self, frac: f64) -> Self {
        self.missing_threshold = frac.clamp(0.0, 1.0);
        self
    }
    pub fn with_comment_max_chars(mut self, n: usize) -> Self {
        self.comment_max_chars = n;
        self
    }
}
