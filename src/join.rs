//! Comment → post association: an immutable index from bare post id to the ordered
//! comment bodies, followed by a lookup pass over the posts table.

use crate::progress::ProgressScope;
use crate::table::{Cell, Table};
use ahash::AHashMap;
use anyhow::{bail, Result};
use serde::Serialize;

pub const POST_ID_COLUMN: &str = "id";
pub const COMMENT_BODY_COLUMN: &str = "body";
pub const COMMENTS_COLUMN: &str = "comments";
pub const COMMENT_COUNT_COLUMN: &str = "comment_count";

/// Strip the type marker from a link reference (`t3_abc` → `abc`); other values pass through.
#[inline]
pub fn strip_type_prefix<'a>(link: &'a str, prefix: &str) -> &'a str {
    link.strip_prefix(prefix).unwrap_or(link)
}

/// Post id → comment bodies in source-file order.
#[derive(Debug, Default)]
pub struct CommentIndex {
    map: AHashMap<String, Vec<String>>,
    indexed: u64,
    ignored: u64,
}

impl CommentIndex {
    /// Group the comments table by its cleaned link column in one pass.
    /// Comments without a link or a body are counted as ignored.
    pub fn build(comments: &Table, link_column: &str, prefix: &str, progress: &ProgressScope) -> Result<Self> {
        let link_idx = require_column(comments, link_column, "comments")?;
        let body_idx = require_column(comments, COMMENT_BODY_COLUMN, "comments")?;

        let mut index = CommentIndex::default();
        for row in comments.rows() {
            progress.inc(1);
            match (row[link_idx].as_text(), row[body_idx].as_text()) {
                (Some(link), Some(body)) => {
                    let post_id = strip_type_prefix(link.trim(), prefix);
                    index.map.entry(post_id.to_string()).or_default().push(body.to_string());
                    index.indexed += 1;
                }
                _ => index.ignored += 1,
            }
        }
        Ok(index)
    }

    pub fn get(&self, post_id: &str) -> &[String] {
        self.map.get(post_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct posts referenced by at least one comment.
    pub fn posts(&self) -> usize {
        self.map.len()
    }
    pub fn indexed(&self) -> u64 {
        self.indexed
    }
    pub fn ignored(&self) -> u64 {
        self.ignored
    }
}

fn require_column(table: &Table, name: &str, what: &str) -> Result<usize> {
    match table.column_index(name) {
        Some(i) => Ok(i),
        None => bail!("{} table has no '{}' column (columns: {:?})", what, name, table.columns()),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub posts: u64,
    pub comments_indexed: u64,
    pub comments_ignored: u64,
    pub comments_joined: u64,
    pub posts_with_comments: u64,
    pub posts_without_comments: u64,
}

/// Attach `comments` (list) and `comment_count` to every post, in post order.
pub fn attach_comments(posts: &Table, index: &CommentIndex, progress: &ProgressScope) -> Result<(Table, JoinStats)> {
    let id_idx = require_column(posts, POST_ID_COLUMN, "posts")?;

    let mut stats = JoinStats {
        posts: posts.len() as u64,
        comments_indexed: index.indexed(),
        comments_ignored: index.ignored(),
        ..Default::default()
    };
    let mut lists = Vec::with_capacity(posts.len());
    let mut counts = Vec::with_capacity(posts.len());
    for row in posts.rows() {
        progress.inc(1);
        let found = row[id_idx].as_text().map(|id| index.get(id.trim())).unwrap_or(&[]);
        if found.is_empty() {
            stats.posts_without_comments += 1;
        } else {
            stats.posts_with_comments += 1;
            stats.comments_joined += found.len() as u64;
        }
        counts.push(Cell::text(found.len().to_string()));
        lists.push(Cell::List(found.to_vec()));
    }

    let mut out = posts.clone();
    out.set_column(COMMENTS_COLUMN, lists)?;
    out.set_column(COMMENT_COUNT_COLUMN, counts)?;
    Ok((out, stats))
}

/// Index + attach without progress display.
pub fn join_comments(comments: &Table, posts: &Table, link_column: &str, prefix: &str) -> Result<(Table, JoinStats)> {
    let quiet = ProgressScope::disabled();
    let index = CommentIndex::build(comments, link_column, prefix, &quiet)?;
    attach_comments(posts, &index, &quiet)
}
