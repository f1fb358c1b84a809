//! Text structuring: render title, body and comments of a unified record into one
//! labeled document.

use crate::join::COMMENTS_COLUMN;
use crate::literal::{format_list, parse_list};
use crate::table::{Cell, Table};
use anyhow::Result;

pub const TITLE_COLUMN: &str = "title";
pub const BODY_COLUMN: &str = "selftext";
pub const DOCUMENT_COLUMN: &str = "document";

pub const TITLE_LABEL: &str = "Title:";
pub const CONTENT_LABEL: &str = "Content:";
pub const COMMENTS_LABEL: &str = "Comments:";
pub const SECTION_SEPARATOR: &str = "\n\n";
pub const TRUNCATION_MARKER: &str = "...";

const SENTINELS: [&str; 3] = ["nan", "none", "missing value"];

/// Normalize a text cell: missing, empty and placeholder values become `""`,
/// anything else is trimmed.
pub fn clean_text(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        Cell::Text(s) => clean_str(s),
        Cell::List(items) => clean_str(&format_list(items)),
    }
}

fn clean_str(s: &str) -> String {
    let t = s.trim();
    if t.is_empty() || SENTINELS.iter().any(|p| t.eq_ignore_ascii_case(p)) {
        String::new()
    } else {
        t.to_string()
    }
}

/// The shapes a comments cell can arrive in, in disambiguation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentShape<'a> {
    List(&'a [String]),
    Literal(&'a str),
    Scalar(&'a str),
    Empty,
}

impl<'a> CommentShape<'a> {
    pub fn of(cell: &'a Cell) -> Self {
        match cell {
            Cell::List(items) => CommentShape::List(items),
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    CommentShape::Empty
                } else if t.starts_with('[') {
                    CommentShape::Literal(t)
                } else {
                    CommentShape::Scalar(t)
                }
            }
            Cell::Missing => CommentShape::Empty,
        }
    }
}

/// Comments cell → list of cleaned comment bodies. A literal that fails to parse is
/// kept whole as a single comment. Elements that clean to empty are dropped.
pub fn normalize_comments(cell: &Cell) -> Vec<String> {
    let raw: Vec<String> = match CommentShape::of(cell) {
        CommentShape::List(items) => items.to_vec(),
        CommentShape::Literal(s) => parse_list(s).unwrap_or_else(|| vec![s.to_string()]),
        CommentShape::Scalar(s) => vec![s.to_string()],
        CommentShape::Empty => Vec::new(),
    };
    raw.iter().map(|s| clean_str(s)).filter(|s| !s.is_empty()).collect()
}

/// Cut `s` to `max_chars` characters, appending the marker when anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}

/// Assemble the labeled sections that are present; no sections yields `""`.
pub fn build_document(title: &str, body: &str, comments: &[String], comment_max_chars: usize) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(3);
    if !title.is_empty() {
        sections.push(format!("{} {}", TITLE_LABEL, title));
    }
    if !body.is_empty() {
        sections.push(format!("{} {}", CONTENT_LABEL, body));
    }
    if !comments.is_empty() {
        let mut s = String::from(COMMENTS_LABEL);
        for c in comments {
            s.push_str("\n- ");
            s.push_str(&truncate_chars(c, comment_max_chars));
        }
        sections.push(s);
    }
    sections.join(SECTION_SEPARATOR)
}

static MISSING: Cell = Cell::Missing;

fn pick(row: &[Cell], idx: Option<usize>) -> &Cell {
    idx.and_then(|i| row.get(i)).unwrap_or(&MISSING)
}

/// Copy of `table` with the `document` column added (or replaced).
/// Absent title/body/comments columns count as missing for every row.
pub fn structure_table(table: &Table, comment_max_chars: usize) -> Result<Table> {
    let title_idx = table.column_index(TITLE_COLUMN);
    let body_idx = table.column_index(BODY_COLUMN);
    let comments_idx = table.column_index(COMMENTS_COLUMN);

    let docs: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| {
            let title = clean_text(pick(row, title_idx));
            let body = clean_text(pick(row, body_idx));
            let comments = normalize_comments(pick(row, comments_idx));
            Cell::Text(build_document(&title, &body, &comments, comment_max_chars))
        })
        .collect();
    let mut out = table.clone();
    out.set_column(DOCUMENT_COLUMN, docs)?;
    Ok(out)
}
