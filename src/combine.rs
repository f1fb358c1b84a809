//! Multi-source union: reconcile the comment column naming of snapshot sources,
//! then concatenate every loaded table over the superset of their columns.

use crate::config::COMMUNITY_FIELD;
use crate::join::COMMENTS_COLUMN;
use crate::table::{Cell, Table};
use ahash::AHashMap;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

/// Column name used by the live snapshots for the submitter's own comments.
pub const AUTHOR_COMMENTS_COLUMN: &str = "author_comments";

/// One input table, identified by name for reporting and naming rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedSource {
    pub name: String,
    pub path: PathBuf,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

/// What `reconcile_columns` did to a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// Not a limited-window source; untouched.
    NotApplicable,
    Renamed,
    AlreadyCanonical,
    /// Limited-window source with neither comment column.
    NoCommentColumn,
}

/// Rename `author_comments` → `comments` for limited-window sources that lack `comments`.
pub fn reconcile_columns(name: &str, table: &mut Table, limited_window: &Regex) -> Reconciled {
    if !limited_window.is_match(name) {
        return Reconciled::NotApplicable;
    }
    if table.has_column(COMMENTS_COLUMN) {
        Reconciled::AlreadyCanonical
    } else if table.rename_column(AUTHOR_COMMENTS_COLUMN, COMMENTS_COLUMN) {
        Reconciled::Renamed
    } else {
        Reconciled::NoCommentColumn
    }
}

/// Concatenate `tables` in order over the union of their columns (first-seen order).
/// Cells a table has no column for are `Missing`. No row is dropped or deduplicated.
pub fn union_tables(tables: Vec<Table>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut position: AHashMap<String, usize> = AHashMap::new();
    for t in &tables {
        for c in t.columns() {
            if !position.contains_key(c) {
                position.insert(c.clone(), columns.len());
                columns.push(c.clone());
            }
        }
    }

    let total: usize = tables.iter().map(Table::len).sum();
    let mut rows = Vec::with_capacity(total);
    for t in tables {
        let (cols, src_rows) = t.into_parts();
        let targets: Vec<usize> = cols.iter().map(|c| position[c]).collect();
        for src in src_rows {
            let mut row = vec![Cell::Missing; columns.len()];
            for (cell, &dst) in src.into_iter().zip(&targets) {
                row[dst] = cell;
            }
            rows.push(row);
        }
    }
    Table::from_parts(columns, rows)
}

/// Informational coverage summary of a unified table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CombineReport {
    pub total_rows: usize,
    pub total_columns: usize,
    /// `(source name, rows)` for each source that loaded, in input order.
    pub loaded: Vec<(String, usize)>,
    /// `(source name, error)` for each source that failed to load.
    pub failed: Vec<(String, String)>,
    /// `(community, rows)` sorted by descending count; empty when there is no community column.
    pub per_community: Vec<(String, usize)>,
    /// `(column, missing cells, fraction)` for columns above the missing threshold.
    pub high_missing: Vec<(String, usize, f64)>,
}

/// Row distribution over the community column, most frequent first.
pub fn community_counts(table: &Table) -> Vec<(String, usize)> {
    let Some(idx) = table.column_index(COMMUNITY_FIELD) else {
        return Vec::new();
    };
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for row in table.rows() {
        if let Some(c) = row[idx].as_text() {
            *counts.entry(c).or_insert(0) += 1;
        }
    }
    let mut v: Vec<(String, usize)> = counts.into_iter().map(|(k, n)| (k.to_string(), n)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

/// Columns whose missing-cell count exceeds `threshold * rows`, in column order.
pub fn high_missing_columns(table: &Table, threshold: f64) -> Vec<(String, usize, f64)> {
    let n = table.len();
    if n == 0 {
        return Vec::new();
    }
    let mut missing = vec![0usize; table.columns().len()];
    for row in table.rows() {
        for (i, cell) in row.iter().enumerate() {
            if cell.is_missing() {
                missing[i] += 1;
            }
        }
    }
    table
        .columns()
        .iter()
        .zip(missing)
        .filter(|(_, m)| *m as f64 > n as f64 * threshold)
        .map(|(c, m)| (c.clone(), m, m as f64 / n as f64))
        .collect()
}

pub fn log_report(report: &CombineReport) {
    tracing::info!(rows = report.total_rows, columns = report.total_columns, "Combined sources");
    for (name, err) in &report.failed {
        tracing::warn!(source = %name, error = %err, "Source excluded from union");
    }
    for (community, n) in &report.per_community {
        tracing::info!(community = %community, rows = n, "Community distribution");
    }
    if report.high_missing.is_empty() {
        tracing::info!("No column is mostly missing");
    }
    for (col, n, frac) in &report.high_missing {
        tracing::info!(column = %col, missing = n, pct = %format!("{:.1}", frac * 100.0), "Mostly missing column");
    }
}
