//! In-memory CSV tables used by the join, combine and structuring stages.
//!
//! Cells are a closed set of shapes: a missing value, a text value, or a list
//! (only produced in memory by the joiner; persisted as a literal sequence and
//! read back as text).

use crate::literal::format_list;
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Missing,
    Text(String),
    List(Vec<String>),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty CSV fields read back as missing.
    pub fn from_field(s: &str) -> Self {
        if s.is_empty() { Cell::Missing } else { Cell::Text(s.to_string()) }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// CSV field rendering; lists become literal sequences.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::List(items) => format_list(items),
        }
    }
}

fn retain_mask<T>(v: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    v.retain(|_| {
        let k = keep.get(i).copied().unwrap_or(true);
        i += 1;
        k
    });
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`), `None` when either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!("row has {} cells, table has {} columns", row.len(), self.columns.len());
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rename `from` to `to`. Returns false when `from` is absent or `to` already exists.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.has_column(to) {
            return false;
        }
        match self.column_index(from) {
            Some(i) => {
                self.columns[i] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Set a whole column, appending it when absent and overwriting otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        if values.len() != self.rows.len() {
            bail!("column '{}' has {} values, table has {} rows", name, values.len(), self.rows.len());
        }
        match self.column_index(name) {
            Some(i) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[i] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Drop the named columns that are present; returns the ones removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> Vec<String> {
        let keep: Vec<bool> = self.columns.iter().map(|c| !names.contains(&c.as_str())).collect();
        if keep.iter().all(|k| *k) {
            return Vec::new();
        }
        let dropped = self
            .columns
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(c, _)| c.clone())
            .collect();
        retain_mask(&mut self.columns, &keep);
        for row in &mut self.rows {
            retain_mask(row, &keep);
        }
        dropped
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    /// Callers guarantee every row is as wide as `columns`.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    // ----------------------------- CSV I/O ------------------------------------

    /// Read a headed CSV. Short rows are padded with missing cells; rows wider
    /// than the header fail the whole table, and so does an empty file.
    pub fn read_csv(path: &Path) -> Result<Table> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(f));
        let headers = rdr
            .headers()
            .with_context(|| format!("read header of {}", path.display()))?
            .clone();
        if headers.is_empty() {
            bail!("{} has no header row", path.display());
        }
        let mut table = Table::new(headers.iter());
        let width = table.columns.len();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.with_context(|| format!("parse CSV row #{} of {}", i + 1, path.display()))?;
            if rec.len() > width {
                bail!(
                    "CSV row #{} of {} has {} fields, header has {}",
                    i + 1,
                    path.display(),
                    rec.len(),
                    width
                );
            }
            let mut row: Vec<Cell> = rec.iter().map(Cell::from_field).collect();
            row.resize(width, Cell::Missing);
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Write as a headed CSV (full rewrite), creating parent directories.
    /// Goes through a temp file so a failed write never leaves a half table at `path`.
    pub fn write_csv(&self, path: &Path, write_buf: usize) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
            }
        }
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(write_buf.max(8 * 1024), f));
        wtr.write_record(&self.columns)?;
        for (i, row) in self.rows.iter().enumerate() {
            wtr.write_record(row.iter().map(Cell::to_field))
                .with_context(|| format!("write CSV row #{} to {}", i + 1, tmp.display()))?;
        }
        let mut inner = wtr
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush {}: {}", tmp.display(), e.error()))?;
        inner.flush().with_context(|| format!("flush {}", tmp.display()))?;
        drop(inner);

        replace_file_atomic_backoff(&tmp, path)
    }
}
