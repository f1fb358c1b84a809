use crate::combine::NamedSource;
use crate::config::RecordKind;
use regex::Regex;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::Date;
use walkdir::WalkDir;

/// One community archive dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveJob {
    pub community: String, // as spelled in the file name
    pub kind: RecordKind,
    pub path: PathBuf,
}

impl ArchiveJob {
    /// `<Community>_historical_<comments|submissions>.csv`
    pub fn output_file_name(&self) -> String {
        format!("{}_historical_{}.csv", self.community, self.kind.file_stem())
    }
}

/// A live "last N posts" snapshot table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub community: String,
    pub limit: u32,
    pub date: Date,
    pub path: PathBuf,
}

impl LiveSnapshot {
    /// Source name `<community>_last<N>`, which the combiner treats as limited-window.
    pub fn source_name(&self) -> String {
        format!("{}_last{}", self.community, self.limit)
    }
}

fn file_names(dir: &Path) -> impl Iterator<Item = (String, PathBuf)> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            Some((name, e.path().to_path_buf()))
        })
}

/// Find `<Community>_comments.zst` / `<Community>_submissions.zst` in `dir` (not recursive),
/// sorted by file name. A missing directory yields nothing.
pub fn discover_archives(dir: &Path) -> Vec<ArchiveJob> {
    let re = Regex::new(r"^(?P<community>.+)_(?P<kind>comments|submissions)\.zst$").expect("static regex");
    if !dir.exists() {
        return Vec::new();
    }
    file_names(dir)
        .filter_map(|(name, path)| {
            let caps = re.captures(&name)?;
            let kind = caps["kind"].parse::<RecordKind>().ok()?;
            Some(ArchiveJob { community: caps["community"].to_string(), kind, path })
        })
        .collect()
}

/// Find `<community>_last<N>_<YYYYMMDD>.csv` snapshots in `dir`, sorted by file name.
/// Names with an impossible date are ignored with a warning.
pub fn discover_live_snapshots(dir: &Path) -> Vec<LiveSnapshot> {
    let re = Regex::new(r"^(?P<community>.+)_last(?P<limit>\d+)_(?P<date>\d{8})\.csv$").expect("static regex");
    let date_fmt = format_description!("[year][month][day]");
    if !dir.exists() {
        return Vec::new();
    }
    file_names(dir)
        .filter_map(|(name, path)| {
            let caps = re.captures(&name)?;
            let limit = caps["limit"].parse::<u32>().ok()?;
            let date = match Date::parse(&caps["date"], &date_fmt) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Ignoring snapshot with invalid date tag");
                    return None;
                }
            };
            Some(LiveSnapshot { community: caps["community"].to_string(), limit, date, path })
        })
        .collect()
}

/// Snapshots as combiner sources.
pub fn discover_live_sources(dir: &Path) -> Vec<NamedSource> {
    discover_live_snapshots(dir)
        .into_iter()
        .map(|s| NamedSource::new(s.source_name(), s.path))
        .collect()
}
