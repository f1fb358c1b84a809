use crate::combine::{
    community_counts, high_missing_columns, log_report, reconcile_columns, union_tables, CombineReport, NamedSource,
    Reconciled,
};
use crate::config::{CorpusOptions, RecordKind};
use crate::filters::Allowlist;
use crate::join::{attach_comments, CommentIndex, JoinStats};
use crate::paths::{discover_archives, ArchiveJob};
use crate::progress::ProgressScope;
use crate::streaming::{open_append_csv, stream_lines, FilterStats};
use crate::structure::structure_table;
use crate::table::Table;
use crate::util::init_tracing_once;
use crate::zstd_jsonl::open_archive;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Bookkeeping columns removed from the unified table before structuring.
pub const MASTER_DROP_COLUMNS: [&str; 5] = ["score", "num_comments", "comment_count", "post_num_comments", "permalink"];

#[derive(Clone, Debug, Default)]
pub struct CorpusETL {
    pub(crate) opts: CorpusOptions,
}

impl CorpusETL {
    pub fn new() -> Self {
        Self { opts: CorpusOptions::default() }
    }

    pub fn with_options(opts: CorpusOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CorpusOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn communities<I, S>(mut self, c: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_communities(c); self }
    pub fn fields<I, S>(mut self, kind: RecordKind, f: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_fields(kind, f); self }
    pub fn chunk_bytes(mut self, bytes: usize) -> Self { self.opts = self.opts.with_chunk_bytes(bytes); self }
    pub fn window_log_max(mut self, log: u32) -> Self { self.opts = self.opts.with_window_log_max(log); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_write_buffer(bytes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn timestamps_human_readable(mut self, yes: bool) -> Self { self.opts = self.opts.with_human_timestamps(yes); self }
    pub fn link(mut self, column: impl Into<String>, prefix: impl Into<String>) -> Self { self.opts = self.opts.with_link(column, prefix); self }
    pub fn limited_window_pattern(mut self, re: Regex) -> Self { self.opts = self.opts.with_limited_window_pattern(re); self }
    pub fn missing_threshold(mut self, frac: f64) -> Self { self.opts = self.opts.with_missing_threshold(frac); self }
    pub fn comment_max_chars(mut self, n: usize) -> Self { self.opts = self.opts.with_comment_max_chars(n); self }

    // -------- Archive stream filter --------

    /// Stream `archive`, keep allow-listed valid records of `kind`, and append them to
    /// `out_csv` (header written only when the file is new). Returns the pass counters;
    /// `counts()` gives `(written, skipped)`.
    ///
    /// An unreadable or corrupt archive is fatal; rows appended before the failure stay.
    pub fn filter_archive(&self, archive: &Path, kind: RecordKind, out_csv: &Path) -> Result<FilterStats> {
        init_tracing_once();
        let allow = Allowlist::new(&self.opts.communities);
        if allow.is_empty() {
            tracing::warn!("Community allow-list is empty; nothing will be written.");
        }
        let fields = self.opts.fields_for(kind);

        let (lines, consumed) = open_archive(archive, self.opts.chunk_bytes, self.opts.window_log_max)?;
        let mut writer = open_append_csv(out_csv, fields, self.opts.write_buffer_bytes)?;

        let total_bytes = fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
        let label = self.opts.progress_label.clone().unwrap_or_else(|| format!("Filter {}", kind));
        let pb = ProgressScope::bytes(self.opts.progress, Some(&label), total_bytes);
        let mut last = 0u64;

        let stats = stream_lines(
            lines,
            kind,
            &allow,
            fields,
            self.opts.human_readable_timestamps,
            &mut writer,
            || {
                let cur = consumed.load(Ordering::Relaxed);
                if cur > last {
                    pb.inc(cur - last);
                    last = cur;
                }
            },
        )
        .with_context(|| format!("filter {}", archive.display()))?;
        pb.finish("done");

        tracing::info!(
            archive = %archive.display(),
            kind = %kind,
            written = stats.written,
            skipped = stats.skipped,
            out = %out_csv.display(),
            "Archive filtered"
        );
        tracing::debug!(
            malformed = stats.malformed,
            missing_community = stats.missing_community,
            invalid = stats.invalid,
            out_of_scope = stats.out_of_scope,
            "Skip breakdown"
        );
        Ok(stats)
    }

    /// Filter every `<Community>_<comments|submissions>.zst` found in `archive_dir` into
    /// `out_dir/<Community>_historical_<kind>.csv`, in file-name order.
    pub fn filter_archives(&self, archive_dir: &Path, out_dir: &Path) -> Result<Vec<(ArchiveJob, PathBuf, FilterStats)>> {
        init_tracing_once();
        let jobs = discover_archives(archive_dir);
        if jobs.is_empty() {
            tracing::warn!("No archives found in {}", archive_dir.display());
        } else {
            tracing::info!("Planned {} archives for filtering.", jobs.len());
        }
        fs::create_dir_all(out_dir).with_context(|| format!("mkdir -p {}", out_dir.display()))?;

        let mut done = Vec::with_capacity(jobs.len());
        for job in jobs {
            let out = out_dir.join(job.output_file_name());
            let stats = self.filter_archive(&job.path, job.kind, &out)?;
            done.push((job, out, stats));
        }
        Ok(done)
    }

    // -------- Comment-post joiner --------

    /// Attach each post's comments (list, source order) and `comment_count`, then rewrite
    /// `out_csv`. Either input failing to load is fatal.
    pub fn join_files(&self, comments_csv: &Path, posts_csv: &Path, out_csv: &Path) -> Result<JoinStats> {
        init_tracing_once();
        let started = Instant::now();

        let comments = Table::read_csv(comments_csv).with_context(|| format!("load comments {}", comments_csv.display()))?;
        let posts = Table::read_csv(posts_csv).with_context(|| format!("load posts {}", posts_csv.display()))?;
        tracing::info!(comments = comments.len(), posts = posts.len(), "Loaded join inputs");

        let pb = ProgressScope::count(self.opts.progress, "Index comments", comments.len() as u64);
        let index = CommentIndex::build(&comments, &self.opts.link_column, &self.opts.link_prefix, &pb)?;
        pb.finish("indexed");
        tracing::info!(posts_referenced = index.posts(), "Comment index built");

        let pb = ProgressScope::count(self.opts.progress, "Attach comments", posts.len() as u64);
        let (joined, stats) = attach_comments(&posts, &index, &pb)?;
        pb.finish("attached");

        joined.write_csv(out_csv, self.opts.write_buffer_bytes)?;
        tracing::info!(
            out = %out_csv.display(),
            posts = stats.posts,
            comments_joined = stats.comments_joined,
            posts_with_comments = stats.posts_with_comments,
            posts_without_comments = stats.posts_without_comments,
            comments_ignored = stats.comments_ignored,
            secs = %format!("{:.2}", started.elapsed().as_secs_f64()),
            "Join complete"
        );
        Ok(stats)
    }

    // -------- Multi-source combiner --------

    /// Load every source (failures are reported and skipped), reconcile comment column
    /// naming, union, report coverage, and persist to `out_csv`.
    pub fn combine(&self, sources: &[NamedSource], out_csv: &Path) -> Result<(Table, CombineReport)> {
        let (unified, report) = self.combine_in_memory(sources)?;
        unified.write_csv(out_csv, self.opts.write_buffer_bytes)?;
        tracing::info!(out = %out_csv.display(), "Unified table written");
        Ok((unified, report))
    }

    fn combine_in_memory(&self, sources: &[NamedSource]) -> Result<(Table, CombineReport)> {
        init_tracing_once();
        tracing::info!("Combining {} sources", sources.len());

        let mut report = CombineReport::default();
        let mut tables = Vec::with_capacity(sources.len());
        for src in sources {
            match Table::read_csv(&src.path) {
                Ok(mut t) => {
                    match reconcile_columns(&src.name, &mut t, &self.opts.limited_window_pattern) {
                        Reconciled::Renamed => tracing::info!(source = %src.name, "Renamed 'author_comments' to 'comments'"),
                        Reconciled::NoCommentColumn => {
                            tracing::warn!(source = %src.name, "Limited-window source has neither 'author_comments' nor 'comments'")
                        }
                        Reconciled::AlreadyCanonical | Reconciled::NotApplicable => {}
                    }
                    tracing::info!(source = %src.name, rows = t.len(), "Loaded source");
                    report.loaded.push((src.name.clone(), t.len()));
                    tables.push(t);
                }
                Err(e) => {
                    tracing::warn!(source = %src.name, error = %format!("{:#}", e), "Failed to load source");
                    report.failed.push((src.name.clone(), format!("{:#}", e)));
                }
            }
        }
        if tables.is_empty() {
            bail!("none of the {} sources could be loaded", sources.len());
        }

        let unified = union_tables(tables);
        report.total_rows = unified.len();
        report.total_columns = unified.columns().len();
        report.per_community = community_counts(&unified);
        report.high_missing = high_missing_columns(&unified, self.opts.missing_threshold);
        log_report(&report);
        Ok((unified, report))
    }

    // -------- Text structurer --------

    /// Add the `document` column to `table` and persist it.
    pub fn structure(&self, table: &Table, out_csv: &Path) -> Result<Table> {
        init_tracing_once();
        let structured = structure_table(table, self.opts.comment_max_chars)?;
        structured.write_csv(out_csv, self.opts.write_buffer_bytes)?;
        tracing::info!(rows = structured.len(), out = %out_csv.display(), "Structured documents written");
        Ok(structured)
    }

    pub fn structure_file(&self, input_csv: &Path, out_csv: &Path) -> Result<Table> {
        let table = Table::read_csv(input_csv).with_context(|| format!("load {}", input_csv.display()))?;
        self.structure(&table, out_csv)
    }

    /// combine → drop bookkeeping columns → structure. The unified table is persisted
    /// as combined (before the drop), the structured one at `structured_out`.
    pub fn build_master_table(
        &self,
        sources: &[NamedSource],
        unified_out: &Path,
        structured_out: &Path,
    ) -> Result<(Table, CombineReport)> {
        let (mut unified, report) = self.combine(sources, unified_out)?;
        let dropped = unified.drop_columns(&MASTER_DROP_COLUMNS);
        if !dropped.is_empty() {
            tracing::info!(columns = ?dropped, "Dropped bookkeeping columns");
        }
        let structured = self.structure(&unified, structured_out)?;
        Ok((structured, report))
    }
}
