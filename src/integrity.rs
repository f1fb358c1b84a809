use crate::paths::discover_archives;
use crate::pipeline::CorpusETL;
use crate::progress::ProgressScope;
use crate::util::init_tracing_once;
use crate::zstd_jsonl::{check_archive, IntegrityMode};
use anyhow::Result;
use std::path::{Path, PathBuf};

impl CorpusETL {
    /// Check every community archive in `archive_dir` with the selected mode. Returns
    /// `(path, error_message)` for archives that failed; a bad archive never aborts the sweep.
    ///
    /// Run this before `filter_archives`: a corrupt archive is fatal to the filter.
    pub fn check_archives(&self, archive_dir: &Path, mode: IntegrityMode) -> Result<Vec<(PathBuf, String)>> {
        init_tracing_once();
        let jobs = discover_archives(archive_dir);

        let label = match mode {
            IntegrityMode::Quick { .. } => "Integrity (quick)",
            IntegrityMode::Full => "Integrity (full)",
        };
        let pb = ProgressScope::count(self.opts.progress, label, jobs.len() as u64);

        let mut errors = Vec::new();
        for job in &jobs {
            if let Err(e) = check_archive(&job.path, mode, self.opts.window_log_max) {
                tracing::warn!(path = %job.path.display(), error = %format!("{:#}", e), "Archive failed integrity check");
                errors.push((job.path.clone(), format!("{:#}", e)));
            }
            pb.inc(1);
        }
        pb.finish("done");
        Ok(errors)
    }
}
