//! Progress reporting utilities: byte-based bars over compressed input and count-based bars
//! for in-memory table passes.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_CHARS: &str = "█▉▊▋▌▍▎▏  ";

fn styled(pb: ProgressBar, template: &str) -> ProgressBar {
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style.progress_chars(BAR_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn make_progress_bar_labeled(total_bytes: u64, label: Option<&str>) -> ProgressBar {
    let pb = styled(
        ProgressBar::new(total_bytes),
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    );
    if let Some(msg) = label {
        pb.set_message(msg.to_string());
    }
    pb
}

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = styled(
        ProgressBar::new(total),
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    );
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb
}

/// A small wrapper that is a no-op when progress is disabled, so passes can
/// tick unconditionally.
pub struct ProgressScope {
    pb: Option<ProgressBar>,
}

impl ProgressScope {
    pub fn bytes(enabled: bool, label: Option<&str>, total_bytes: u64) -> Self {
        Self { pb: enabled.then(|| make_progress_bar_labeled(total_bytes, label)) }
    }
    pub fn count(enabled: bool, label: &str, total: u64) -> Self {
        Self { pb: enabled.then(|| make_count_progress(total, label)) }
    }
    pub fn disabled() -> Self {
        Self { pb: None }
    }
    #[inline]
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }
    pub fn finish<T: Into<String>>(&self, msg: T) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message(msg.into());
        }
    }
}
