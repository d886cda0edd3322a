//! Progress counter for streaming mode

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " files"
    )))
}

/// Force a refresh of the bar (e.g. so counter shows "0 files" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    // If lock is contended, skip update (progress bar will catch up on next update)
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Show the running error count after the file count.
pub fn set_error_count(pb: &ProgressBar, errors: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.postfix = format!("errors={}", errors);
        let _ = bar.refresh();
    }
}

/// Running success/error tally for streaming consumers. Refreshes the bar every `batch` records.
pub struct StreamTally {
    bar: Option<ProgressBar>,
    batch: usize,
    pending: usize,
    pub parsed: usize,
    pub errors: usize,
}

impl StreamTally {
    pub fn new(bar: Option<ProgressBar>, batch: usize) -> Self {
        if let Some(bar) = &bar {
            refresh_bar(bar);
        }
        Self {
            bar,
            batch: batch.max(1),
            pending: 0,
            parsed: 0,
            errors: 0,
        }
    }

    pub fn record(&mut self) {
        self.parsed += 1;
        self.pending += 1;
        if self.pending >= self.batch {
            self.flush();
        }
    }

    pub fn error(&mut self) {
        self.errors += 1;
        if let Some(bar) = &self.bar {
            set_error_count(bar, self.errors);
        }
    }

    /// Push any batched increments to the bar.
    pub fn flush(&mut self) {
        if let Some(bar) = &self.bar
            && self.pending > 0
        {
            update_progress_bar(bar, self.pending);
        }
        self.pending = 0;
    }
}
