use std::sync::Arc;

type ProgressFn = dyn Fn(u8, &str) + Send + Sync;

/// `(percent, message)` callback shared across the pipeline stages
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Arc<ProgressFn>,
}

impl ProgressReporter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(u8, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Reporter that drops every update
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    /// Percentages above 100 are clamped
    pub fn report(&self, percent: u8, message: &str) {
        (self.callback)(percent.min(100), message)
    }

    /// Report `done / total` of the `[start, end]` percentage span
    pub fn report_span(&self, start: u8, end: u8, done: u64, total: u64, message: &str) {
        self.report(span_percent(start, end, done, total), message)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

/// `start + floor(done / total * (end - start))`, capped at `end`
pub fn span_percent(start: u8, end: u8, done: u64, total: u64) -> u8 {
    if total == 0 || done >= total {
        return end;
    }
    let width = u64::from(end.saturating_sub(start));
    start + (done * width / total) as u8
}

/// Overall percentage once record `index` (zero-based) of `total` is done
pub fn record_percent(index: usize, total: usize) -> u8 {
    span_percent(50, 100, index as u64 + 1, total as u64)
}
