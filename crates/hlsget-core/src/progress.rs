//! Progress reporting boundary.
//!
//! The download engine never talks to a presentation layer directly; it
//! calls a `ProgressSink`, and only ever from the coordinating thread.
//! Presentation layers (terminal, GUI) are commonly single-threaded, so
//! worker threads must not reach them.

/// Abstract progress receiver: one call per finished job with the job's
/// index and the overall fraction of jobs finished, in [0.0, 1.0].
pub trait ProgressSink {
    fn report(&mut self, index: usize, fraction: f64);
}

/// Sink that writes progress to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn report(&mut self, index: usize, fraction: f64) {
        tracing::info!("segment {} done, batch {:.0}% complete", index, fraction * 100.0);
    }
}

/// Aggregate counts for one finished batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStats {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchStats {
    /// Fraction of jobs that succeeded, in [0.0, 1.0]. Empty batches
    /// count as fully failed.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded == 0
    }
}
