//! Bounded worker pool that drives every segment job to a terminal state.
//!
//! One fetch+retry task per job, at most `workers` in flight. Workers pull
//! from a shared queue and report over a channel; the coordinating thread
//! is the only place results are folded and the only caller of the
//! progress sink. No ordering exists between concurrent fetches; the
//! ascending-index contract is enforced later by the assembler.

use anyhow::Result;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetcher;
use crate::lifecycle::HttpPool;
use crate::manifest::{JobStatus, Manifest, SegmentJob};
use crate::progress::{BatchStats, ProgressSink};
use crate::retry::{run_with_retry, RetryPolicy};

/// Terminal record for one segment job. Exactly one is produced per job,
/// success or not.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub index: usize,
    pub success: bool,
    /// Completed segment file; `None` when the job failed (a failed job
    /// never leaves a file behind).
    pub path: Option<PathBuf>,
    pub bytes: u64,
    pub attempts: u32,
}

/// Everything the assembler and caller need from one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One result per job, ascending index order.
    pub results: Vec<DownloadResult>,
    /// Paths of successful segments, ascending index order.
    pub successful_paths: Vec<PathBuf>,
    pub stats: BatchStats,
}

/// Download every job in `manifest` through the retry policy, with at most
/// `workers` fetches in flight. A partial batch is information, not an
/// error; only infrastructure failures (a worker panic) are `Err`.
pub fn download_all(
    manifest: &Manifest,
    workers: usize,
    timeout: Duration,
    policy: RetryPolicy,
    pool: &Arc<HttpPool>,
    mut sink: Option<&mut dyn ProgressSink>,
) -> Result<BatchOutcome> {
    let total = manifest.len();
    if total == 0 {
        return Ok(BatchOutcome::default());
    }

    let work: Arc<Mutex<VecDeque<SegmentJob>>> =
        Arc::new(Mutex::new(manifest.jobs().to_vec().into()));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.max(1).min(total);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let pool = Arc::clone(pool);
        handles.push(std::thread::spawn(move || {
            worker_loop(&work, &pool, policy, timeout, &tx);
        }));
    }
    drop(tx);

    let mut results: Vec<DownloadResult> = Vec::with_capacity(total);
    let mut first_error: Option<anyhow::Error> = None;
    for _ in 0..total {
        match rx.recv() {
            Ok(res) => {
                let index = res.index;
                results.push(res);
                if let Some(sink) = sink.as_deref_mut() {
                    sink.report(index, results.len() as f64 / total as f64);
                }
            }
            Err(_) => {
                first_error = Some(anyhow::anyhow!(
                    "worker result channel closed (worker may have panicked)"
                ));
                break;
            }
        }
    }

    for h in handles {
        if let Err(e) = h.join() {
            if first_error.is_none() {
                first_error = Some(anyhow::anyhow!("worker panicked: {:?}", e));
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    results.sort_by_key(|r| r.index);
    let successful_paths: Vec<PathBuf> = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.path.clone())
        .collect();
    let stats = BatchStats {
        succeeded: successful_paths.len(),
        failed: total - successful_paths.len(),
        total,
    };
    tracing::info!(
        "download results: {} succeeded, {} failed",
        stats.succeeded,
        stats.failed
    );

    Ok(BatchOutcome {
        results,
        successful_paths,
        stats,
    })
}

/// Pull jobs until the queue is empty. Each worker holds one pooled HTTP
/// handle for its whole lifetime, so connections are reused across jobs.
fn worker_loop(
    work: &Mutex<VecDeque<SegmentJob>>,
    pool: &HttpPool,
    policy: RetryPolicy,
    timeout: Duration,
    tx: &mpsc::Sender<DownloadResult>,
) {
    let mut easy = pool.checkout();
    loop {
        let mut job = match work.lock().ok().and_then(|mut q| q.pop_front()) {
            Some(j) => j,
            None => break,
        };
        job.advance(JobStatus::Fetching);
        let label = format!("segment {:04}", job.index);
        let mut attempts = 0u32;
        let fetched = run_with_retry(&policy, &label, || {
            attempts += 1;
            fetcher::fetch_segment(&mut easy, &job.url, &job.dest, timeout)
        });
        job.attempts = attempts;
        let result = match fetched {
            Ok(bytes) => {
                job.advance(JobStatus::Succeeded);
                DownloadResult {
                    index: job.index,
                    success: true,
                    path: Some(job.dest.clone()),
                    bytes,
                    attempts,
                }
            }
            Err(e) => {
                job.advance(JobStatus::Failed);
                tracing::warn!("{} failed permanently: {}", label, e);
                DownloadResult {
                    index: job.index,
                    success: false,
                    path: None,
                    bytes: 0,
                    attempts,
                }
            }
        };
        if tx.send(result).is_err() {
            break;
        }
    }
    pool.checkin(easy);
}
