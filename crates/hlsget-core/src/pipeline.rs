//! End-to-end run: provision, download, assemble, clean up.
//!
//! Phase machine: Created -> Downloading -> Assembling -> (Cleanup) ->
//! Done, or Created -> Downloading -> Failed when zero segments succeed
//! (Assembling is never entered). Per-segment failures are absorbed by the
//! coordinator; only batch-level conditions surface here.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::assembler::{self, Artifact};
use crate::config::DownloadOptions;
use crate::coordinator;
use crate::lifecycle::{self, HttpPool};
use crate::manifest::{Manifest, SegmentMap};
use crate::progress::{BatchStats, ProgressSink};
use crate::retry::RetryPolicy;

/// Batch-level failures. Per-segment trouble never appears here; it is
/// recovered locally and reported through `BatchStats`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("manifest is empty: nothing to download")]
    EmptyManifest,
    #[error("all {total} segments failed to download; no artifact was produced")]
    BatchFailed { total: usize },
    #[error("no segment files to assemble")]
    NothingToAssemble,
}

/// Overall run state. Forward-only, one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Downloading,
    Assembling,
    Cleanup,
    Done,
    Failed,
}

fn rank(p: Phase) -> u8 {
    match p {
        Phase::Created => 0,
        Phase::Downloading => 1,
        Phase::Assembling => 2,
        Phase::Cleanup => 3,
        Phase::Done => 4,
        Phase::Failed => 4,
    }
}

fn advance(current: &mut Phase, next: Phase) {
    debug_assert!(rank(next) > rank(*current), "{:?} -> {:?}", current, next);
    tracing::debug!("pipeline phase: {:?} -> {:?}", current, next);
    *current = next;
}

/// What a finished run hands back: the artifact plus aggregate counts
/// (counts are always reported, even when some segments failed).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub artifact: Artifact,
    pub stats: BatchStats,
}

/// Run the whole pipeline for one segment map.
///
/// The HTTP pool is opened here and released on every exit path — the
/// explicit `close` covers the normal path and `Drop` covers early
/// returns; both are safe together because `close` is idempotent.
pub fn run(
    map: &SegmentMap,
    opts: &DownloadOptions,
    sink: Option<&mut dyn ProgressSink>,
) -> Result<RunReport> {
    let mut phase = Phase::Created;
    tracing::info!(
        "starting download: {} segments -> {}/{} ({} workers, {} retries, {:?} timeout)",
        map.len(),
        opts.output_dir.display(),
        opts.output_filename,
        opts.workers,
        opts.max_retries,
        opts.timeout
    );

    // Reject before provisioning anything or touching the network.
    if map.is_empty() {
        advance(&mut phase, Phase::Failed);
        return Err(PipelineError::EmptyManifest.into());
    }

    let temp_dir = lifecycle::provision(&opts.output_dir)?;
    let manifest = Manifest::new(map, &temp_dir);
    let pool = Arc::new(HttpPool::new(opts.pool_size.max(1)));

    advance(&mut phase, Phase::Downloading);
    let outcome = match coordinator::download_all(
        &manifest,
        opts.workers,
        effective_timeout(opts.timeout),
        RetryPolicy::new(opts.max_retries),
        &pool,
        sink,
    ) {
        Ok(outcome) => outcome,
        Err(e) => {
            pool.close();
            return Err(e);
        }
    };
    // Workers are joined; the run needs no more connections.
    pool.close();

    if outcome.stats.all_failed() {
        advance(&mut phase, Phase::Failed);
        return Err(PipelineError::BatchFailed {
            total: outcome.stats.total,
        }
        .into());
    }

    advance(&mut phase, Phase::Assembling);
    let artifact = assembler::assemble(
        &outcome.successful_paths,
        &opts.output_dir,
        &opts.output_filename,
        opts.container,
    )?;

    if opts.cleanup {
        advance(&mut phase, Phase::Cleanup);
        lifecycle::cleanup_temp_files(&outcome.successful_paths);
    }

    advance(&mut phase, Phase::Done);
    tracing::info!(
        "created {} ({} bytes) from {}/{} segments",
        artifact.path.display(),
        artifact.size,
        outcome.stats.succeeded,
        outcome.stats.total
    );
    Ok(RunReport {
        artifact,
        stats: outcome.stats,
    })
}

fn effective_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_secs(30)
    } else {
        timeout
    }
}
