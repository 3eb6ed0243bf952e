//! `hlsget download`: resolve the index, run the pipeline, report.

use anyhow::{Context, Result};
use hlsget_core::config::{self, Container, DownloadOptions};
use hlsget_core::manifest::{IndexSource, SegmentSource};
use hlsget_core::pipeline;
use hlsget_core::progress::LogSink;
use std::path::PathBuf;
use std::time::Duration;

#[allow(clippy::too_many_arguments)]
pub fn run_download(
    index: &str,
    out_dir: PathBuf,
    name: String,
    workers: Option<usize>,
    retries: Option<u32>,
    timeout: Option<u64>,
    pool: Option<usize>,
    format: Container,
    keep_temp: bool,
) -> Result<()> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    let mut opts = DownloadOptions::new(out_dir, name);
    opts.apply_config(&cfg);
    if let Some(w) = workers {
        opts.workers = w;
        opts.pool_size = pool.or(cfg.pool_size).unwrap_or(w);
    } else if let Some(p) = pool {
        opts.pool_size = p;
    }
    if let Some(r) = retries {
        opts.max_retries = r;
    }
    if let Some(t) = timeout {
        opts.timeout = Duration::from_secs(t);
    }
    opts.container = format;
    if keep_temp {
        opts.cleanup = false;
    }

    let mut source = IndexSource::new(index, opts.timeout);
    let map = source
        .resolve()
        .with_context(|| format!("resolve segment index from {}", index))?;
    println!("index resolved: {} segments", map.len());

    let mut sink = LogSink;
    let report = pipeline::run(&map, &opts, Some(&mut sink))?;

    println!(
        "done: {} segments succeeded, {} failed",
        report.stats.succeeded, report.stats.failed
    );
    println!(
        "created {} ({} bytes)",
        report.artifact.path.display(),
        report.artifact.size
    );
    Ok(())
}
