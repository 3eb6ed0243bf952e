//! Run-scoped resources: the shared HTTP handle pool, working-directory
//! provisioning, and temp-file cleanup.

use anyhow::{Context, Result};
use curl::easy::Easy;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Pool of reusable curl Easy handles, one per slot. A handle keeps its
/// connection cache across transfers, so sizing the pool to the worker
/// count gives every in-flight job a warm connection without contention.
///
/// Opened once at pipeline start, released exactly once at pipeline end:
/// `close` is idempotent and `Drop` covers early-error exit paths.
pub struct HttpPool {
    handles: Mutex<Vec<Easy>>,
    closed: AtomicBool,
}

impl HttpPool {
    pub fn new(size: usize) -> Self {
        let mut handles = Vec::with_capacity(size);
        for _ in 0..size {
            handles.push(Easy::new());
        }
        tracing::debug!("http pool opened with {} handles", size);
        Self {
            handles: Mutex::new(handles),
            closed: AtomicBool::new(false),
        }
    }

    /// Take a handle out of the pool. Falls back to a fresh handle if the
    /// pool is momentarily empty (more workers than slots).
    pub fn checkout(&self) -> Easy {
        if let Some(h) = self.handles.lock().ok().and_then(|mut v| v.pop()) {
            return h;
        }
        tracing::debug!("http pool empty, handing out a fresh handle");
        Easy::new()
    }

    /// Return a handle. Dropped silently if the pool was already closed.
    pub fn checkin(&self, handle: Easy) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        if let Ok(mut v) = self.handles.lock() {
            v.push(handle);
        }
    }

    /// Release every pooled handle. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut v) = self.handles.lock() {
            let n = v.len();
            v.clear();
            tracing::debug!("http pool closed, {} handles released", n);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl Drop for HttpPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// Create the output directory and its `temp_segments/` working directory.
/// Pre-existing directories are fine. Returns the working directory.
pub fn provision(output_dir: &Path) -> Result<PathBuf> {
    let temp_dir = output_dir.join("temp_segments");
    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("create working directory {}", temp_dir.display()))?;
    Ok(temp_dir)
}

/// Remove temporary segment files after a successful assembly. An
/// already-absent file is not an error; other failures are logged and
/// never escalated.
pub fn cleanup_temp_files(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("could not delete {}: {}", path.display(), e);
            }
        }
    }
    tracing::info!("cleaned up {} temporary segment files", paths.len());
}
