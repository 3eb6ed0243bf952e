//! Segment manifest: the ordered index -> URL mapping for one run and the
//! per-segment job records built from it.
//!
//! Ordering is always by numeric index. Raw keys may arrive as strings
//! ("10" sorts after "2") and completion order is meaningless; the numeric
//! index is the only ordering contract in the system.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Temporary segment files are always written as `.ts` chunks; the output
/// container tag only affects the final artifact's name.
pub const SEGMENT_EXT: &str = "ts";

/// Produces the ordered index -> URL mapping for one run.
///
/// Discovery collaborators (index sniffers, playlist fetchers) implement
/// this and hand the result back explicitly; nothing is communicated
/// through fields mutated from background callbacks.
pub trait SegmentSource {
    fn resolve(&mut self) -> Result<SegmentMap>;
}

/// Ordered, de-duplicated index -> URL entries.
#[derive(Debug, Clone, Default)]
pub struct SegmentMap {
    entries: BTreeMap<usize, String>,
}

impl SegmentMap {
    /// Parse an index-file blob: every line starting with an `http://` or
    /// `https://` prefix is one segment, indexed 0-based by its position
    /// among the segment lines. Playlist metadata lines (`#EXTM3U`,
    /// `#EXTINF:...`) are skipped.
    pub fn from_index_text(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut index = 0usize;
        for line in text.lines() {
            let line = line.trim();
            if !(line.starts_with("http://") || line.starts_with("https://")) {
                continue;
            }
            Url::parse(line).with_context(|| format!("bad segment URL: {}", line))?;
            entries.insert(index, line.to_string());
            index += 1;
        }
        tracing::info!("captured {} segments from index file", entries.len());
        Ok(Self { entries })
    }

    /// Build from explicit (key, url) entries. Keys are parsed as decimal
    /// integers; duplicate indices are rejected.
    pub fn from_entries<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = BTreeMap::new();
        for (key, url) in pairs {
            let key = key.as_ref();
            let index: usize = key
                .trim()
                .parse()
                .with_context(|| format!("manifest key '{}' is not a non-negative integer", key))?;
            let url = url.into();
            Url::parse(&url).with_context(|| format!("bad segment URL: {}", url))?;
            if entries.insert(index, url).is_some() {
                anyhow::bail!("duplicate segment index {}", index);
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending numeric index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(i, u)| (*i, u.as_str()))
    }
}

/// Index file on local disk or behind a URL. The usual way a CLI run
/// obtains its `SegmentMap`.
pub struct IndexSource {
    location: String,
    timeout: std::time::Duration,
}

impl IndexSource {
    pub fn new(location: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            location: location.into(),
            timeout,
        }
    }
}

impl SegmentSource for IndexSource {
    fn resolve(&mut self) -> Result<SegmentMap> {
        let text = if self.location.starts_with("http://") || self.location.starts_with("https://")
        {
            crate::fetcher::fetch_index_text(&self.location, self.timeout)?
        } else {
            std::fs::read_to_string(&self.location)
                .with_context(|| format!("read index file {}", self.location))?
        };
        SegmentMap::from_index_text(&text)
    }
}

/// Lifecycle of one segment job. Transitions only move forward:
/// Pending -> Fetching -> Succeeded | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Fetching,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// One segment to fetch: numeric index, source URL, destination file.
#[derive(Debug, Clone)]
pub struct SegmentJob {
    pub index: usize,
    pub url: String,
    pub dest: PathBuf,
    pub attempts: u32,
    status: JobStatus,
}

impl SegmentJob {
    fn new(index: usize, url: String, dest: PathBuf) -> Self {
        Self {
            index,
            url,
            dest,
            attempts: 0,
            status: JobStatus::Pending,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Advance the status. Backward transitions and leaving a terminal
    /// state are bugs, not recoverable conditions.
    pub fn advance(&mut self, next: JobStatus) {
        debug_assert!(
            !self.status.is_terminal(),
            "segment {} already terminal ({:?})",
            self.index,
            self.status
        );
        debug_assert!(rank(next) > rank(self.status));
        self.status = next;
    }
}

fn rank(s: JobStatus) -> u8 {
    match s {
        JobStatus::Pending => 0,
        JobStatus::Fetching => 1,
        JobStatus::Succeeded => 2,
        JobStatus::Failed => 2,
    }
}

/// Destination path for one segment: `segment_<index %04d>.ts` under the
/// working directory.
pub fn segment_path(temp_dir: &Path, index: usize) -> PathBuf {
    temp_dir.join(format!("segment_{:04}.{}", index, SEGMENT_EXT))
}

/// Numeric index embedded in a segment filename, if the name follows the
/// `segment_<n>` scheme. The assembler sorts by this, never by the raw
/// path string.
pub fn segment_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("segment_")?.parse().ok()
}

/// The full job set for one run. Built once from a `SegmentMap`, immutable
/// afterwards; the coordinator owns it for the duration of the run.
#[derive(Debug, Clone)]
pub struct Manifest {
    jobs: Vec<SegmentJob>,
}

impl Manifest {
    /// Bind every map entry to its destination under `temp_dir`.
    pub fn new(map: &SegmentMap, temp_dir: &Path) -> Self {
        let jobs = map
            .iter()
            .map(|(index, url)| SegmentJob::new(index, url.to_string(), segment_path(temp_dir, index)))
            .collect();
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs in ascending index order.
    pub fn jobs(&self) -> &[SegmentJob] {
        &self.jobs
    }
}
