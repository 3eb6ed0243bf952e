//! Single-segment HTTP GET, streamed straight to disk.
//!
//! The body goes through curl's write callback in small chunks (8 KiB
//! buffer); a segment is never held in memory whole. Writes land in a
//! `.part` file that is renamed into place only after a fully successful
//! transfer, so on disk a segment either exists complete or not at all.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

/// Server-side transient statuses retried at the transport layer, beneath
/// the application retry loop. Matches the classic idempotent-GET set.
const TRANSIENT_STATUSES: [u32; 6] = [408, 429, 500, 502, 503, 504];

/// Transport-level retries per fetch attempt (status-based only).
const TRANSPORT_RETRIES: u32 = 3;

/// curl receive buffer; keeps per-job memory bounded at a few KiB.
const RECV_BUFFER_BYTES: usize = 8 * 1024;

/// Failure of one fetch attempt. Transient vs. permanent classification
/// happens in the retry layer, not here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Http(u32),
    #[error(transparent)]
    Transport(#[from] curl::Error),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn is_transient_status(code: u32) -> bool {
    TRANSIENT_STATUSES.contains(&code)
}

pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut os: OsString = dest.as_os_str().to_os_string();
    os.push(".part");
    PathBuf::from(os)
}

/// Remove a leftover `.part` file; absence is fine.
fn discard_part(part: &Path) {
    if let Err(e) = std::fs::remove_file(part) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("could not discard {}: {}", part.display(), e);
        }
    }
}

/// One GET of `url` into `part`, streamed through the write callback.
/// Returns bytes written on a 2xx response.
fn fetch_once(
    easy: &mut curl::easy::Easy,
    url: &str,
    part: &Path,
    timeout: Duration,
) -> Result<u64, FetchError> {
    easy.reset();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.buffer_size(RECV_BUFFER_BYTES)?;
    easy.connect_timeout(timeout.min(Duration::from_secs(30)))?;
    easy.timeout(timeout)?;

    let mut file = BufWriter::new(File::create(part)?);
    let mut written: u64 = 0;
    // Write failures surface through curl as a generic write error; keep
    // the real io::Error on the side so the caller sees the cause.
    let write_error: RefCell<Option<std::io::Error>> = RefCell::new(None);

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_error.borrow_mut().replace(e);
                    Ok(0) // abort the transfer
                }
            }
        })?;
        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if let Some(io_err) = write_error.borrow_mut().take() {
                    return Err(FetchError::Io(io_err));
                }
            }
            return Err(FetchError::Transport(e));
        }
    }

    file.flush()?;
    drop(file);

    let code = easy.response_code()? as u32;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(written)
}

/// Download one segment to `dest`, reusing `easy` (and its connection
/// cache) across calls. Transient server statuses (408, 429, 5xx subset)
/// are retried here with exponential backoff before a `FetchError` ever
/// reaches the caller; everything else fails after one attempt. On any
/// failure the partial file is removed.
pub fn fetch_segment(
    easy: &mut curl::easy::Easy,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64, FetchError> {
    let part = part_path(dest);
    let mut status_retries = 0u32;
    loop {
        match fetch_once(easy, url, &part, timeout) {
            Ok(written) => match std::fs::rename(&part, dest) {
                Ok(()) => return Ok(written),
                Err(e) => {
                    discard_part(&part);
                    return Err(e.into());
                }
            },
            Err(FetchError::Http(code))
                if is_transient_status(code) && status_retries < TRANSPORT_RETRIES =>
            {
                status_retries += 1;
                let delay = Duration::from_secs(1 << (status_retries - 1).min(3));
                tracing::debug!(
                    "HTTP {} for {}, transport retry {}/{} after {:?}",
                    code,
                    url,
                    status_retries,
                    TRANSPORT_RETRIES,
                    delay
                );
                discard_part(&part);
                std::thread::sleep(delay);
            }
            Err(e) => {
                discard_part(&part);
                return Err(e);
            }
        }
    }
}

/// Fetch a small text resource (the index file) into memory. Uses a
/// one-shot handle; index files are tiny and fetched once per run.
pub fn fetch_index_text(url: &str, timeout: Duration) -> Result<String> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid index URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(timeout.min(Duration::from_secs(30)))?;
    easy.timeout(timeout)?;

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().context("index GET failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("index GET {} returned HTTP {}", url, code);
    }
    String::from_utf8(body).context("index file is not UTF-8")
}
