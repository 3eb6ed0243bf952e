//! Map fetch failures onto retry error kinds.

use crate::fetcher::FetchError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        408 | 429 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        400..=499 => ErrorKind::Permanent(code as u16),
        _ => ErrorKind::Other,
    }
}

fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a fetch error into an `ErrorKind`. Local i/o failures (disk
/// full, permissions) are `Other`: retrying will not heal them.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Http(code) => classify_http_status(*code),
        FetchError::Transport(ce) => classify_curl_error(ce),
        FetchError::Io(_) => ErrorKind::Other,
    }
}
