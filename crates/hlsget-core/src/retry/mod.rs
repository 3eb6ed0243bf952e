//! Application-level retry around a single segment fetch.
//!
//! Classification lives here so the fetch layer can stay cause-agnostic:
//! permanent failures (4xx, local i/o) stop immediately instead of burning
//! the budget, transient ones (timeouts, connection drops, 5xx) retry
//! without delay — the transport layer already backed off.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
