//! Retry loop: run a fetch closure until success or the policy says stop.

use super::classify::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::fetcher::FetchError;

/// Runs `f` until it succeeds or the policy says to stop. Retries are
/// immediate; the transport layer already applied its own backoff. The
/// failed attempt is logged before each retry.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, label: &str, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::Stop => {
                        tracing::info!(
                            "{}: giving up after attempt {}/{}: {}",
                            label,
                            attempt,
                            policy.max_attempts(),
                            e
                        );
                        return Err(e);
                    }
                    RetryDecision::Retry => {
                        tracing::info!(
                            "{}: attempt {}/{} failed ({}), retrying",
                            label,
                            attempt,
                            policy.max_attempts(),
                            e
                        );
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_ends_loop_immediately() {
        let mut calls = 0;
        let res: Result<u64, FetchError> = run_with_retry(&RetryPolicy::new(3), "seg", || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn transient_failure_uses_full_budget() {
        let mut calls = 0;
        let res: Result<u64, FetchError> = run_with_retry(&RetryPolicy::new(3), "seg", || {
            calls += 1;
            Err(FetchError::Http(503))
        });
        assert!(res.is_err());
        assert_eq!(calls, 4); // max_retries + 1 attempts
    }

    #[test]
    fn permanent_failure_fails_fast() {
        let mut calls = 0;
        let res: Result<u64, FetchError> = run_with_retry(&RetryPolicy::new(3), "seg", || {
            calls += 1;
            Err(FetchError::Http(404))
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn late_success_indistinguishable_from_first_try() {
        let mut calls = 0;
        let res: Result<u64, FetchError> = run_with_retry(&RetryPolicy::new(3), "seg", || {
            calls += 1;
            if calls < 3 {
                Err(FetchError::Http(500))
            } else {
                Ok(42)
            }
        });
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls, 3);
    }
}
