/// High-level classification of a fetch failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down, or a request timeout (408, 429).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Retryable server error (5xx).
    Http5xx(u16),
    /// Client-side HTTP error (4xx other than 408/429). Never retried.
    Permanent(u16),
    /// Anything else (bad URL, local i/o). Not retried.
    Other,
}

impl ErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Throttled | ErrorKind::Connection | ErrorKind::Http5xx(_)
        )
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up; the job is marked Failed and the batch continues.
    Stop,
    /// Try again immediately (transport backoff already happened).
    Retry,
}

/// Bounded attempt counting around one fetch: `max_retries + 1` total
/// attempts, immediate retries, permanent causes fail fast.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Decide what to do after a failed attempt. `attempt` is 1-based.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts() {
            return RetryDecision::Stop;
        }
        if kind.is_transient() {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_never_retried() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Permanent(404)), RetryDecision::Stop);
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::Stop);
    }

    #[test]
    fn transient_retried_until_budget_exhausted() {
        let p = RetryPolicy::new(3);
        assert_eq!(p.decide(1, ErrorKind::Timeout), RetryDecision::Retry);
        assert_eq!(p.decide(3, ErrorKind::Http5xx(502)), RetryDecision::Retry);
        assert_eq!(p.decide(4, ErrorKind::Http5xx(502)), RetryDecision::Stop);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let p = RetryPolicy::new(0);
        assert_eq!(p.max_attempts(), 1);
        assert_eq!(p.decide(1, ErrorKind::Connection), RetryDecision::Stop);
    }
}
