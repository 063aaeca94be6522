//! Retry for transient SQLite failures (busy / locked)

use std::thread;
use std::time::Duration;

use rusqlite::ErrorCode;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled after each failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }
}

/// Busy and locked databases clear up on their own; everything else is final
pub fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Run `op`, retrying transient failures with exponential backoff
pub fn with_retry<T, F>(policy: &RetryPolicy, op_name: &str, mut op: F) -> rusqlite::Result<T>
where
    F: FnMut() -> rusqlite::Result<T>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let delay = policy.base_delay * 2u32.saturating_pow(attempt - 1);
                log::warn!(
                    "{} failed (attempt {}/{}): {} - retrying in {:?}",
                    op_name,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(5), None)
    }

    #[test]
    fn test_busy_is_transient() {
        assert!(is_transient(&busy()));
        assert!(!is_transient(&rusqlite::Error::QueryReturnedNoRows));
    }

    #[test]
    fn test_retries_until_success() {
        let mut calls = 0;
        let result = with_retry(&RetryPolicy::no_delay(3), "op", || {
            calls += 1;
            if calls < 3 { Err(busy()) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: rusqlite::Result<()> = with_retry(&RetryPolicy::no_delay(2), "op", || {
            calls += 1;
            Err(busy())
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let mut calls = 0;
        let result: rusqlite::Result<()> = with_retry(&RetryPolicy::no_delay(5), "op", || {
            calls += 1;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
