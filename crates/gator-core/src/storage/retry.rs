//! Bounded retry for SQLite lock contention.
//!
//! Several `gator agg` processes may share one database file. SQLite reports
//! a writer collision as BUSY/LOCKED even after `busy_timeout` expires, so the
//! poller's own writes get a few more attempts before the error is surfaced.

use std::future::Future;
use std::time::Duration;

/// Attempts after the first one
pub const MAX_RETRIES: u32 = 5;

/// SQLITE_BUSY, SQLITE_LOCKED and their extended codes
pub fn is_lock_contention(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    let Some(code) = db_err.code() else {
        return false;
    };

    is_busy_or_locked_code(&code)
}

// Extended result codes keep the primary code in the low byte
fn is_busy_or_locked_code(code: &str) -> bool {
    match code.parse::<i32>() {
        Ok(code) => matches!(code & 0xff, 5 | 6),
        Err(_) => false,
    }
}

/// 100ms, 200ms, 400ms, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1)))
}

/// Run a store operation, retrying only on lock contention
pub async fn with_lock_retry<F, Fut, T>(operation: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if is_lock_contention(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Database is locked, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
