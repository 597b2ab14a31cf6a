// ABOUTME: Transient failure classification and exponential backoff for query execution
// ABOUTME: Distinguishes retryable driver errors (locks, timeouts, serialization) from fatal ones
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Retry patterns for transient backend failures
//!
//! - [`is_transient`]: classify a driver error as safe to retry
//! - [`retry_with_backoff`]: re-run an operation on `PoolExhausted` or a
//!   transient `Backend` error with exponential backoff
//!
//! Validation errors are never retried; they would fail identically.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

use crate::constants::retry::{BASE_BACKOFF_MS, MAX_BACKOFF_MS};
use crate::errors::{QueryError, QueryResult};

/// Whether a driver error is transient
///
/// Transient:
/// - pool timeouts and I/O failures
/// - `SQLite` busy/locked (codes 5 and 6)
/// - `PostgreSQL` serialization failures and deadlocks (40001, 40P01)
/// - messages mentioning locks, timeouts or serialization
///
/// Everything else (syntax errors, missing tables, decode failures,
/// constraint violations, closed pools) is fatal.
#[must_use]
pub fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_error) => {
            let code_is_transient = db_error
                .code()
                .is_some_and(|code| matches!(code.as_ref(), "5" | "6" | "40001" | "40P01"));
            code_is_transient || is_transient_message(db_error.message())
        }
        _ => false,
    }
}

/// Message-based classification for drivers that do not expose codes
fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();

    if message.contains("unique constraint")
        || message.contains("foreign key constraint")
        || message.contains("check constraint")
        || message.contains("not null constraint")
        || message.contains("permission denied")
        || message.contains("authentication failed")
    {
        return false;
    }

    message.contains("deadlock")
        || message.contains("database is locked")
        || message.contains("busy")
        || message.contains("timeout")
        || message.contains("timed out")
        || message.contains("could not serialize")
        || message.contains("serialization failure")
}

/// Convert a driver error into the query taxonomy
#[must_use]
pub fn backend_error(error: sqlx::Error) -> QueryError {
    QueryError::backend(is_transient(&error), error)
}

/// Backoff before attempt `attempt + 1` (1-based `attempt`)
///
/// 10ms, 20ms, 40ms, ... capped at one second.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1_u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Run `f` up to `max_attempts` times while it fails with a retryable error
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once
/// `max_attempts` is reached.
pub async fn retry_with_backoff<F, Fut, T>(mut f: F, max_attempts: u32) -> QueryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = QueryResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if !e.is_retryable() {
                    return Err(e);
                }
                if attempts >= max_attempts {
                    error!(
                        attempts = attempts,
                        error = %e,
                        "Query failed after max retries"
                    );
                    return Err(e);
                }

                let backoff = backoff_delay(attempts);
                warn!(
                    attempt = attempts,
                    max_attempts = max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Query failed with retryable error, retrying after backoff"
                );
                sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(10));
        assert_eq!(backoff_delay(2), Duration::from_millis(20));
        assert_eq!(backoff_delay(3), Duration::from_millis(40));
        assert_eq!(backoff_delay(30), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_message_classification() {
        assert!(is_transient_message("database is locked"));
        assert!(is_transient_message("could not serialize access due to concurrent update"));
        assert!(!is_transient_message("UNIQUE constraint failed: t.id"));
        assert!(!is_transient_message("no such table: Sales"));
    }

    #[test]
    fn test_driver_error_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::PoolClosed));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
