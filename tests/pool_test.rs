// ABOUTME: Integration tests for connection pool contention, release and retry behavior
// ABOUTME: Validates bounded waits, PoolExhausted timeouts, stream abandonment cleanup and backoff retries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::{Duration, Instant};

use boundquery::config::PoolConfig;
use boundquery::database::{ParameterBinding, QueryTemplate, SqlValue};
use boundquery::errors::{AppError, ErrorCode, QueryError};
use common::SalesFixture;
use futures_util::StreamExt;
use tokio::time::{sleep, timeout};

fn all_sales() -> QueryTemplate {
    QueryTemplate::parse("SELECT Date, Amount FROM Sales").unwrap()
}

#[tokio::test]
async fn test_waiter_succeeds_after_release() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture
        .small_pool(1, Duration::from_secs(5))
        .await
        .unwrap();

    // The open stream owns the only connection
    let held = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap();
    assert_eq!(executor.pool_stats().checked_out, 1);

    let releaser = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        drop(held);
    });

    let started = Instant::now();
    let rows = timeout(
        Duration::from_secs(10),
        executor.fetch_all(&all_sales(), &ParameterBinding::new()),
    )
    .await
    .expect("waiter must not deadlock")
    .unwrap();

    assert_eq!(rows.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(50));
    releaser.await.unwrap();
    assert_eq!(executor.pool_stats().checked_out, 0);
}

#[tokio::test]
async fn test_waiter_times_out_with_pool_exhausted() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture
        .small_pool(1, Duration::from_millis(100))
        .await
        .unwrap();

    let held = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap();

    let err = timeout(
        Duration::from_secs(10),
        executor.execute(&all_sales(), &ParameterBinding::new()),
    )
    .await
    .expect("waiter must not deadlock")
    .unwrap_err();

    assert!(matches!(err, QueryError::PoolExhausted { waited_ms: 100 }));
    assert!(err.is_retryable());
    let app_error = AppError::from(err);
    assert_eq!(app_error.code, ErrorCode::ResourceUnavailable);
    assert_eq!(app_error.http_status(), 503);

    let stats = executor.pool_stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.checked_out, 1);

    drop(held);
    assert_eq!(executor.pool_stats().checked_out, 0);
}

#[tokio::test]
async fn test_concurrent_callers_beyond_pool_size_all_finish() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let pool_size = 2;
    let executor = fixture
        .small_pool(pool_size, Duration::from_secs(5))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..=pool_size)
        .map(|_| {
            let executor = executor.clone();
            tokio::spawn(async move {
                let mut stream = executor
                    .execute(&all_sales(), &ParameterBinding::new())
                    .await?;
                let first = stream.next_row().await?;
                // Hold the connection for a while
                sleep(Duration::from_millis(50)).await;
                drop(stream);
                Ok::<_, QueryError>(first.is_some())
            })
        })
        .collect();

    for task in tasks {
        let got_row = timeout(Duration::from_secs(10), task)
            .await
            .expect("caller must not deadlock")
            .unwrap()
            .unwrap();
        assert!(got_row);
    }

    let stats = executor.pool_stats();
    assert_eq!(stats.checkouts, u64::from(pool_size) + 1);
    assert_eq!(stats.checked_out, 0);
}

#[tokio::test]
async fn test_abandoned_stream_releases_connection() {
    let fixture = SalesFixture::seeded().await.unwrap();
    fixture.add_bulk_rows(97).await.unwrap();
    let executor = fixture
        .small_pool(1, Duration::from_millis(500))
        .await
        .unwrap();
    let before = executor.pool_stats().checked_out;

    let mut stream = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    drop(stream);

    assert_eq!(executor.pool_stats().checked_out, before);

    // The single connection is usable again within the bounded wait
    let count = QueryTemplate::parse("SELECT COUNT(*) AS n FROM Sales").unwrap();
    let rows = executor
        .fetch_all(&count, &ParameterBinding::new())
        .await
        .unwrap();
    assert_eq!(rows[0].get("n").and_then(SqlValue::as_i64), Some(100));
}

#[tokio::test]
async fn test_handle_tracks_checkout_time_until_release() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture.executor(&PoolConfig::default()).await.unwrap();

    let handle = executor.pool().acquire().await.unwrap();
    assert_eq!(executor.pool_stats().checked_out, 1);
    sleep(Duration::from_millis(20)).await;
    assert!(handle.held_for() >= Duration::from_millis(20));

    drop(handle);
    let stats = executor.pool_stats();
    assert_eq!(stats.checked_out, 0);
    assert_eq!(stats.checkins, 1);
}

#[tokio::test]
async fn test_retry_recovers_from_exhaustion() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture
        .small_pool(1, Duration::from_millis(20))
        .await
        .unwrap();

    let held = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap();
    let releaser = tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        drop(held);
    });

    let rows = executor
        .fetch_all_with_retry(&all_sales(), &ParameterBinding::new(), 8)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(executor.pool_stats().timeouts >= 1);
    releaser.await.unwrap();
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture
        .small_pool(1, Duration::from_millis(20))
        .await
        .unwrap();

    let _held = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap();

    let err = executor
        .fetch_all_with_retry(&all_sales(), &ParameterBinding::new(), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::PoolExhausted { .. }));
    assert_eq!(executor.pool_stats().timeouts, 3);
}

#[tokio::test]
async fn test_retry_does_not_repeat_validation_errors() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture.executor(&PoolConfig::default()).await.unwrap();

    let err = executor
        .fetch_all_with_retry(&all_sales(), &ParameterBinding::new().bind("x", 1), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidParameters { .. }));
    assert_eq!(executor.pool_stats().checkouts, 0);
}

#[tokio::test]
async fn test_close_shuts_pool() {
    let fixture = SalesFixture::seeded().await.unwrap();
    let executor = fixture.executor(&PoolConfig::default()).await.unwrap();
    executor.close().await;
    assert!(executor.pool().is_closed());

    let err = executor
        .execute(&all_sales(), &ParameterBinding::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Backend { transient: false, .. }));
}
