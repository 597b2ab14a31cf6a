// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging and temp-file SQLite fixtures seeded with sales data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `boundquery`
//!
//! `sqlite::memory:` gives every pooled connection its own database, so the
//! fixtures use a file in a temporary directory instead.

use std::sync::Once;
use std::time::Duration;

use anyhow::Result;
use boundquery::config::{DatabaseUrl, PoolConfig};
use boundquery::database::{QueryExecutor, SqliteBackend};
use tempfile::TempDir;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Rows seeded into `Sales` by [`SalesFixture::seeded`]
pub const SALES_ROWS: &[(&str, i64)] = &[
    ("2024-01-01", 10),
    ("2024-01-15", 20),
    ("2024-02-01", 30),
];

/// Temp-file `SQLite` database; deleted when dropped
pub struct SalesFixture {
    _dir: TempDir,
    url: DatabaseUrl,
}

impl SalesFixture {
    /// Empty database file
    pub fn new() -> Result<Self> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let url = DatabaseUrl::SQLite {
            path: dir.path().join("sales.db"),
        };
        Ok(Self { _dir: dir, url })
    }

    /// Database with `Sales(Date DATE, Amount INTEGER)` holding [`SALES_ROWS`]
    pub async fn seeded() -> Result<Self> {
        let fixture = Self::new()?;
        let executor = fixture.executor(&PoolConfig::default().with_max_connections(1)).await?;
        let pool = executor.pool().inner();

        sqlx::query("CREATE TABLE Sales (Date DATE NOT NULL, Amount INTEGER NOT NULL)")
            .execute(pool)
            .await?;
        for (date, amount) in SALES_ROWS {
            sqlx::query("INSERT INTO Sales (Date, Amount) VALUES (?1, ?2)")
                .bind(*date)
                .bind(*amount)
                .execute(pool)
                .await?;
        }
        executor.close().await;
        Ok(fixture)
    }

    /// Add `count` one-cent sales on 2023-06-01
    pub async fn add_bulk_rows(&self, count: usize) -> Result<()> {
        let executor = self.executor(&PoolConfig::default().with_max_connections(1)).await?;
        let pool = executor.pool().inner();
        let mut tx = pool.begin().await?;
        for _ in 0..count {
            sqlx::query("INSERT INTO Sales (Date, Amount) VALUES ('2023-06-01', 1)")
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        executor.close().await;
        Ok(())
    }

    /// Connection URL for this database
    pub fn url(&self) -> String {
        self.url.to_connection_string()
    }

    /// Open an executor with `config`
    pub async fn executor(&self, config: &PoolConfig) -> Result<QueryExecutor<SqliteBackend>> {
        Ok(QueryExecutor::connect(&self.url(), config).await?)
    }

    /// Open an executor with `max` connections and a short checkout wait
    pub async fn small_pool(&self, max: u32, acquire_timeout: Duration) -> Result<QueryExecutor<SqliteBackend>> {
        let config = PoolConfig::default()
            .with_max_connections(max)
            .with_acquire_timeout(acquire_timeout);
        self.executor(&config).await
    }
}
