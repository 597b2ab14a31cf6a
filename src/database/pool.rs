// ABOUTME: Bounded connection pool with RAII connection handles and checkout counters
// ABOUTME: Guarantees every checked-out connection is returned on success, failure, or abandonment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Connection pooling
//!
//! [`ConnectionPool`] wraps a `SQLx` pool and keeps process-visible counters
//! of checkouts and checkins. A checkout waits at most the configured acquire
//! timeout and then fails with `QueryError::PoolExhausted`.
//!
//! [`ConnectionHandle`] owns one pooled connection. Dropping it, on any exit
//! path, hands the connection back to the pool and updates the counters:
//!
//! ```text
//! let mut handle = pool.acquire().await?;
//! sqlx::query("SELECT 1").execute(handle.connection()).await?;
//! // handle dropped here - connection returned to the pool
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::{Database, Pool};
use tracing::{debug, info, warn};

use super::retry::backend_error;
use crate::config::PoolConfig;
use crate::errors::{AppError, AppResult, QueryError, QueryResult};

#[derive(Debug, Default)]
struct PoolCounters {
    checkouts: AtomicU64,
    checkins: AtomicU64,
    timeouts: AtomicU64,
}

impl PoolCounters {
    fn checked_out(&self) -> u64 {
        // Read checkins first so a concurrent release can only overstate the gauge
        let checkins = self.checkins.load(Ordering::Acquire);
        self.checkouts
            .load(Ordering::Acquire)
            .saturating_sub(checkins)
    }
}

/// Point-in-time view of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Open connections (idle and in use)
    pub size: u32,
    /// Idle connections
    pub idle: usize,
    /// Handles currently checked out
    pub checked_out: u64,
    /// Total successful checkouts
    pub checkouts: u64,
    /// Total handle releases
    pub checkins: u64,
    /// Checkouts that failed with `PoolExhausted`
    pub timeouts: u64,
}

/// Shared pool of backend connections
pub struct ConnectionPool<DB: Database> {
    pool: Pool<DB>,
    counters: Arc<PoolCounters>,
    acquire_timeout: Duration,
}

impl<DB: Database> Clone for ConnectionPool<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            counters: Arc::clone(&self.counters),
            acquire_timeout: self.acquire_timeout,
        }
    }
}

impl<DB: Database> fmt::Debug for ConnectionPool<DB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("stats", &self.stats())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl<DB: Database> ConnectionPool<DB> {
    /// Open a pool against `database_url` sized by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid pool bounds, or a database
    /// error if the initial connections cannot be established.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> AppResult<Self> {
        config.validate()?;

        let mut options = PoolOptions::<DB>::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .test_before_acquire(config.test_before_acquire);
        // Unset values keep the SQLx defaults, zero turns the timer off
        if let Some(secs) = config.idle_timeout_secs {
            options = options.idle_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(secs) = config.max_lifetime_secs {
            options = options.max_lifetime((secs > 0).then(|| Duration::from_secs(secs)));
        }

        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| AppError::database(format!("Failed to open connection pool: {e}")).with_source(e))?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_ms = config.acquire_timeout_ms,
            "Connection pool initialized"
        );

        Ok(Self::from_pool(pool, config.acquire_timeout()))
    }

    /// Wrap an existing `SQLx` pool
    ///
    /// `acquire_timeout` is only reported in `PoolExhausted` errors; the wait
    /// itself is bounded by the pool's own options.
    #[must_use]
    pub fn from_pool(pool: Pool<DB>, acquire_timeout: Duration) -> Self {
        Self {
            pool,
            counters: Arc::new(PoolCounters::default()),
            acquire_timeout,
        }
    }

    /// Check out a connection, waiting at most the acquire timeout
    ///
    /// # Errors
    ///
    /// - `QueryError::PoolExhausted` when no connection frees up in time
    /// - `QueryError::Backend` when the pool is closed or a new connection fails
    pub async fn acquire(&self) -> QueryResult<ConnectionHandle<DB>> {
        let started = Instant::now();
        match self.pool.acquire().await {
            Ok(connection) => {
                self.counters.checkouts.fetch_add(1, Ordering::AcqRel);
                debug!(
                    wait_ms = started.elapsed().as_millis() as u64,
                    checked_out = self.counters.checked_out(),
                    "Connection checked out"
                );
                Ok(ConnectionHandle {
                    connection,
                    counters: Arc::clone(&self.counters),
                    acquired_at: Instant::now(),
                })
            }
            Err(sqlx::Error::PoolTimedOut) => {
                self.counters.timeouts.fetch_add(1, Ordering::AcqRel);
                let waited_ms = self.acquire_timeout.as_millis() as u64;
                warn!(
                    waited_ms = waited_ms,
                    checked_out = self.counters.checked_out(),
                    "Connection pool exhausted"
                );
                Err(QueryError::PoolExhausted { waited_ms })
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    /// Snapshot of pool usage
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            checked_out: self.counters.checked_out(),
            checkouts: self.counters.checkouts.load(Ordering::Acquire),
            checkins: self.counters.checkins.load(Ordering::Acquire),
            timeouts: self.counters.timeouts.load(Ordering::Acquire),
        }
    }

    /// Handles currently checked out
    #[must_use]
    pub fn checked_out(&self) -> u64 {
        self.counters.checked_out()
    }

    /// Configured checkout wait bound
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Underlying `SQLx` pool, for schema setup and maintenance statements
    #[must_use]
    pub const fn inner(&self) -> &Pool<DB> {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
        info!(stats = ?self.stats(), "Connection pool closed");
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Exclusive ownership of one pooled connection
///
/// The connection goes back to the pool when the handle is dropped.
pub struct ConnectionHandle<DB: Database> {
    connection: PoolConnection<DB>,
    counters: Arc<PoolCounters>,
    acquired_at: Instant,
}

impl<DB: Database> ConnectionHandle<DB> {
    /// Mutable access to the live connection, usable as a `SQLx` executor
    pub fn connection(&mut self) -> &mut DB::Connection {
        &mut self.connection
    }

    /// Time since checkout
    #[must_use]
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl<DB: Database> Deref for ConnectionHandle<DB> {
    type Target = DB::Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl<DB: Database> DerefMut for ConnectionHandle<DB> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}

impl<DB: Database> Drop for ConnectionHandle<DB> {
    fn drop(&mut self) {
        self.counters.checkins.fetch_add(1, Ordering::AcqRel);
        debug!(
            held_ms = self.held_for().as_millis() as u64,
            checked_out = self.counters.checked_out(),
            "Connection released"
        );
    }
}
