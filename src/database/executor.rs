// ABOUTME: Parameterized query execution over pooled connections with lazy row streams
// ABOUTME: Validates bindings before I/O and releases the connection on every exit path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Query Executor
//!
//! [`QueryExecutor::execute`] runs in three stages:
//!
//! 1. **Resolve**: the binding key set must equal the template's placeholder
//!    set and every value must fit its declared type. Failures are reported
//!    before the pool is touched.
//! 2. **Checkout**: a [`ConnectionHandle`](super::pool::ConnectionHandle) is
//!    acquired with a bounded wait.
//! 3. **Stream**: the rendered statement and the ordered values are handed to
//!    the backend driver separately. Rows are fetched incrementally as the
//!    returned [`RowStream`] is polled.
//!
//! The handle lives inside the stream. It is dropped when the backend signals
//! end-of-results, before a backend error is yielded, or when the caller drops
//! the stream early.

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use tracing::{debug, info_span, warn, Span};
use uuid::Uuid;

use super::backend::QueryBackend;
use super::catalog::TemplateCatalog;
use super::date_range::DateRangeQuery;
use super::params::{ParameterBinding, SqlValue};
use super::pool::{ConnectionHandle, ConnectionPool, PoolStats};
use super::retry::{backend_error, retry_with_backoff};
use super::row::ResultRow;
use super::template::QueryTemplate;
use crate::config::PoolConfig;
use crate::errors::{AppResult, QueryResult};

/// Lazy, forward-only, non-restartable sequence of result rows
///
/// Each poll may fetch from the backend. The stream holds the pooled
/// connection until it ends or is dropped.
pub struct RowStream {
    inner: BoxStream<'static, QueryResult<ResultRow>>,
}

impl RowStream {
    fn new(inner: impl Stream<Item = QueryResult<ResultRow>> + Send + 'static) -> Self {
        Self {
            inner: inner.boxed(),
        }
    }

    /// Fetch the next row
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Backend` if the driver fails mid-stream; the
    /// stream is finished after that.
    pub async fn next_row(&mut self) -> QueryResult<Option<ResultRow>> {
        self.inner.try_next().await
    }

    /// Drain the remaining rows
    ///
    /// # Errors
    ///
    /// Returns the first backend error encountered.
    pub async fn collect_rows(self) -> QueryResult<Vec<ResultRow>> {
        self.inner.try_collect().await
    }
}

impl Stream for RowStream {
    type Item = QueryResult<ResultRow>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

/// Executes parameterized read queries against backend `B`
///
/// Cloning is cheap; clones share the pool and catalog.
pub struct QueryExecutor<B: QueryBackend> {
    pool: ConnectionPool<B::Db>,
    catalog: Arc<TemplateCatalog>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: QueryBackend> Clone for QueryExecutor<B> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            catalog: Arc::clone(&self.catalog),
            _backend: PhantomData,
        }
    }
}

impl<B: QueryBackend> fmt::Debug for QueryExecutor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("backend", &B::KIND)
            .field("pool", &self.pool)
            .field("templates", &self.catalog.len())
            .finish()
    }
}

impl<B: QueryBackend> QueryExecutor<B> {
    /// Build an executor over an existing pool
    #[must_use]
    pub fn new(pool: ConnectionPool<B::Db>) -> Self {
        Self {
            pool,
            catalog: Arc::new(TemplateCatalog::new()),
            _backend: PhantomData,
        }
    }

    /// Open a pool against `database_url` and build an executor over it
    ///
    /// # Errors
    ///
    /// Returns an error if the pool configuration is invalid or the backend
    /// is unreachable.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> AppResult<Self> {
        Ok(Self::new(ConnectionPool::connect(database_url, config).await?))
    }

    /// Attach a catalog of named templates for [`execute_named`](Self::execute_named)
    #[must_use]
    pub fn with_catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Execute `template` with `bindings` and stream the rows
    ///
    /// # Errors
    ///
    /// - `QueryError::InvalidParameters` / `QueryError::InvalidValue` before any I/O
    /// - `QueryError::PoolExhausted` when no connection frees up in time
    /// - `QueryError::Backend` when checkout fails; later backend failures
    ///   arrive as stream items
    pub async fn execute(
        &self,
        template: &QueryTemplate,
        bindings: &ParameterBinding,
    ) -> QueryResult<RowStream> {
        let execution_id = Uuid::new_v4();
        let span = info_span!(
            "query_execute",
            %execution_id,
            backend = B::KIND,
            placeholders = template.placeholder_count()
        );

        let params = template.resolve(bindings).inspect_err(|e| {
            warn!(parent: &span, error = %e, "Rejected query bindings");
        })?;
        let sql = template.render(B::positional_marker);

        let handle = self.pool.acquire().await?;
        debug!(parent: &span, "Executing parameterized statement");

        Ok(RowStream::new(stream_rows::<B>(handle, sql, params, span)))
    }

    /// Execute the catalog template registered under `id`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownTemplate` for an unregistered id, otherwise
    /// the errors of [`execute`](Self::execute).
    pub async fn execute_named(
        &self,
        id: &str,
        bindings: &ParameterBinding,
    ) -> QueryResult<RowStream> {
        let template = self.catalog.get(id)?;
        self.execute(template, bindings).await
    }

    /// Execute a date-range query for the inclusive range `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidValue` before any I/O when either bound is
    /// not a calendar date or `start` is after `end`.
    pub async fn execute_date_range(
        &self,
        query: &DateRangeQuery,
        start: &str,
        end: &str,
    ) -> QueryResult<RowStream> {
        let bindings = query.bindings(start, end)?;
        self.execute(query.template(), &bindings).await
    }

    /// Execute and drain into a vector
    ///
    /// # Errors
    ///
    /// Returns any error of [`execute`](Self::execute) or of the row stream.
    pub async fn fetch_all(
        &self,
        template: &QueryTemplate,
        bindings: &ParameterBinding,
    ) -> QueryResult<Vec<ResultRow>> {
        self.execute(template, bindings).await?.collect_rows().await
    }

    /// Like [`fetch_all`](Self::fetch_all), retrying pool exhaustion and
    /// transient backend failures with exponential backoff
    ///
    /// # Errors
    ///
    /// Returns validation errors immediately, otherwise the last error after
    /// `max_attempts` attempts.
    pub async fn fetch_all_with_retry(
        &self,
        template: &QueryTemplate,
        bindings: &ParameterBinding,
        max_attempts: u32,
    ) -> QueryResult<Vec<ResultRow>> {
        retry_with_backoff(|| self.fetch_all(template, bindings), max_attempts).await
    }

    /// Named templates available to [`execute_named`](Self::execute_named)
    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Pool usage counters
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool<B::Db> {
        &self.pool
    }

    /// Shut the pool down
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn stream_rows<B: QueryBackend>(
    mut handle: ConnectionHandle<B::Db>,
    sql: String,
    params: Vec<SqlValue>,
    span: Span,
) -> impl Stream<Item = QueryResult<ResultRow>> + Send + 'static {
    stream! {
        let mut fetched: u64 = 0;
        let failure = {
            let mut rows = B::fetch(handle.connection(), &sql, &params);
            loop {
                match rows.next().await {
                    Some(Ok(row)) => {
                        fetched += 1;
                        yield Ok(row);
                    }
                    Some(Err(e)) => break Some(e),
                    None => break None,
                }
            }
        };

        // Release before anything else is reported to the caller
        drop(handle);

        match failure {
            None => debug!(parent: &span, rows = fetched, "Result stream exhausted"),
            Some(e) => {
                let error = backend_error(e);
                warn!(parent: &span, rows = fetched, error = %error, "Result stream failed");
                yield Err(error);
            }
        }
    }
}
