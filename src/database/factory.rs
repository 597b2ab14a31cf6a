// ABOUTME: Runtime backend selection from the configured database URL
// ABOUTME: Wraps a backend-specific QueryExecutor behind a single enum for callers like the CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tracing::info;

use super::backend::SqliteBackend;
#[cfg(feature = "postgresql")]
use super::backend::PostgresBackend;
use super::catalog::TemplateCatalog;
use super::date_range::DateRangeQuery;
use super::executor::{QueryExecutor, RowStream};
use super::params::ParameterBinding;
use super::pool::PoolStats;
use super::row::ResultRow;
use super::template::QueryTemplate;
use crate::config::{DatabaseUrl, PoolConfig};
#[cfg(not(feature = "postgresql"))]
use crate::errors::AppError;
use crate::errors::{AppResult, QueryResult};

/// Executor for whichever backend the database URL names
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ConfiguredExecutor {
    /// `SQLite` (file or memory)
    Sqlite(QueryExecutor<SqliteBackend>),
    /// `PostgreSQL`
    #[cfg(feature = "postgresql")]
    Postgres(QueryExecutor<PostgresBackend>),
}

/// Forward a call to the wrapped executor
macro_rules! dispatch {
    ($self:expr, $executor:ident => $body:expr) => {
        match $self {
            ConfiguredExecutor::Sqlite($executor) => $body,
            #[cfg(feature = "postgresql")]
            ConfiguredExecutor::Postgres($executor) => $body,
        }
    };
}

impl ConfiguredExecutor {
    /// Open a pool for `url`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a `PostgreSQL` URL when the
    /// `postgresql` feature is disabled, otherwise any pool connection error.
    pub async fn connect(url: &DatabaseUrl, pool: &PoolConfig) -> AppResult<Self> {
        info!(database = %url, "Connecting query executor");
        match url {
            DatabaseUrl::SQLite { .. } | DatabaseUrl::Memory => Ok(Self::Sqlite(
                QueryExecutor::connect(&url.to_connection_string(), &pool.for_database(url))
                    .await?,
            )),
            #[cfg(feature = "postgresql")]
            DatabaseUrl::PostgreSQL { connection_string } => Ok(Self::Postgres(
                QueryExecutor::connect(connection_string, pool).await?,
            )),
            #[cfg(not(feature = "postgresql"))]
            DatabaseUrl::PostgreSQL { .. } => Err(AppError::config(
                "PostgreSQL URL provided but the postgresql feature is not enabled",
            )),
        }
    }

    /// Attach a catalog of named templates
    #[must_use]
    pub fn with_catalog(self, catalog: TemplateCatalog) -> Self {
        match self {
            Self::Sqlite(executor) => Self::Sqlite(executor.with_catalog(catalog)),
            #[cfg(feature = "postgresql")]
            Self::Postgres(executor) => Self::Postgres(executor.with_catalog(catalog)),
        }
    }

    /// Backend name
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgresql")]
            Self::Postgres(_) => "postgresql",
        }
    }

    /// See [`QueryExecutor::execute`]
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::execute`].
    pub async fn execute(
        &self,
        template: &QueryTemplate,
        bindings: &ParameterBinding,
    ) -> QueryResult<RowStream> {
        dispatch!(self, executor => executor.execute(template, bindings).await)
    }

    /// See [`QueryExecutor::execute_named`]
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::execute_named`].
    pub async fn execute_named(&self, id: &str, bindings: &ParameterBinding) -> QueryResult<RowStream> {
        dispatch!(self, executor => executor.execute_named(id, bindings).await)
    }

    /// See [`QueryExecutor::execute_date_range`]
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::execute_date_range`].
    pub async fn execute_date_range(
        &self,
        query: &DateRangeQuery,
        start: &str,
        end: &str,
    ) -> QueryResult<RowStream> {
        dispatch!(self, executor => executor.execute_date_range(query, start, end).await)
    }

    /// See [`QueryExecutor::fetch_all_with_retry`]
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::fetch_all_with_retry`].
    pub async fn fetch_all_with_retry(
        &self,
        template: &QueryTemplate,
        bindings: &ParameterBinding,
        max_attempts: u32,
    ) -> QueryResult<Vec<ResultRow>> {
        dispatch!(self, executor => executor.fetch_all_with_retry(template, bindings, max_attempts).await)
    }

    /// Named templates
    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        dispatch!(self, executor => executor.catalog())
    }

    /// Pool usage counters
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        dispatch!(self, executor => executor.pool_stats())
    }

    /// Shut the pool down
    pub async fn close(&self) {
        dispatch!(self, executor => executor.close().await);
    }
}
