// ABOUTME: Driver seam between the executor and concrete SQLx backends
// ABOUTME: Each backend renders positional markers, binds typed values, and decodes rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use futures_util::stream::BoxStream;

use super::params::SqlValue;
use super::row::ResultRow;

/// `SQLite` backend (default)
pub mod sqlite;

/// `PostgreSQL` backend
#[cfg(feature = "postgresql")]
pub mod postgres;

pub use sqlite::SqliteBackend;

#[cfg(feature = "postgresql")]
pub use postgres::PostgresBackend;

/// A relational backend reachable through `SQLx`
///
/// Implementations receive the rendered statement text and the ordered
/// parameter values separately, and must hand the values to the driver
/// through its binding API.
pub trait QueryBackend: Send + Sync + 'static {
    /// `SQLx` database type
    type Db: sqlx::Database;

    /// Backend name for logs
    const KIND: &'static str;

    /// Marker for the 1-based parameter `index`
    fn positional_marker(index: usize) -> String;

    /// Run `sql` with `params` bound in order and stream decoded rows
    fn fetch<'c>(
        connection: &'c mut <Self::Db as sqlx::Database>::Connection,
        sql: &'c str,
        params: &'c [SqlValue],
    ) -> BoxStream<'c, Result<ResultRow, sqlx::Error>>;
}
