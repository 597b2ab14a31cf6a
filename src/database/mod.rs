// ABOUTME: Parameterized query layer: templates, bindings, pooling, backends and execution
// ABOUTME: Values only ever reach the backend through driver parameter binding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Query Layer
//!
//! - [`QueryTemplate`]: parsed statement text with named placeholders
//! - [`ParameterBinding`]: values keyed by placeholder name
//! - [`ConnectionPool`]: bounded pool with RAII [`ConnectionHandle`]s
//! - [`QueryExecutor`]: validation, checkout and lazy [`RowStream`]s
//! - [`TemplateCatalog`]: named templates addressed by id
//! - [`DateRangeQuery`]: inclusive date-range convenience query

/// Backend drivers
pub mod backend;
/// Named template registry
pub mod catalog;
/// Date-range query builder
pub mod date_range;
/// Query execution
pub mod executor;
/// Runtime backend selection
pub mod factory;
/// Parameter values and coercion
pub mod params;
/// Connection pool
pub mod pool;
/// Transient failure handling
pub mod retry;
/// Result rows
pub mod row;
/// Query templates
pub mod template;

pub use backend::{QueryBackend, SqliteBackend};
#[cfg(feature = "postgresql")]
pub use backend::PostgresBackend;
pub use catalog::TemplateCatalog;
pub use date_range::DateRangeQuery;
pub use executor::{QueryExecutor, RowStream};
pub use factory::ConfiguredExecutor;
pub use params::{ParamType, ParameterBinding, SqlValue};
pub use pool::{ConnectionHandle, ConnectionPool, PoolStats};
pub use retry::{is_transient, retry_with_backoff};
pub use row::ResultRow;
pub use template::{Placeholder, QueryTemplate};
