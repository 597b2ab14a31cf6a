// ABOUTME: Main library entry point for the boundquery parameterized query layer
// ABOUTME: Exposes templates, bindings, pooled execution, configuration and logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Boundquery
//!
//! A parameterized tabular query execution layer. Statements are written as
//! templates with named, optionally typed placeholders; values travel to the
//! backend exclusively through the driver's parameter-binding channel and are
//! never spliced into statement text.
//!
//! ## Architecture
//!
//! - **Templates**: `:name` / `:name:type` placeholder parsing and positional rewriting
//! - **Bindings**: typed scalar values validated against the template before any I/O
//! - **Pool**: bounded connection checkout with RAII release on every exit path
//! - **Executor**: lazy, forward-only row streams over a pooled connection
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use boundquery::database::{ParameterBinding, QueryExecutor, QueryTemplate, SqliteBackend};
//! use boundquery::config::PoolConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor =
//!     QueryExecutor::<SqliteBackend>::connect("sqlite:sales.db", &PoolConfig::default()).await?;
//! let template = QueryTemplate::parse(
//!     "SELECT Date, Amount FROM Sales WHERE Date BETWEEN :start:date AND :end:date",
//! )?;
//! let bindings = ParameterBinding::new()
//!     .bind("start", "2024-01-01")
//!     .bind("end", "2024-01-31");
//!
//! for row in executor.fetch_all(&template, &bindings).await? {
//!     println!("{}", serde_json::to_string(&row)?);
//! }
//! # Ok(())
//! # }
//! ```

/// Environment-driven configuration
pub mod config;

/// Query templates, bindings, pooling and execution
pub mod database;

/// Unified error handling (re-exported from `boundquery-core`)
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Application constants (re-exported from `boundquery-core`)
pub use boundquery_core::constants;
