// ABOUTME: Configuration module for the query executor
// ABOUTME: Environment-driven database, pool, retry and date-range settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration
//!
//! - **Database**: URL parsing and connection pool bounds
//! - **Environment**: composed executor configuration loaded from env vars

/// Database URL and pool configuration
pub mod database;
/// Environment-driven executor configuration
pub mod environment;

pub use database::{DatabaseUrl, PoolConfig};
pub use environment::{DateRangeConfig, QueryConfig};
