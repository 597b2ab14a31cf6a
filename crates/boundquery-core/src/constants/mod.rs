// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pool sizing, retry backoff, and date format defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! flat namespace.

/// Service identification used in structured logs
pub mod service_names {
    /// Default service name
    pub const BOUNDQUERY: &str = "boundquery";
}

/// Connection pool defaults
pub mod pool {
    /// Default maximum number of pooled connections
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    /// Default number of connections kept open while idle
    pub const DEFAULT_MIN_CONNECTIONS: u32 = 0;
    /// Default bounded wait for a connection checkout
    pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
}

/// Retry and backoff defaults for transient failures
pub mod retry {
    /// Default number of attempts (first try included)
    pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
    /// Backoff before the second attempt; doubles for each later attempt
    pub const BASE_BACKOFF_MS: u64 = 10;
    /// Upper bound for a single backoff sleep
    pub const MAX_BACKOFF_MS: u64 = 1_000;
}

/// Textual formats accepted for temporal parameter values
pub mod formats {
    /// Calendar date
    pub const DATE: &str = "%Y-%m-%d";
    /// Timestamp with a space separator
    pub const TIMESTAMP_SPACE: &str = "%Y-%m-%d %H:%M:%S";
    /// Timestamp with a `T` separator and no offset
    pub const TIMESTAMP_T: &str = "%Y-%m-%dT%H:%M:%S";
}

/// Database environment variable names
pub mod env_keys {
    /// Backend connection string
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Pool size upper bound
    pub const MAX_CONNECTIONS: &str = "BOUNDQUERY_MAX_CONNECTIONS";
    /// Pool size lower bound
    pub const MIN_CONNECTIONS: &str = "BOUNDQUERY_MIN_CONNECTIONS";
    /// Checkout wait bound in milliseconds
    pub const ACQUIRE_TIMEOUT_MS: &str = "BOUNDQUERY_ACQUIRE_TIMEOUT_MS";
    /// Attempts for retried fetches
    pub const RETRY_ATTEMPTS: &str = "BOUNDQUERY_RETRY_ATTEMPTS";
    /// Table scanned by the date-range query
    pub const RANGE_TABLE: &str = "BOUNDQUERY_RANGE_TABLE";
    /// Date column filtered by the date-range query
    pub const RANGE_DATE_COLUMN: &str = "BOUNDQUERY_RANGE_DATE_COLUMN";
    /// Comma-separated projection of the date-range query
    pub const RANGE_COLUMNS: &str = "BOUNDQUERY_RANGE_COLUMNS";
    /// JSON file of named templates
    pub const CATALOG_PATH: &str = "BOUNDQUERY_CATALOG_PATH";
    /// Idle connection reap interval in seconds
    pub const IDLE_TIMEOUT_SECS: &str = "SQLX_IDLE_TIMEOUT_SECS";
    /// Maximum connection lifetime in seconds
    pub const MAX_LIFETIME_SECS: &str = "SQLX_MAX_LIFETIME_SECS";
    /// Ping connections before handing them out
    pub const TEST_BEFORE_ACQUIRE: &str = "SQLX_TEST_BEFORE_ACQUIRE";
}
