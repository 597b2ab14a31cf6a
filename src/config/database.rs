// ABOUTME: Database URL parsing and connection pool configuration
// ABOUTME: Handles SQLite/PostgreSQL URL forms and SQLx pool bounds loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::environment::{env_parse, env_parse_opt};
use crate::constants::{env_keys, pool};
use crate::errors::{AppError, AppResult};

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to `SQLite` database file
        path: PathBuf,
    },
    /// `PostgreSQL` connection
    PostgreSQL {
        /// `PostgreSQL` connection string
        connection_string: String,
    },
    /// In-memory `SQLite`
    ///
    /// Every connection opens its own private database, so the pool is
    /// pinned to one long-lived connection (see [`PoolConfig::for_database`]).
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// Accepts `sqlite:<path>`, `sqlite://<path>`, `sqlite::memory:`,
    /// `postgres://...`, `postgresql://...` and a bare file path.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty URL or an empty `SQLite` path
    pub fn parse_url(s: &str) -> AppResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::config_invalid("Database URL is empty"));
        }

        if s.starts_with("postgresql://") || s.starts_with("postgres://") {
            return Ok(Self::PostgreSQL {
                connection_string: s.to_owned(),
            });
        }

        if let Some(rest) = s.strip_prefix("sqlite:") {
            let path_str = rest.strip_prefix("//").unwrap_or(rest);
            return match path_str {
                ":memory:" => Ok(Self::Memory),
                "" => Err(AppError::config_invalid("SQLite URL has no database path")),
                path => Ok(Self::SQLite {
                    path: PathBuf::from(path),
                }),
            };
        }

        // Fallback: treat as SQLite file path
        Ok(Self::SQLite {
            path: PathBuf::from(s),
        })
    }

    /// Convert to a `SQLx` connection string
    ///
    /// File databases get `mode=rwc` so a missing file is created.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => {
                let path = path.display().to_string();
                if path.contains('?') {
                    format!("sqlite:{path}")
                } else {
                    format!("sqlite:{path}?mode=rwc")
                }
            }
            Self::PostgreSQL { connection_string } => connection_string.clone(),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Connection string safe to log: `PostgreSQL` passwords are masked
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::PostgreSQL { connection_string } => mask_password(connection_string),
            other => other.to_connection_string(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Check if this is a `SQLite` database
    #[must_use]
    pub const fn is_sqlite(&self) -> bool {
        matches!(self, Self::SQLite { .. } | Self::Memory)
    }

    /// Check if this is a `PostgreSQL` database
    #[must_use]
    pub const fn is_postgresql(&self) -> bool {
        matches!(self, Self::PostgreSQL { .. })
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.redacted())
    }
}

fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_owned();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_owned(),
    }
}

/// `SQLx` connection pool bounds
///
/// Optional values of `None` keep the `SQLx` defaults; `Some(0)` disables
/// the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Bounded wait for a checkout, in milliseconds
    pub acquire_timeout_ms: u64,
    /// Idle time before a connection is closed (seconds)
    pub idle_timeout_secs: Option<u64>,
    /// Maximum lifetime of a connection (seconds)
    pub max_lifetime_secs: Option<u64>,
    /// Ping connections before handing them out
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: pool::DEFAULT_MAX_CONNECTIONS,
            min_connections: pool::DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_ms: pool::DEFAULT_ACQUIRE_TIMEOUT_MS,
            idle_timeout_secs: None,
            max_lifetime_secs: None,
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_INVALID` when a variable is set but does not parse, or
    /// when the resulting bounds are inconsistent.
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            max_connections: env_parse(env_keys::MAX_CONNECTIONS, pool::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: env_parse(env_keys::MIN_CONNECTIONS, pool::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_ms: env_parse(
                env_keys::ACQUIRE_TIMEOUT_MS,
                pool::DEFAULT_ACQUIRE_TIMEOUT_MS,
            )?,
            idle_timeout_secs: env_parse_opt(env_keys::IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: env_parse_opt(env_keys::MAX_LIFETIME_SECS)?,
            test_before_acquire: env_parse(env_keys::TEST_BEFORE_ACQUIRE, true)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Same bounds with a different `max_connections`
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Same bounds with a different checkout wait
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Bounds adjusted to what `url` can support
    ///
    /// An in-memory database lives only as long as its connection, so the
    /// pool is clamped to a single connection that is never reaped.
    #[must_use]
    pub fn for_database(&self, url: &DatabaseUrl) -> Self {
        if !url.is_memory() {
            return self.clone();
        }
        Self {
            max_connections: 1,
            min_connections: 1,
            idle_timeout_secs: Some(0),
            max_lifetime_secs: Some(0),
            ..self.clone()
        }
    }

    /// Checkout wait bound
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Check the bounds are usable
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_INVALID` when `max_connections` is zero, when
    /// `min_connections` exceeds it, or when the acquire timeout is zero.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_connections == 0 {
            return Err(AppError::config_invalid(format!(
                "{} must be at least 1",
                env_keys::MAX_CONNECTIONS
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::config_invalid(format!(
                "{} ({}) exceeds {} ({})",
                env_keys::MIN_CONNECTIONS,
                self.min_connections,
                env_keys::MAX_CONNECTIONS,
                self.max_connections
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(AppError::config_invalid(format!(
                "{} must be greater than zero",
                env_keys::ACQUIRE_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}
