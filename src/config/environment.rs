// ABOUTME: Environment-based configuration for the query executor and its date-range query
// ABOUTME: Composes database URL, pool bounds, retry policy and catalog location from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::database::{DatabaseUrl, PoolConfig};
use crate::constants::{env_keys, retry};
use crate::database::DateRangeQuery;
use crate::errors::{AppError, AppResult, ErrorCode};

/// Definition of the configured date-range query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeConfig {
    /// Table to scan
    pub table: String,
    /// Column compared against the range
    pub date_column: String,
    /// Projection; empty selects every column
    pub columns: Vec<String>,
}

impl DateRangeConfig {
    /// Read `BOUNDQUERY_RANGE_*`; `None` when no table is configured
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_MISSING` when a table is set without a date column.
    pub fn from_env() -> AppResult<Option<Self>> {
        let Some(table) = env_non_empty(env_keys::RANGE_TABLE) else {
            return Ok(None);
        };
        let date_column = env_non_empty(env_keys::RANGE_DATE_COLUMN).ok_or_else(|| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!(
                    "{} is required when {} is set",
                    env_keys::RANGE_DATE_COLUMN,
                    env_keys::RANGE_TABLE
                ),
            )
        })?;
        let columns = env_non_empty(env_keys::RANGE_COLUMNS)
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        Ok(Some(Self {
            table,
            date_column,
            columns,
        }))
    }

    /// Build the query, ordered by the date column
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_INVALID` when an identifier is not a plain SQL name.
    pub fn build(&self) -> AppResult<DateRangeQuery> {
        DateRangeQuery::new(&self.table, &self.date_column, self.columns.iter().cloned())
            .and_then(DateRangeQuery::ordered)
            .map_err(|e| {
                AppError::config_invalid(format!("Invalid date-range query configuration: {e}"))
                    .with_source(e)
            })
    }
}

/// Complete executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Backend location
    pub database_url: DatabaseUrl,
    /// Pool bounds
    pub pool: PoolConfig,
    /// Attempts used by retried fetches
    pub retry_attempts: u32,
    /// Optional date-range query
    pub date_range: Option<DateRangeConfig>,
    /// Optional JSON file of named templates
    pub catalog_path: Option<PathBuf>,
}

impl QueryConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or any variable has an
    /// invalid value.
    pub fn from_env() -> AppResult<Self> {
        let raw_url = env::var(env_keys::DATABASE_URL).map_err(|_| {
            AppError::new(
                ErrorCode::ConfigMissing,
                format!("{} must be set", env_keys::DATABASE_URL),
            )
        })?;
        Self::from_env_with_url(&raw_url)
    }

    /// Catalog file named by `BOUNDQUERY_CATALOG_PATH`, without requiring
    /// any database settings
    #[must_use]
    pub fn catalog_path_from_env() -> Option<PathBuf> {
        env_non_empty(env_keys::CATALOG_PATH).map(PathBuf::from)
    }

    /// Like [`from_env`](Self::from_env) with an explicit database URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or any variable has an invalid value.
    pub fn from_env_with_url(database_url: &str) -> AppResult<Self> {
        let config = Self {
            database_url: DatabaseUrl::parse_url(database_url)?,
            pool: PoolConfig::from_env()?,
            retry_attempts: env_parse(env_keys::RETRY_ATTEMPTS, retry::DEFAULT_RETRY_ATTEMPTS)?,
            date_range: DateRangeConfig::from_env()?,
            catalog_path: Self::catalog_path_from_env(),
        };
        config.validate()?;
        debug!(config = %config.summary(), "Query configuration loaded");
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_INVALID` for zero retry attempts, invalid pool bounds
    /// or an invalid date-range definition.
    pub fn validate(&self) -> AppResult<()> {
        self.pool.validate()?;
        if self.retry_attempts == 0 {
            return Err(AppError::config_invalid(format!(
                "{} must be at least 1",
                env_keys::RETRY_ATTEMPTS
            )));
        }
        if let Some(range) = &self.date_range {
            range.build()?;
        }
        Ok(())
    }

    /// One-line description for startup logs, credentials masked
    #[must_use]
    pub fn summary(&self) -> String {
        let range = self.date_range.as_ref().map_or_else(
            || "none".to_owned(),
            |r| format!("{}.{}", r.table, r.date_column),
        );
        let catalog = self
            .catalog_path
            .as_ref()
            .map_or_else(|| "none".to_owned(), |p| p.display().to_string());
        format!(
            "database={} max_connections={} min_connections={} acquire_timeout_ms={} retry_attempts={} date_range={range} catalog={catalog}",
            self.database_url,
            self.pool.max_connections,
            self.pool.min_connections,
            self.pool.acquire_timeout_ms,
            self.retry_attempts,
        )
    }
}

/// Parse `key` when set, otherwise return `default`
///
/// # Errors
///
/// Returns `CONFIG_INVALID` when the variable is set but does not parse.
pub fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(env_parse_opt(key)?.unwrap_or(default))
}

/// Parse `key` when set
///
/// # Errors
///
/// Returns `CONFIG_INVALID` when the variable is set but does not parse.
pub fn env_parse_opt<T>(key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_non_empty(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AppError::config_invalid(format!("Invalid {key} value '{raw}': {e}")))
        })
        .transpose()
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("Date, Amount,,"), vec!["Date", "Amount"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_date_range_config_rejects_bad_identifier() {
        let config = DateRangeConfig {
            table: "Sales; DROP TABLE Sales".into(),
            date_column: "Date".into(),
            columns: vec![],
        };
        let err = config.build().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_summary_masks_credentials() {
        let config = QueryConfig {
            database_url: DatabaseUrl::parse_url("postgres://reader:hunter2@db/sales").unwrap(),
            pool: PoolConfig::default(),
            retry_attempts: 3,
            date_range: None,
            catalog_path: None,
        };
        let summary = config.summary();
        assert!(summary.contains("reader:****@db/sales"));
        assert!(!summary.contains("hunter2"));
    }
}
