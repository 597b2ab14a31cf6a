// ABOUTME: Tests for environment-driven executor configuration
// ABOUTME: Validates defaults, overrides, invalid values and date-range definitions from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use boundquery::config::{DatabaseUrl, PoolConfig, QueryConfig};
use boundquery::constants::env_keys;
use boundquery::errors::ErrorCode;
use serial_test::serial;

const ALL_KEYS: &[&str] = &[
    env_keys::DATABASE_URL,
    env_keys::MAX_CONNECTIONS,
    env_keys::MIN_CONNECTIONS,
    env_keys::ACQUIRE_TIMEOUT_MS,
    env_keys::IDLE_TIMEOUT_SECS,
    env_keys::MAX_LIFETIME_SECS,
    env_keys::TEST_BEFORE_ACQUIRE,
    env_keys::RETRY_ATTEMPTS,
    env_keys::RANGE_TABLE,
    env_keys::RANGE_DATE_COLUMN,
    env_keys::RANGE_COLUMNS,
    env_keys::CATALOG_PATH,
];

fn clear_env() {
    for key in ALL_KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults_when_unset() {
    clear_env();
    env::set_var(env_keys::DATABASE_URL, "sqlite:./sales.db");

    let config = QueryConfig::from_env().unwrap();
    assert_eq!(
        config.database_url,
        DatabaseUrl::parse_url("sqlite:./sales.db").unwrap()
    );
    assert_eq!(config.pool, PoolConfig::default());
    assert_eq!(config.pool.max_connections, 10);
    assert_eq!(config.pool.acquire_timeout_ms, 5_000);
    assert_eq!(config.retry_attempts, 3);
    assert!(config.date_range.is_none());
    assert!(config.catalog_path.is_none());
    clear_env();
}

#[test]
#[serial]
fn test_missing_database_url() {
    clear_env();
    let err = QueryConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissing);
}

#[test]
#[serial]
fn test_overrides_are_applied() {
    clear_env();
    env::set_var(env_keys::DATABASE_URL, "postgres://reader:pw@db/sales");
    env::set_var(env_keys::MAX_CONNECTIONS, "4");
    env::set_var(env_keys::MIN_CONNECTIONS, "1");
    env::set_var(env_keys::ACQUIRE_TIMEOUT_MS, "250");
    env::set_var(env_keys::IDLE_TIMEOUT_SECS, "60");
    env::set_var(env_keys::TEST_BEFORE_ACQUIRE, "false");
    env::set_var(env_keys::RETRY_ATTEMPTS, "5");
    env::set_var(env_keys::RANGE_TABLE, "Sales");
    env::set_var(env_keys::RANGE_DATE_COLUMN, "Date");
    env::set_var(env_keys::RANGE_COLUMNS, "Date, Amount");
    env::set_var(env_keys::CATALOG_PATH, "/etc/boundquery/catalog.json");

    let config = QueryConfig::from_env().unwrap();
    assert!(config.database_url.is_postgresql());
    assert_eq!(config.pool.max_connections, 4);
    assert_eq!(config.pool.min_connections, 1);
    assert_eq!(config.pool.acquire_timeout_ms, 250);
    assert_eq!(config.pool.idle_timeout_secs, Some(60));
    assert_eq!(config.pool.max_lifetime_secs, None);
    assert!(!config.pool.test_before_acquire);
    assert_eq!(config.retry_attempts, 5);

    let range = config.date_range.as_ref().unwrap();
    assert_eq!(range.columns, vec!["Date", "Amount"]);
    let query = range.build().unwrap();
    assert!(query.is_ordered());
    assert_eq!(query.template().placeholder_count(), 2);

    let summary = config.summary();
    assert!(summary.contains("max_connections=4"));
    assert!(summary.contains("date_range=Sales.Date"));
    assert!(!summary.contains(":pw@"));
    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    env::set_var(env_keys::DATABASE_URL, "sqlite:./sales.db");

    env::set_var(env_keys::MAX_CONNECTIONS, "many");
    let err = QueryConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains(env_keys::MAX_CONNECTIONS));

    env::set_var(env_keys::MAX_CONNECTIONS, "0");
    assert_eq!(
        QueryConfig::from_env().unwrap_err().code,
        ErrorCode::ConfigInvalid
    );

    env::set_var(env_keys::MAX_CONNECTIONS, "2");
    env::set_var(env_keys::MIN_CONNECTIONS, "3");
    assert_eq!(
        QueryConfig::from_env().unwrap_err().code,
        ErrorCode::ConfigInvalid
    );

    env::remove_var(env_keys::MIN_CONNECTIONS);
    env::set_var(env_keys::RETRY_ATTEMPTS, "0");
    assert_eq!(
        QueryConfig::from_env().unwrap_err().code,
        ErrorCode::ConfigInvalid
    );
    clear_env();
}

#[test]
#[serial]
fn test_date_range_requires_column_and_valid_identifiers() {
    clear_env();
    env::set_var(env_keys::DATABASE_URL, "sqlite:./sales.db");
    env::set_var(env_keys::RANGE_TABLE, "Sales");

    let err = QueryConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissing);

    env::set_var(env_keys::RANGE_DATE_COLUMN, "Date; DROP TABLE Sales");
    let err = QueryConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    clear_env();
}

#[test]
#[serial]
fn test_explicit_url_overrides_environment() {
    clear_env();
    env::set_var(env_keys::DATABASE_URL, "postgres://ignored/db");
    let config = QueryConfig::from_env_with_url("sqlite::memory:").unwrap();
    assert!(config.database_url.is_memory());
    clear_env();
}
