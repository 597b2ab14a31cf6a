// ABOUTME: Boundquery CLI - run parameterized queries against a pooled database from the shell
// ABOUTME: Prints result rows as JSON lines and errors as JSON error responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Ad-hoc template with named parameters
//! boundquery-cli query --sql "SELECT * FROM Sales WHERE Amount > :min:integer" --param min=10
//!
//! # Configured date-range query (BOUNDQUERY_RANGE_TABLE / BOUNDQUERY_RANGE_DATE_COLUMN)
//! boundquery-cli range --start 2024-01-01 --end 2024-01-31
//!
//! # Named template from the catalog file
//! boundquery-cli --catalog queries.json named sales_by_range --param start=2024-01-01 --param end=2024-01-31
//!
//! # List catalog templates
//! boundquery-cli --catalog queries.json catalog
//! ```

mod commands;
mod helpers;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use boundquery::config::QueryConfig;
use boundquery::database::{ConfiguredExecutor, TemplateCatalog};
use boundquery::errors::AppResult;
use boundquery::logging::LoggingConfig;
use clap::{Parser, Subcommand};
use tracing::info;

use helpers::output::print_error;

#[derive(Parser)]
#[command(
    name = "boundquery-cli",
    about = "Parameterized query runner",
    long_about = "Runs parameterized SQL templates against a pooled database connection. Values are always sent as bound parameters."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override (defaults to DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Template catalog file override (defaults to BOUNDQUERY_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Run an ad-hoc template
    Query {
        /// Template text with `:name` or `:name:type` placeholders
        #[arg(long)]
        sql: String,

        /// Parameter as `name=value` (repeatable)
        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Retry pool exhaustion and transient backend errors
        #[arg(long)]
        retry: bool,
    },

    /// Run the configured date-range query for an inclusive range
    Range {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },

    /// Run a template from the catalog
    Named {
        /// Template id
        id: String,

        /// Parameter as `name=value` (repeatable)
        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// List catalog templates and their placeholders
    Catalog,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    if let Err(e) = logging.init() {
        eprintln!("Warning: {e:#}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    // Listing templates never touches the database
    if matches!(cli.command, Command::Catalog) {
        let path = cli.catalog.or_else(QueryConfig::catalog_path_from_env);
        commands::list_catalog(&load_catalog(path.as_deref())?);
        return Ok(());
    }

    let config = match &cli.database_url {
        Some(url) => QueryConfig::from_env_with_url(url)?,
        None => QueryConfig::from_env()?,
    };
    info!(config = %config.summary(), "Boundquery CLI");

    let catalog = load_catalog(cli.catalog.as_deref().or(config.catalog_path.as_deref()))?;
    let executor = ConfiguredExecutor::connect(&config.database_url, &config.pool)
        .await?
        .with_catalog(catalog);

    let result = match cli.command {
        Command::Query { sql, params, retry } => {
            let attempts = if retry { config.retry_attempts } else { 1 };
            commands::run_query(&executor, &sql, &params, attempts).await
        }
        Command::Range { start, end } => {
            commands::run_range(&executor, &config, &start, &end).await
        }
        Command::Named { id, params } => commands::run_named(&executor, &id, &params).await,
        Command::Catalog => Ok(()),
    };

    info!(stats = ?executor.pool_stats(), "Pool statistics");
    executor.close().await;
    result
}

fn load_catalog(path: Option<&Path>) -> AppResult<TemplateCatalog> {
    path.map_or_else(|| Ok(TemplateCatalog::new()), TemplateCatalog::from_file)
}
