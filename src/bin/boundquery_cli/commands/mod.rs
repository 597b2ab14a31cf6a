// ABOUTME: Command implementations for boundquery-cli
// ABOUTME: Parses name=value parameters, runs templates and streams rows to stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use boundquery::config::QueryConfig;
use boundquery::database::{ConfiguredExecutor, ParameterBinding, QueryTemplate, RowStream, TemplateCatalog};
use boundquery::errors::{AppError, AppResult};
use tracing::info;

use crate::helpers::output::{print_catalog_entry, print_row};

/// Run an ad-hoc template
pub async fn run_query(
    executor: &ConfiguredExecutor,
    sql: &str,
    params: &[String],
    attempts: u32,
) -> AppResult<()> {
    let template = QueryTemplate::parse(sql)?;
    let bindings = parse_params(params)?;

    if attempts > 1 {
        let rows = executor
            .fetch_all_with_retry(&template, &bindings, attempts)
            .await?;
        for row in &rows {
            print_row(row)?;
        }
        info!(rows = rows.len(), "Query complete");
        return Ok(());
    }

    let stream = executor.execute(&template, &bindings).await?;
    drain(stream).await
}

/// Run the configured date-range query
pub async fn run_range(
    executor: &ConfiguredExecutor,
    config: &QueryConfig,
    start: &str,
    end: &str,
) -> AppResult<()> {
    let query = config
        .date_range
        .as_ref()
        .ok_or_else(|| {
            AppError::config(
                "No date-range query configured (set BOUNDQUERY_RANGE_TABLE and BOUNDQUERY_RANGE_DATE_COLUMN)",
            )
        })?
        .build()?;

    let stream = executor.execute_date_range(&query, start, end).await?;
    drain(stream).await
}

/// Run a catalog template
pub async fn run_named(executor: &ConfiguredExecutor, id: &str, params: &[String]) -> AppResult<()> {
    let bindings = parse_params(params)?;
    let stream = executor.execute_named(id, &bindings).await?;
    drain(stream).await
}

/// Print every catalog template
pub fn list_catalog(catalog: &TemplateCatalog) {
    for (id, template) in catalog.iter() {
        print_catalog_entry(id, template);
    }
}

async fn drain(mut stream: RowStream) -> AppResult<()> {
    let mut count: u64 = 0;
    while let Some(row) = stream.next_row().await? {
        print_row(&row)?;
        count += 1;
    }
    info!(rows = count, "Query complete");
    Ok(())
}

/// Parse repeated `name=value` arguments into text bindings
///
/// Typed placeholders coerce the text; untyped ones receive it verbatim.
fn parse_params(params: &[String]) -> AppResult<ParameterBinding> {
    params
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .filter(|(name, _)| !name.trim().is_empty())
                .map(|(name, value)| (name.trim().to_owned(), value.to_owned()))
                .ok_or_else(|| {
                    AppError::invalid_input(format!("Parameter '{raw}' is not in NAME=VALUE form"))
                })
        })
        .collect::<AppResult<Vec<_>>>()
        .map(|pairs| {
            pairs
                .into_iter()
                .fold(ParameterBinding::new(), |bindings, (name, value)| {
                    bindings.bind(name, value)
                })
        })
}
