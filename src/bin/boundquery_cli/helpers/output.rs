// ABOUTME: Output formatting helpers for boundquery-cli
// ABOUTME: Writes rows as JSON lines on stdout and errors as JSON on stderr
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io::{self, Write};

use boundquery::database::{QueryTemplate, ResultRow};
use boundquery::errors::{AppError, AppResult, ErrorResponse};

/// Write one row as a JSON line
pub fn print_row(row: &ResultRow) -> AppResult<()> {
    let line = serde_json::to_string(row)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")
        .map_err(|e| AppError::internal(format!("Failed to write row: {e}")).with_source(e))
}

/// Describe one catalog template
pub fn print_catalog_entry(id: &str, template: &QueryTemplate) {
    let placeholders: Vec<String> = template
        .placeholders()
        .iter()
        .map(|p| format!(":{}:{}", p.name(), p.param_type()))
        .collect();
    println!("{id}");
    println!("   Placeholders: {}", if placeholders.is_empty() { "none".to_owned() } else { placeholders.join(", ") });
    println!("   SQL: {}", template.source());
}

/// Report a failure as a JSON error response on stderr
pub fn print_error(error: AppError) {
    let status = error.http_status();
    let response = ErrorResponse::from(error);
    match serde_json::to_string(&response) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("Error ({status}): {}", response.error.message),
    }
}
