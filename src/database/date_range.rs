// ABOUTME: Inclusive date-range query builder over a configured table and date column
// ABOUTME: Validates identifiers at construction and date bounds before binding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::NaiveDate;

use super::params::{parse_calendar_date, ParamType, ParameterBinding};
use super::template::QueryTemplate;
use crate::errors::{QueryError, QueryResult};

/// Placeholder holding the lower bound
pub const START_PLACEHOLDER: &str = "start";
/// Placeholder holding the upper bound
pub const END_PLACEHOLDER: &str = "end";

/// `SELECT <columns> FROM <table> WHERE <date_column> BETWEEN :start AND :end`
///
/// Table and column names are configuration. They are checked against
/// `[A-Za-z_][A-Za-z0-9_]*` and emitted double-quoted; the date bounds are
/// always bound parameters.
#[derive(Debug, Clone)]
pub struct DateRangeQuery {
    table: String,
    date_column: String,
    columns: Vec<String>,
    ordered: bool,
    template: QueryTemplate,
}

impl DateRangeQuery {
    /// Build the query; an empty `columns` list selects `*`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTemplate` when any identifier is not a
    /// plain SQL name.
    pub fn new<I, S>(table: &str, date_column: &str, columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        validate_identifier(table)?;
        validate_identifier(date_column)?;
        for column in &columns {
            validate_identifier(column)?;
        }

        let template = build_template(table, date_column, &columns, false)?;
        Ok(Self {
            table: table.to_owned(),
            date_column: date_column.to_owned(),
            columns,
            ordered: false,
            template,
        })
    }

    /// Sort results by the date column
    ///
    /// # Errors
    ///
    /// Only fails if the rebuilt statement cannot be parsed, which the
    /// identifier checks in [`new`](Self::new) rule out.
    pub fn ordered(mut self) -> QueryResult<Self> {
        self.template = build_template(&self.table, &self.date_column, &self.columns, true)?;
        self.ordered = true;
        Ok(self)
    }

    /// The parsed statement
    #[must_use]
    pub const fn template(&self) -> &QueryTemplate {
        &self.template
    }

    /// Table being scanned
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column filtered by the range
    #[must_use]
    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    /// Whether rows are sorted by the date column
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Validate textual bounds and produce the bindings for them
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidValue` when either bound is not a
    /// `YYYY-MM-DD` calendar date or when `start` is after `end`.
    pub fn bindings(&self, start: &str, end: &str) -> QueryResult<ParameterBinding> {
        let parse = |placeholder: &str, text: &str| {
            parse_calendar_date(text).map_err(|e| {
                QueryError::invalid_value(
                    placeholder,
                    ParamType::Date.as_str(),
                    format!("'{}' is not a calendar date: {e}", text.trim()),
                )
            })
        };
        let start = parse(START_PLACEHOLDER, start)?;
        let end = parse(END_PLACEHOLDER, end)?;
        self.bindings_for_dates(start, end)
    }

    /// Produce bindings for already-parsed bounds
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidValue` when `start` is after `end`.
    pub fn bindings_for_dates(&self, start: NaiveDate, end: NaiveDate) -> QueryResult<ParameterBinding> {
        if start > end {
            return Err(QueryError::invalid_value(
                START_PLACEHOLDER,
                ParamType::Date.as_str(),
                format!("range start {start} is after range end {end}"),
            ));
        }
        Ok(ParameterBinding::new()
            .bind(START_PLACEHOLDER, start)
            .bind(END_PLACEHOLDER, end))
    }
}

fn build_template(
    table: &str,
    date_column: &str,
    columns: &[String],
    ordered: bool,
) -> QueryResult<QueryTemplate> {
    let projection = if columns.is_empty() {
        "*".to_owned()
    } else {
        columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let date_column = quote_identifier(date_column);
    let mut sql = format!(
        "SELECT {projection} FROM {} WHERE {date_column} BETWEEN :{START_PLACEHOLDER}:date AND :{END_PLACEHOLDER}:date",
        quote_identifier(table)
    );
    if ordered {
        sql.push_str(" ORDER BY ");
        sql.push_str(&date_column);
    }
    QueryTemplate::parse(sql)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Check that `name` is a plain SQL identifier
///
/// # Errors
///
/// Returns `QueryError::InvalidTemplate` otherwise.
pub fn validate_identifier(name: &str) -> QueryResult<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidTemplate {
            reason: format!("'{name}' is not a valid SQL identifier"),
        })
    }
}
