// ABOUTME: SQLite implementation of the query backend seam
// ABOUTME: Binds typed values with numbered `?N` markers and decodes rows by declared and storage type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::NaiveDateTime;
use futures_util::stream::{BoxStream, StreamExt};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow, SqliteTypeInfo};
use sqlx::{Column, Row, Sqlite, SqliteConnection, TypeInfo, ValueRef};

use super::QueryBackend;
use crate::database::params::{parse_calendar_date, SqlValue};
use crate::database::row::ResultRow;

/// `SQLite` backend marker
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl QueryBackend for SqliteBackend {
    type Db = Sqlite;

    const KIND: &'static str = "sqlite";

    fn positional_marker(index: usize) -> String {
        format!("?{index}")
    }

    fn fetch<'c>(
        connection: &'c mut SqliteConnection,
        sql: &'c str,
        params: &'c [SqlValue],
    ) -> BoxStream<'c, Result<ResultRow, sqlx::Error>> {
        let query = params.iter().fold(sqlx::query(sql), bind_value);
        let mut columns: Option<Arc<[String]>> = None;
        query
            .fetch(connection)
            .map(move |row| decode_row(&row?, &mut columns))
            .boxed()
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
        SqlValue::Blob(v) => query.bind(v.as_slice()),
    }
}

fn decode_row(
    row: &SqliteRow,
    names: &mut Option<Arc<[String]>>,
) -> Result<ResultRow, sqlx::Error> {
    let columns = Arc::clone(names.get_or_insert_with(|| {
        row.columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect()
    }));
    let values = row
        .columns()
        .iter()
        .map(|column| decode_column(row, column.ordinal(), column.type_info()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResultRow::new(columns, values))
}

/// SQLite is dynamically typed: the declared column type only refines the
/// storage class (TEXT dates, INTEGER booleans), it never overrides it.
fn decode_column(
    row: &SqliteRow,
    index: usize,
    declared: &SqliteTypeInfo,
) -> Result<SqlValue, sqlx::Error> {
    let storage = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        raw.type_info().name().to_owned()
    };

    let value = match (declared.name(), storage.as_str()) {
        ("BOOLEAN", "INTEGER") => SqlValue::Bool(row.try_get_unchecked(index)?),
        ("DATE", "TEXT") => {
            let text: String = row.try_get_unchecked(index)?;
            match parse_calendar_date(&text) {
                Ok(date) => SqlValue::Date(date),
                Err(_) => SqlValue::Text(text),
            }
        }
        ("DATETIME", "TEXT") => match row.try_get_unchecked::<NaiveDateTime, _>(index) {
            Ok(timestamp) => SqlValue::Timestamp(timestamp),
            Err(_) => SqlValue::Text(row.try_get_unchecked(index)?),
        },
        (_, "INTEGER") => SqlValue::Integer(row.try_get_unchecked(index)?),
        (_, "REAL") => SqlValue::Real(row.try_get_unchecked(index)?),
        (_, "BLOB") => SqlValue::Blob(row.try_get_unchecked(index)?),
        _ => SqlValue::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}
