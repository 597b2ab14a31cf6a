// ABOUTME: PostgreSQL implementation of the query backend seam
// ABOUTME: Binds typed values with `$N` markers and decodes rows by column type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::stream::{BoxStream, StreamExt};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use super::QueryBackend;
use crate::database::params::SqlValue;
use crate::database::row::ResultRow;

/// `PostgreSQL` backend marker
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend;

impl QueryBackend for PostgresBackend {
    type Db = Postgres;

    const KIND: &'static str = "postgresql";

    fn positional_marker(index: usize) -> String {
        format!("${index}")
    }

    fn fetch<'c>(
        connection: &'c mut PgConnection,
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
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> Query<'q, Postgres, PgArguments> {
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

fn decode_row(row: &PgRow, names: &mut Option<Arc<[String]>>) -> Result<ResultRow, sqlx::Error> {
    let columns = Arc::clone(names.get_or_insert_with(|| {
        row.columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect()
    }));
    let values = row
        .columns()
        .iter()
        .map(|column| decode_column(row, column.ordinal(), column.type_info().name()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResultRow::new(columns, values))
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<SqlValue, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let value = match type_name {
        "BOOL" => SqlValue::Bool(row.try_get(index)?),
        "INT2" => SqlValue::Integer(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => SqlValue::Integer(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => SqlValue::Integer(row.try_get(index)?),
        "FLOAT4" => SqlValue::Real(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => SqlValue::Real(row.try_get(index)?),
        "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(index)?),
        "TIMESTAMP" => SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?),
        "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?.naive_utc()),
        "BYTEA" => SqlValue::Blob(row.try_get(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
            SqlValue::Text(row.try_get(index)?)
        }
        // SUM/AVG over integer columns come back as NUMERIC
        "NUMERIC" => decimal_value(row.try_get::<Decimal, _>(index)?),
        "UUID" => SqlValue::Text(row.try_get::<Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => SqlValue::Text(row.try_get::<JsonValue, _>(index)?.to_string()),
        "TIME" => SqlValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        other => {
            return Err(sqlx::Error::Decode(
                format!("unsupported column type {other} at index {index}").into(),
            ))
        }
    };
    Ok(value)
}

/// Whole numbers that fit become integers; anything else keeps its exact text
fn decimal_value(value: Decimal) -> SqlValue {
    if value.fract().is_zero() {
        if let Some(integer) = value.to_i64() {
            return SqlValue::Integer(integer);
        }
    }
    SqlValue::Text(value.normalize().to_string())
}
