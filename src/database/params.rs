// ABOUTME: Typed scalar parameter values, placeholder types, and named parameter bindings
// ABOUTME: Coerces caller-supplied values to declared placeholder types before any I/O
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Parameter values and bindings
//!
//! A [`ParameterBinding`] maps placeholder names to [`SqlValue`]s. Values are
//! checked against each placeholder's [`ParamType`] during resolution, so a
//! malformed date or a non-numeric integer is rejected with
//! `QueryError::InvalidValue` before a connection is ever checked out.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::constants::formats;
use crate::errors::{QueryError, QueryResult};

/// A typed scalar value exchanged with the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL `NULL`
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// Double precision float
    Real(f64),
    /// Text
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time without offset
    Timestamp(NaiveDateTime),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Short name of the value's runtime kind, used in error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "blob",
        }
    }

    /// Whether this is SQL `NULL`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer value, if this is an integer
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this is text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Date value; text holding a calendar date is parsed
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            Self::Timestamp(v) => Some(v.date()),
            Self::Text(v) => parse_calendar_date(v).ok(),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Declared type of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Untyped: any value (including `NULL`) is passed through unchanged
    #[default]
    Any,
    /// Boolean
    Bool,
    /// 64-bit integer
    Integer,
    /// Floating point
    Real,
    /// Text
    Text,
    /// Calendar date
    Date,
    /// Date and time
    Timestamp,
}

impl ParamType {
    /// Canonical lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
        }
    }

    /// Convert `value` to the representation this type binds with
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidValue` when the value's runtime kind is
    /// incompatible with this type or its text does not parse.
    pub fn coerce(self, placeholder: &str, value: &SqlValue) -> QueryResult<SqlValue> {
        let reject = |reason: String| QueryError::invalid_value(placeholder, self.as_str(), reason);
        let wrong_kind = || reject(format!("{} value is not accepted", value.kind()));

        match (self, value) {
            (Self::Any, v) => Ok(v.clone()),
            (_, SqlValue::Null) => Err(reject("NULL is only accepted by untyped placeholders".into())),

            (Self::Bool, SqlValue::Bool(_))
            | (Self::Integer, SqlValue::Integer(_))
            | (Self::Real, SqlValue::Real(_))
            | (Self::Text, SqlValue::Text(_))
            | (Self::Date, SqlValue::Date(_))
            | (Self::Timestamp, SqlValue::Timestamp(_)) => Ok(value.clone()),

            (Self::Bool, SqlValue::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(SqlValue::Bool(true)),
                "false" | "0" => Ok(SqlValue::Bool(false)),
                _ => Err(reject("text is not a boolean".into())),
            },
            (Self::Integer, SqlValue::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|e| reject(format!("text is not an integer: {e}"))),
            (Self::Real, SqlValue::Integer(v)) => Ok(SqlValue::Real(*v as f64)),
            (Self::Real, SqlValue::Text(text)) => text
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .map_err(|e| reject(format!("text is not a number: {e}"))),
            (Self::Date, SqlValue::Text(text)) => parse_calendar_date(text)
                .map(SqlValue::Date)
                .map_err(|e| reject(e.to_string())),
            (Self::Timestamp, SqlValue::Date(date)) => {
                Ok(SqlValue::Timestamp(date.and_time(NaiveTime::MIN)))
            }
            (Self::Timestamp, SqlValue::Text(text)) => parse_timestamp(text)
                .map(SqlValue::Timestamp)
                .map_err(|e| reject(e.to_string())),

            _ => Err(wrong_kind()),
        }
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "bool" | "boolean" => Ok(Self::Bool),
            "int" | "integer" | "bigint" => Ok(Self::Integer),
            "real" | "float" | "double" => Ok(Self::Real),
            "text" | "string" | "varchar" => Ok(Self::Text),
            "date" => Ok(Self::Date),
            "timestamp" | "datetime" => Ok(Self::Timestamp),
            other => Err(QueryError::InvalidTemplate {
                reason: format!("unknown placeholder type '{other}'"),
            }),
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date
///
/// # Errors
///
/// Returns the chrono parse error when `text` is not a valid calendar date
/// (this includes impossible dates such as `2024-02-30`).
pub fn parse_calendar_date(text: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text.trim(), formats::DATE)
}

/// Parse an RFC 3339 or `YYYY-MM-DD[ T]HH:MM:SS` timestamp
///
/// RFC 3339 values are converted to UTC before the offset is dropped.
///
/// # Errors
///
/// Returns the last chrono parse error when no accepted format matches.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, formats::TIMESTAMP_SPACE))
        .or_else(|_| NaiveDateTime::parse_from_str(text, formats::TIMESTAMP_T))
}

/// Named parameter values for one execution
///
/// Keys are unique: binding a name twice keeps the last value. A leading `:`
/// on a name is ignored so `":start"` and `"start"` address the same slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBinding {
    values: BTreeMap<String, SqlValue>,
}

impl ParameterBinding {
    /// Create an empty binding set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `name`, consuming and returning the set
    #[must_use]
    pub fn bind(mut self, name: impl AsRef<str>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `value` to `name`, returning the value previously bound to it
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        self.values
            .insert(normalize_name(name.as_ref()).to_owned(), value.into())
    }

    /// Value bound to `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values.get(normalize_name(name))
    }

    /// Whether `name` is bound
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(normalize_name(name))
    }

    /// Bound names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of bound names
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>> FromIterator<(K, V)> for ParameterBinding {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut binding = Self::new();
        for (name, value) in iter {
            binding.insert(name, value);
        }
        binding
    }
}

fn normalize_name(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}
