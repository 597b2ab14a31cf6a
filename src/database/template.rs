// ABOUTME: Immutable query templates with named, optionally typed placeholders
// ABOUTME: Parses `:name` / `:name:type` slots and rewrites them to backend positional markers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Query templates
//!
//! A template is parsed once into literal SQL segments and placeholder slots.
//! Rendering for a backend only ever emits the literal segments and the
//! backend's positional markers (`?1`, `$1`), so there is no code path that
//! can place a bound value into statement text.
//!
//! Placeholder grammar:
//!
//! - `:name` declares an untyped slot
//! - `:name:type` declares a typed slot (`date`, `integer`, `text`, ...)
//! - `::` is left alone so PostgreSQL casts (`:start::date`) keep working
//! - colons inside `'literals'`, `"identifiers"`, `-- comments` and
//!   `/* comments */` are not placeholders
//!
//! Literal `?`, `$n`, `:n`, `$name` and `@name` markers are rejected: the
//! driver would treat them as parameters the binding check never saw.
//! `$tag$` dollar-quoted bodies are copied verbatim.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use super::params::{ParamType, ParameterBinding, SqlValue};
use crate::errors::{QueryError, QueryResult};

/// One named slot in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    name: String,
    param_type: ParamType,
}

impl Placeholder {
    /// Placeholder name without the leading `:`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type (`ParamType::Any` when unannotated)
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        self.param_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Sql(String),
    /// Index into the distinct placeholder list
    Slot(usize),
}

#[derive(Debug)]
struct TemplateInner {
    source: String,
    segments: Vec<Segment>,
    placeholders: Vec<Placeholder>,
}

/// Immutable, cheaply cloneable parsed statement template
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    inner: Arc<TemplateInner>,
}

impl QueryTemplate {
    /// Parse `text` into a template
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTemplate` for empty text, unterminated
    /// literals or comments, unknown placeholder types, conflicting types for
    /// the same name, or anonymous positional markers.
    pub fn parse(text: impl Into<String>) -> QueryResult<Self> {
        let source = text.into();
        if source.trim().is_empty() {
            return Err(invalid("template is empty"));
        }
        let (segments, placeholders) = Parser::new(&source).run()?;
        Ok(Self {
            inner: Arc::new(TemplateInner {
                source,
                segments,
                placeholders,
            }),
        })
    }

    /// Original template text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Distinct placeholders in order of first appearance
    #[must_use]
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.inner.placeholders
    }

    /// Number of distinct placeholders
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.inner.placeholders.len()
    }

    /// Whether the template references `name`
    #[must_use]
    pub fn has_placeholder(&self, name: &str) -> bool {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.inner.placeholders.iter().any(|p| p.name == name)
    }

    /// Render the statement with each slot replaced by `marker(position)`
    ///
    /// Positions are 1-based and follow first appearance, so a name used
    /// twice maps to the same marker.
    #[must_use]
    pub fn render(&self, marker: impl Fn(usize) -> String) -> String {
        let mut sql = String::with_capacity(self.inner.source.len());
        for segment in &self.inner.segments {
            match segment {
                Segment::Sql(text) => sql.push_str(text),
                Segment::Slot(index) => sql.push_str(&marker(index + 1)),
            }
        }
        sql
    }

    /// Check `bindings` against the placeholder set and coerce each value
    ///
    /// The returned values are ordered by marker position.
    ///
    /// # Errors
    ///
    /// - `QueryError::InvalidParameters` when the bound names differ from the
    ///   placeholder names (both lists are reported, sorted)
    /// - `QueryError::InvalidValue` when a value does not fit its declared type
    pub fn resolve(&self, bindings: &ParameterBinding) -> QueryResult<Vec<SqlValue>> {
        let mut missing: Vec<String> = self
            .inner
            .placeholders
            .iter()
            .filter(|p| !bindings.contains(&p.name))
            .map(|p| p.name.clone())
            .collect();
        let extraneous: Vec<String> = bindings
            .names()
            .filter(|name| !self.has_placeholder(name))
            .map(str::to_owned)
            .collect();

        if !missing.is_empty() || !extraneous.is_empty() {
            missing.sort();
            return Err(QueryError::InvalidParameters {
                missing,
                extraneous,
            });
        }

        self.inner
            .placeholders
            .iter()
            .map(|p| {
                let value = bindings
                    .get(&p.name)
                    .ok_or_else(|| QueryError::InvalidParameters {
                        missing: vec![p.name.clone()],
                        extraneous: Vec::new(),
                    })?;
                p.param_type.coerce(&p.name, value)
            })
            .collect()
    }
}

impl Display for QueryTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.source)
    }
}

impl PartialEq for QueryTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.inner.source == other.inner.source
    }
}

impl Eq for QueryTemplate {}

fn invalid(reason: impl Into<String>) -> QueryError {
    QueryError::InvalidTemplate {
        reason: reason.into(),
    }
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
    segments: Vec<Segment>,
    literal: String,
    placeholders: Vec<Placeholder>,
    index_by_name: HashMap<String, usize>,
    /// Whether the type of a placeholder came from an explicit annotation
    annotated: Vec<bool>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
            segments: Vec::new(),
            literal: String::new(),
            placeholders: Vec::new(),
            index_by_name: HashMap::new(),
            annotated: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> QueryResult<(Vec<Segment>, Vec<Placeholder>)> {
        while let Some(c) = self.peek(0) {
            match c {
                '\'' | '"' | '`' => self.copy_quoted(c)?,
                '-' if self.peek(1) == Some('-') => self.copy_line_comment(),
                '/' if self.peek(1) == Some('*') => self.copy_block_comment()?,
                ':' => self.colon()?,
                '?' => {
                    return Err(invalid(
                        "anonymous '?' parameters are not supported; use named placeholders",
                    ))
                }
                '$' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => {
                    return Err(invalid(
                        "positional '$n' parameters are not supported; use named placeholders",
                    ))
                }
                '$' if !self.follows_ident() => self.dollar()?,
                '@' if !self.follows_ident() && self.peek(1).is_some_and(is_ident_start) => {
                    return Err(invalid(
                        "'@name' parameters are not supported; use ':name' placeholders",
                    ))
                }
                _ => {
                    self.literal.push(c);
                    self.pos += 1;
                }
            }
        }
        self.flush_literal();
        tracing::trace!(
            template = self.source,
            placeholders = self.placeholders.len(),
            "parsed query template"
        );
        Ok((self.segments, self.placeholders))
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.segments
                .push(Segment::Sql(std::mem::take(&mut self.literal)));
        }
    }

    /// Copy a quoted run verbatim; a doubled quote is an escaped quote
    fn copy_quoted(&mut self, quote: char) -> QueryResult<()> {
        self.literal.push(quote);
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(invalid(format!("unterminated {quote} quoted section"))),
                Some(c) if c == quote => {
                    self.literal.push(c);
                    self.pos += 1;
                    if self.peek(0) == Some(quote) {
                        self.literal.push(quote);
                        self.pos += 1;
                    } else {
                        return Ok(());
                    }
                }
                Some(c) => {
                    self.literal.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn copy_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            self.literal.push(c);
            self.pos += 1;
            if c == '\n' {
                break;
            }
        }
    }

    fn copy_block_comment(&mut self) -> QueryResult<()> {
        self.literal.push_str("/*");
        self.pos += 2;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('*'), Some('/')) => {
                    self.literal.push_str("*/");
                    self.pos += 2;
                    return Ok(());
                }
                (Some(c), _) => {
                    self.literal.push(c);
                    self.pos += 1;
                }
                (None, _) => return Err(invalid("unterminated block comment")),
            }
        }
    }

    fn follows(&self, c: char) -> bool {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.chars.get(p))
            .is_some_and(|&prev| prev == c)
    }

    /// Whether the previous character continues an identifier or number
    fn follows_ident(&self) -> bool {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.chars.get(p))
            .is_some_and(|&c| is_ident_continue(c))
    }

    /// `$tag$ ... $tag$` and `$$ ... $$` are copied verbatim; `$name` is rejected
    fn dollar(&mut self) -> QueryResult<()> {
        let mut end = self.pos + 1;
        while self.chars.get(end).copied().is_some_and(is_ident_continue) {
            end += 1;
        }
        if self.chars.get(end) != Some(&'$') {
            if end > self.pos + 1 {
                return Err(invalid(
                    "'$name' parameters are not supported; use ':name' placeholders",
                ));
            }
            self.literal.push('$');
            self.pos += 1;
            return Ok(());
        }

        let tag: Vec<char> = self.chars[self.pos..=end].to_vec();
        self.literal.extend(tag.iter());
        self.pos = end + 1;
        loop {
            if self.chars[self.pos..].starts_with(&tag) {
                self.literal.extend(tag.iter());
                self.pos += tag.len();
                return Ok(());
            }
            match self.peek(0) {
                Some(c) => {
                    self.literal.push(c);
                    self.pos += 1;
                }
                None => return Err(invalid("unterminated dollar-quoted section")),
            }
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn colon(&mut self) -> QueryResult<()> {
        match self.peek(1) {
            // PostgreSQL cast operator
            Some(':') => {
                self.literal.push_str("::");
                self.pos += 2;
                Ok(())
            }
            Some(c) if c.is_ascii_digit() && !self.follows_ident() && !self.follows('[') => {
                Err(invalid(
                    "numbered ':n' parameters are not supported; use named placeholders",
                ))
            }
            Some(c) if is_ident_start(c) => {
                self.pos += 1;
                let name = self.read_ident();
                let annotation = if self.peek(0) == Some(':')
                    && self.peek(1).is_some_and(is_ident_start)
                {
                    self.pos += 1;
                    Some(self.read_ident().parse::<ParamType>()?)
                } else {
                    None
                };
                self.push_slot(name, annotation)
            }
            _ => {
                self.literal.push(':');
                self.pos += 1;
                Ok(())
            }
        }
    }

    fn push_slot(&mut self, name: String, annotation: Option<ParamType>) -> QueryResult<()> {
        self.flush_literal();
        let index = if let Some(&index) = self.index_by_name.get(&name) {
            if let Some(declared) = annotation {
                let existing = self.placeholders[index].param_type;
                if self.annotated[index] && existing != declared {
                    return Err(invalid(format!(
                        "placeholder ':{name}' declared as both {existing} and {declared}"
                    )));
                }
                self.placeholders[index].param_type = declared;
                self.annotated[index] = true;
            }
            index
        } else {
            let index = self.placeholders.len();
            self.index_by_name.insert(name.clone(), index);
            self.placeholders.push(Placeholder {
                name,
                param_type: annotation.unwrap_or_default(),
            });
            self.annotated.push(annotation.is_some());
            index
        };
        self.segments.push(Segment::Slot(index));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sqlite_marker(index: usize) -> String {
        format!("?{index}")
    }

    #[test]
    fn test_parse_typed_placeholders() {
        let template = QueryTemplate::parse(
            "SELECT Date, Amount FROM Sales WHERE Date BETWEEN :start:date AND :end:date",
        )
        .unwrap();

        let names: Vec<_> = template.placeholders().iter().map(Placeholder::name).collect();
        assert_eq!(names, ["start", "end"]);
        assert!(template
            .placeholders()
            .iter()
            .all(|p| p.param_type() == ParamType::Date));
        assert_eq!(
            template.render(sqlite_marker),
            "SELECT Date, Amount FROM Sales WHERE Date BETWEEN ?1 AND ?2"
        );
    }

    #[test]
    fn test_repeated_name_shares_marker() {
        let template =
            QueryTemplate::parse("SELECT * FROM t WHERE a = :v OR b = :v:integer").unwrap();
        assert_eq!(template.placeholder_count(), 1);
        assert_eq!(template.placeholders()[0].param_type(), ParamType::Integer);
        assert_eq!(
            template.render(|i| format!("${i}")),
            "SELECT * FROM t WHERE a = $1 OR b = $1"
        );
    }

    #[test]
    fn test_conflicting_annotations_rejected() {
        let err = QueryTemplate::parse("SELECT :v:integer, :v:text").unwrap_err();
        assert!(err.to_string().contains("declared as both"));
    }

    #[test]
    fn test_colons_in_literals_and_comments_are_not_placeholders() {
        let template = QueryTemplate::parse(
            "SELECT ':not_a_param', \":nor_this\" -- :or_this\n FROM t /* :nor :these */ WHERE x = :x",
        )
        .unwrap();
        let names: Vec<_> = template.placeholders().iter().map(Placeholder::name).collect();
        assert_eq!(names, ["x"]);
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let template = QueryTemplate::parse("SELECT 'it''s :fine' WHERE a = :a").unwrap();
        assert_eq!(template.placeholder_count(), 1);
        assert_eq!(
            template.render(sqlite_marker),
            "SELECT 'it''s :fine' WHERE a = ?1"
        );
    }

    #[test]
    fn test_postgres_cast_is_preserved() {
        let template = QueryTemplate::parse("SELECT :start::date").unwrap();
        assert_eq!(template.placeholders()[0].param_type(), ParamType::Any);
        assert_eq!(template.render(|i| format!("${i}")), "SELECT $1::date");
    }

    #[test]
    fn test_rejects_anonymous_markers_and_bad_input() {
        assert!(QueryTemplate::parse("SELECT * FROM t WHERE a = ?").is_err());
        assert!(QueryTemplate::parse("SELECT * FROM t WHERE a = $1").is_err());
        assert!(QueryTemplate::parse("   ").is_err());
        assert!(QueryTemplate::parse("SELECT 'open").is_err());
        assert!(QueryTemplate::parse("SELECT 1 /* open").is_err());
        assert!(QueryTemplate::parse("SELECT :a:money").is_err());
    }

    #[test]
    fn test_rejects_foreign_parameter_styles() {
        for sql in [
            "SELECT * FROM Sales WHERE Amount > $min",
            "SELECT * FROM Sales WHERE Amount > @min",
            "SELECT * FROM Sales WHERE Amount > :1",
            "SELECT 1 WHERE $$open",
        ] {
            let err = QueryTemplate::parse(sql).unwrap_err();
            assert!(
                matches!(err, QueryError::InvalidTemplate { .. }),
                "{sql} should be rejected"
            );
        }
    }

    #[test]
    fn test_dollar_quotes_slices_and_operators_stay_literal() {
        let sql = "SELECT $fn$ :x $y $fn$, arr[1:2], arr[:3], tags @> ARRAY['a'], price$usd FROM t WHERE a = :a";
        let template = QueryTemplate::parse(sql).unwrap();
        let names: Vec<_> = template.placeholders().iter().map(Placeholder::name).collect();
        assert_eq!(names, ["a"]);
        assert!(template.render(sqlite_marker).starts_with("SELECT $fn$ :x $y $fn$, arr[1:2]"));
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = QueryTemplate::parse("SELECT 1").unwrap();
        assert_eq!(template.placeholder_count(), 0);
        assert!(template.resolve(&ParameterBinding::new()).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_reports_missing_and_extraneous() {
        let template = QueryTemplate::parse("SELECT :b, :a, :c").unwrap();
        let bindings = ParameterBinding::new().bind("c", 1_i64).bind("zzz", 2_i64);

        match template.resolve(&bindings).unwrap_err() {
            QueryError::InvalidParameters {
                missing,
                extraneous,
            } => {
                assert_eq!(missing, ["a", "b"]);
                assert_eq!(extraneous, ["zzz"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_orders_values_by_marker_position() {
        let template = QueryTemplate::parse("SELECT :second:integer, :first").unwrap();
        let values = template
            .resolve(
                &ParameterBinding::new()
                    .bind("first", "a")
                    .bind("second", "42"),
            )
            .unwrap();
        assert_eq!(values, [SqlValue::Integer(42), SqlValue::from("a")]);
    }
}
