// ABOUTME: Registry of named query templates addressed by identifier
// ABOUTME: Loads and parses every template up front from a JSON object of id to SQL text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::info;

use super::template::QueryTemplate;
use crate::errors::{AppError, AppResult, QueryError, QueryResult};

/// Named templates, parsed once at startup
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, QueryTemplate>,
}

impl TemplateCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `template` under `id`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTemplate` for an empty id or one that is
    /// already registered.
    pub fn register(&mut self, id: impl Into<String>, template: QueryTemplate) -> QueryResult<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(QueryError::InvalidTemplate {
                reason: "template id must not be empty".into(),
            });
        }
        if self.templates.contains_key(&id) {
            return Err(QueryError::InvalidTemplate {
                reason: format!("template '{id}' is already registered"),
            });
        }
        self.templates.insert(id, template);
        Ok(())
    }

    /// Parse `sql` and add it under `id`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidTemplate` if the text does not parse or the
    /// id is taken.
    pub fn register_sql(&mut self, id: impl Into<String>, sql: &str) -> QueryResult<()> {
        let id = id.into();
        let template = QueryTemplate::parse(sql).map_err(|e| match e {
            QueryError::InvalidTemplate { reason } => QueryError::InvalidTemplate {
                reason: format!("template '{id}': {reason}"),
            },
            other => other,
        })?;
        self.register(id, template)
    }

    /// Look up a template
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownTemplate` when nothing is registered under `id`.
    pub fn get(&self, id: &str) -> QueryResult<&QueryTemplate> {
        self.templates
            .get(id)
            .ok_or_else(|| QueryError::UnknownTemplate { id: id.to_owned() })
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// `(id, template)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryTemplate)> {
        self.templates.iter().map(|(id, t)| (id.as_str(), t))
    }

    /// Number of templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Build a catalog from a JSON object mapping ids to SQL text
    ///
    /// ```json
    /// { "sales_by_range": "SELECT * FROM Sales WHERE Date BETWEEN :start:date AND :end:date" }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and an invalid input
    /// error for the first template that fails to parse.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (id, sql) in entries {
            catalog.register_sql(id, &sql)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, otherwise
    /// the errors of [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read template catalog {}: {e}", path.display()))
                .with_source(e)
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(path = %path.display(), templates = catalog.len(), "Template catalog loaded");
        Ok(catalog)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_register_and_get() {
        let mut catalog = TemplateCatalog::new();
        catalog
            .register_sql("by_amount", "SELECT * FROM Sales WHERE Amount > :min:integer")
            .unwrap();
        assert_eq!(catalog.get("by_amount").unwrap().placeholder_count(), 1);
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["by_amount"]);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let err = TemplateCatalog::new().get("nope").unwrap_err();
        assert!(matches!(err, QueryError::UnknownTemplate { ref id } if id == "nope"));
        assert_eq!(err.code(), ErrorCode::ResourceNotFound);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut catalog = TemplateCatalog::new();
        catalog.register_sql("a", "SELECT 1").unwrap();
        assert!(matches!(
            catalog.register_sql("a", "SELECT 2"),
            Err(QueryError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_json_loading_parses_every_entry() {
        let catalog = TemplateCatalog::from_json_str(
            r#"{"b": "SELECT * FROM t WHERE d = :d:date", "a": "SELECT 1"}"#,
        )
        .unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["a", "b"]);

        let err = TemplateCatalog::from_json_str(r#"{"bad": "SELECT * FROM t WHERE x = ?"}"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("bad"));

        let err = TemplateCatalog::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializationError);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TemplateCatalog::from_file("/nonexistent/catalog.json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
