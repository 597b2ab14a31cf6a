// ABOUTME: Re-exports the unified error types from the core crate
// ABOUTME: Keeps `boundquery::errors::*` paths stable for library users
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use boundquery_core::errors::*;

/// Result alias for query-domain operations
pub type QueryResult<T> = Result<T, QueryError>;
