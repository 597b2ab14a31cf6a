// ABOUTME: Core types and constants for the boundquery workspace
// ABOUTME: Foundation crate with error handling and shared defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Boundquery Core
//!
//! Foundation crate providing the error taxonomy and constants shared by the
//! query executor and its command-line front end. This crate is designed to
//! change infrequently, enabling incremental compilation benefits in the
//! workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and the query-domain `QueryError`
//! - **constants**: Pool, retry and formatting defaults organized by domain

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;
