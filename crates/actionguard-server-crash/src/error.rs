// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for crash server operations.

use thiserror::Error;

/// Errors that can occur in crash server operations.
#[derive(Debug, Error)]
pub enum CrashServerError {
	#[error("component not found: {0}")]
	ComponentNotFound(String),

	#[error("component error not found: {0}")]
	ErrorNotFound(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("invalid UUID: {0}")]
	InvalidUuid(#[from] uuid::Error),

	#[error("invalid datetime: {0}")]
	InvalidDateTime(String),

	#[error("parse error: {0}")]
	Parse(String),

	#[error("internal: {0}")]
	Internal(String),
}

/// Result type for crash server operations.
pub type Result<T> = std::result::Result<T, CrashServerError>;
