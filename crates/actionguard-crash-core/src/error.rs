// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for crash resolution core.

use thiserror::Error;

/// Errors raised by core parsing and validation.
#[derive(Debug, Error)]
pub enum CrashError {
	#[error("invalid component status: {0}")]
	InvalidStatus(String),

	#[error("invalid confidence: {0}")]
	InvalidConfidence(String),

	#[error("invalid extraction method: {0}")]
	InvalidMethod(String),

	#[error("invalid stack pattern: {0}")]
	InvalidPattern(#[from] regex::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CrashError>;
