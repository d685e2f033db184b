// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use actionguard_common_http::RetryableError;
use actionguard_crash_core::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	#[error("Authentication failed")]
	Unauthorized,

	#[error("Rate limit exceeded")]
	RateLimited,

	#[error("Gemini API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Invalid response from Gemini: {0}")]
	InvalidResponse(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl RetryableError for GeminiError {
	fn is_retryable(&self) -> bool {
		match self {
			GeminiError::Network(e) => e.is_retryable(),
			GeminiError::Timeout | GeminiError::RateLimited => true,
			GeminiError::ApiError { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

impl From<GeminiError> for ModelError {
	fn from(e: GeminiError) -> Self {
		match e {
			GeminiError::Timeout => ModelError::Timeout,
			GeminiError::InvalidResponse(msg) => ModelError::Parse(msg),
			other => ModelError::Request(other.to_string()),
		}
	}
}
