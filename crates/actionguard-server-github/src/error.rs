// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the GitHub client.

use actionguard_common_http::RetryableError;
use actionguard_crash_core::SourceHostError;
use thiserror::Error;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GithubError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	#[error("Unauthorized or invalid token")]
	Unauthorized,

	#[error("Forbidden or insufficient permissions")]
	Forbidden,

	#[error("Rate limit exceeded")]
	RateLimited,

	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl RetryableError for GithubError {
	fn is_retryable(&self) -> bool {
		match self {
			GithubError::Network(e) => e.is_retryable(),
			GithubError::Timeout => true,
			GithubError::RateLimited => true,
			GithubError::ApiError { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

impl GithubError {
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			GithubError::Timeout
		} else {
			GithubError::Network(e)
		}
	}
}

impl From<GithubError> for SourceHostError {
	fn from(e: GithubError) -> Self {
		match e {
			GithubError::Timeout => SourceHostError::Timeout,
			GithubError::Unauthorized | GithubError::Forbidden => {
				SourceHostError::Unauthorized(e.to_string())
			}
			GithubError::RateLimited => SourceHostError::RateLimited,
			GithubError::ApiError { status, message } => SourceHostError::Api { status, message },
			GithubError::InvalidResponse(msg) => SourceHostError::Decode(msg),
			other => SourceHostError::Transport(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_retryable_transient() {
		assert!(GithubError::Timeout.is_retryable());
		assert!(GithubError::RateLimited.is_retryable());
		assert!(GithubError::api_error(502, "Bad Gateway").is_retryable());
	}

	#[test]
	fn test_not_retryable_4xx() {
		assert!(!GithubError::api_error(400, "Bad Request").is_retryable());
		assert!(!GithubError::Unauthorized.is_retryable());
		assert!(!GithubError::Config("missing owner".to_string()).is_retryable());
	}

	#[test]
	fn test_maps_to_source_host_error() {
		assert!(matches!(
			SourceHostError::from(GithubError::Timeout),
			SourceHostError::Timeout
		));
		assert!(matches!(
			SourceHostError::from(GithubError::api_error(500, "boom")),
			SourceHostError::Api { status: 500, .. }
		));
		assert!(matches!(
			SourceHostError::from(GithubError::Forbidden),
			SourceHostError::Unauthorized(_)
		));
	}
}
