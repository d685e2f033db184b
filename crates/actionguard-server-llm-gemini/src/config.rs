// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::env;
use std::time::Duration;

use actionguard_common_config::{load_secret_env, Secret, SecretString};
use actionguard_common_http::RetryConfig;

use crate::error::GeminiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
	api_key: SecretString,
	/// Model name (e.g., "gemini-1.5-flash").
	pub model: String,
	/// Base URL without trailing slash.
	pub base_url: String,
	/// Per-request timeout.
	pub timeout: Duration,
	pub temperature: f32,
	pub max_output_tokens: u32,
	pub retry_config: RetryConfig,
}

impl std::fmt::Debug for GeminiConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GeminiConfig")
			.field("api_key", &self.api_key)
			.field("model", &self.model)
			.field("base_url", &self.base_url)
			.field("timeout", &self.timeout)
			.field("temperature", &self.temperature)
			.field("max_output_tokens", &self.max_output_tokens)
			.finish()
	}
}

impl GeminiConfig {
	pub fn new(api_key: impl Into<String>) -> Self {
		Self::with_secret(Secret::new(api_key.into()))
	}

	pub fn with_secret(api_key: SecretString) -> Self {
		Self {
			api_key,
			model: DEFAULT_MODEL.to_string(),
			base_url: DEFAULT_BASE_URL.to_string(),
			timeout: DEFAULT_TIMEOUT,
			temperature: 0.0,
			max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
			retry_config: RetryConfig::default(),
		}
	}

	/// Create configuration from environment variables.
	///
	/// - `GEMINI_API_KEY` (or `GEMINI_API_KEY_FILE`), required
	/// - `ACTIONGUARD_GEMINI_MODEL`, optional
	/// - `ACTIONGUARD_GEMINI_BASE_URL`, optional
	pub fn from_env() -> Result<Self, GeminiError> {
		let api_key = load_secret_env("GEMINI_API_KEY")
			.map_err(|e| GeminiError::Config(e.to_string()))?
			.ok_or_else(|| GeminiError::Config("GEMINI_API_KEY not set".to_string()))?;
		if api_key.expose().trim().is_empty() {
			return Err(GeminiError::Config("GEMINI_API_KEY is empty".to_string()));
		}

		let mut config = Self::with_secret(api_key);
		if let Ok(model) = env::var("ACTIONGUARD_GEMINI_MODEL") {
			config = config.with_model(model);
		}
		if let Ok(base_url) = env::var("ACTIONGUARD_GEMINI_BASE_URL") {
			config = config.with_base_url(base_url);
		}
		Ok(config)
	}

	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into().trim_end_matches('/').to_string();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	/// Wall time one `generate` call may take with every retry spent.
	pub fn extraction_budget(&self) -> Duration {
		self.retry_config.budget(self.timeout)
	}

	pub(crate) fn api_key(&self) -> &str {
		self.api_key.expose()
	}

	pub(crate) fn generate_url(&self) -> String {
		format!(
			"{}/v1beta/models/{}:generateContent",
			self.base_url, self.model
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_defaults() {
		let config = GeminiConfig::new("key");
		assert_eq!(config.model, "gemini-1.5-flash");
		assert_eq!(config.temperature, 0.0);
		assert_eq!(
			config.generate_url(),
			"https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
		);
	}

	#[test]
	fn extraction_budget_leaves_room_for_retries() {
		let config = GeminiConfig::new("key").with_timeout(Duration::from_secs(30));
		let attempts = config.retry_config.max_attempts;
		assert!(config.extraction_budget() >= Duration::from_secs(30) * attempts);

		let single = GeminiConfig::new("key")
			.with_timeout(Duration::from_secs(30))
			.with_retry_config(RetryConfig::no_retry());
		assert_eq!(single.extraction_budget(), Duration::from_secs(30));
	}

	#[test]
	fn config_builder() {
		let config = GeminiConfig::new("key")
			.with_model("gemini-2.0-flash")
			.with_base_url("http://localhost:8080/");
		assert_eq!(
			config.generate_url(),
			"http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
		);
	}

	#[test]
	fn debug_redacts_key() {
		let config = GeminiConfig::new("AIzaSecret");
		assert!(!format!("{config:?}").contains("AIzaSecret"));
	}
}
