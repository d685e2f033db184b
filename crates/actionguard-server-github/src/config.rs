// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the GitHub client.

use std::env;
use std::time::Duration;

use actionguard_common_config::{load_secret_env, Secret, SecretString};
use actionguard_common_http::RetryConfig;
use reqwest::Url;
use tracing::warn;

use crate::error::GithubError;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Repository coordinates and credentials for source lookups.
///
/// The token is stored as a [`SecretString`] so it never reaches logs.
#[derive(Clone)]
pub struct GithubConfig {
	token: SecretString,
	owner: String,
	repo: String,
	branch: String,
	base_url: Url,
	/// Per-request timeout.
	pub timeout: Duration,
	pub retry_config: RetryConfig,
}

impl std::fmt::Debug for GithubConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GithubConfig")
			.field("token", &self.token)
			.field("owner", &self.owner)
			.field("repo", &self.repo)
			.field("branch", &self.branch)
			.field("base_url", &self.base_url.as_str())
			.field("timeout", &self.timeout)
			.field("retry_config", &self.retry_config)
			.finish()
	}
}

impl GithubConfig {
	/// Parse a base URL, which must be http(s) with a host.
	pub fn parse_base_url(raw: &str) -> Result<Url, GithubError> {
		let url = Url::parse(raw.trim_end_matches('/'))
			.map_err(|e| GithubError::Config(format!("Invalid GitHub base URL '{raw}': {e}")))?;

		if url.scheme() != "https" && url.scheme() != "http" {
			return Err(GithubError::Config(format!(
				"GitHub base URL must use http or https, got '{}'",
				url.scheme()
			)));
		}
		if url.host_str().is_none() {
			return Err(GithubError::Config(
				"GitHub base URL must include a host".to_string(),
			));
		}

		Ok(url)
	}

	pub fn new(
		token: impl Into<String>,
		owner: impl Into<String>,
		repo: impl Into<String>,
	) -> Result<Self, GithubError> {
		Self::with_secret(Secret::new(token.into()), owner, repo)
	}

	pub fn with_secret(
		token: SecretString,
		owner: impl Into<String>,
		repo: impl Into<String>,
	) -> Result<Self, GithubError> {
		let owner = owner.into();
		let repo = repo.into();
		if token.expose().trim().is_empty() {
			return Err(GithubError::Config("GitHub token is empty".to_string()));
		}
		if owner.trim().is_empty() || repo.trim().is_empty() {
			return Err(GithubError::Config(
				"GitHub owner and repo are required".to_string(),
			));
		}

		Ok(Self {
			token,
			owner,
			repo,
			branch: DEFAULT_BRANCH.to_string(),
			base_url: Self::parse_base_url(DEFAULT_BASE_URL)?,
			timeout: DEFAULT_TIMEOUT,
			retry_config: RetryConfig::default(),
		})
	}

	/// Create configuration from environment variables.
	///
	/// Required:
	/// - `GITHUB_TOKEN` (or `GITHUB_TOKEN_FILE`)
	/// - `ACTIONGUARD_GITHUB_OWNER`, `ACTIONGUARD_GITHUB_REPO`
	///
	/// Optional:
	/// - `ACTIONGUARD_GITHUB_BRANCH` (defaults to `main`)
	/// - `ACTIONGUARD_GITHUB_BASE_URL` (defaults to api.github.com)
	pub fn from_env() -> Result<Self, GithubError> {
		let token = load_secret_env("GITHUB_TOKEN")
			.map_err(|e| GithubError::Config(e.to_string()))?
			.ok_or_else(|| GithubError::Config("GITHUB_TOKEN not set".to_string()))?;
		let owner = env::var("ACTIONGUARD_GITHUB_OWNER")
			.map_err(|_| GithubError::Config("ACTIONGUARD_GITHUB_OWNER not set".to_string()))?;
		let repo = env::var("ACTIONGUARD_GITHUB_REPO")
			.map_err(|_| GithubError::Config("ACTIONGUARD_GITHUB_REPO not set".to_string()))?;

		let mut config = Self::with_secret(token, owner, repo)?;
		if let Ok(branch) = env::var("ACTIONGUARD_GITHUB_BRANCH") {
			config = config.with_branch(branch);
		}
		if let Ok(base_url) = env::var("ACTIONGUARD_GITHUB_BASE_URL") {
			config.base_url = Self::parse_base_url(&base_url)?;
		}
		Ok(config)
	}

	/// Set a custom base URL (GitHub Enterprise or tests).
	///
	/// Invalid URLs are logged and the previous value is kept.
	pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
		let url_str = url.into();
		match Self::parse_base_url(&url_str) {
			Ok(parsed) => self.base_url = parsed,
			Err(e) => {
				warn!(error = %e, url = %url_str, "Invalid base_url, keeping previous value");
			}
		}
		self
	}

	pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
		let branch = branch.into();
		if !branch.trim().is_empty() {
			self.branch = branch;
		}
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub(crate) fn token(&self) -> &str {
		self.token.expose()
	}

	pub fn owner(&self) -> &str {
		&self.owner
	}

	pub fn repo(&self) -> &str {
		&self.repo
	}

	pub fn branch(&self) -> &str {
		&self.branch
	}

	/// Base URL without a trailing slash.
	pub fn base_url(&self) -> &str {
		self.base_url.as_str().trim_end_matches('/')
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = GithubConfig::new("ghp_test", "acme", "shop").unwrap();
		assert_eq!(config.base_url(), DEFAULT_BASE_URL);
		assert_eq!(config.branch(), "main");
		assert_eq!(config.timeout, DEFAULT_TIMEOUT);
	}

	#[test]
	fn test_debug_redacts_token() {
		let config = GithubConfig::new("ghp_supersecret", "acme", "shop").unwrap();
		let debug = format!("{config:?}");
		assert!(!debug.contains("ghp_supersecret"));
		assert!(debug.contains("acme"));
	}

	#[test]
	fn test_rejects_missing_parts() {
		assert!(GithubConfig::new("", "acme", "shop").is_err());
		assert!(GithubConfig::new("t", "", "shop").is_err());
		assert!(GithubConfig::new("t", "acme", " ").is_err());
	}

	#[test]
	fn test_invalid_base_url_keeps_previous() {
		let config = GithubConfig::new("t", "acme", "shop")
			.unwrap()
			.with_base_url("ftp://example.com");
		assert_eq!(config.base_url(), DEFAULT_BASE_URL);

		let config = config.with_base_url("http://127.0.0.1:8080/");
		assert_eq!(config.base_url(), "http://127.0.0.1:8080");
	}

	#[test]
	fn test_blank_branch_ignored() {
		let config = GithubConfig::new("t", "acme", "shop")
			.unwrap()
			.with_branch("develop")
			.with_branch("");
		assert_eq!(config.branch(), "develop");
	}
}
