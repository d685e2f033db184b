// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub REST client for repository contents and code search.

use actionguard_common_http::retry;
use actionguard_crash_core::{SourceHost, SourceHostError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use crate::config::GithubConfig;
use crate::error::GithubError;
use crate::types::{CodeSearchResponse, FileContents};

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Read-only GitHub client scoped to one repository and branch.
#[derive(Debug, Clone)]
pub struct GithubClient {
	config: GithubConfig,
	http: Client,
}

impl GithubClient {
	pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
		let http = actionguard_common_http::builder()
			.timeout(config.timeout)
			.build()
			.map_err(|e| GithubError::Config(format!("failed to build HTTP client: {e}")))?;
		Ok(Self { config, http })
	}

	pub fn config(&self) -> &GithubConfig {
		&self.config
	}

	/// Fetch a file's decoded text. `Ok(None)` when it does not exist on the branch.
	#[instrument(skip(self), fields(owner = %self.config.owner(), repo = %self.config.repo()))]
	pub async fn get_file_contents(&self, path: &str) -> Result<Option<String>, GithubError> {
		let url = self.contents_url(path);

		let contents = retry(&self.config.retry_config, || async {
			let response = self
				.http
				.get(&url)
				.query(&[("ref", self.config.branch())])
				.header("Authorization", format!("token {}", self.config.token()))
				.header("Accept", ACCEPT)
				.send()
				.await
				.map_err(GithubError::from_reqwest)?;

			if response.status() == StatusCode::NOT_FOUND {
				return Ok(None);
			}
			let response = check_status(response).await?;

			let body = response.json::<serde_json::Value>().await.map_err(|e| {
				GithubError::InvalidResponse(format!("failed to parse contents response: {e}"))
			})?;
			if body.is_array() {
				return Err(GithubError::InvalidResponse(format!(
					"{path} is a directory"
				)));
			}
			let contents: FileContents = serde_json::from_value(body).map_err(|e| {
				GithubError::InvalidResponse(format!("unexpected contents response: {e}"))
			})?;
			Ok(Some(contents))
		})
		.await?;

		match contents {
			Some(contents) => {
				let text = contents.decode()?;
				debug!(path = %contents.path, bytes = text.len(), "fetched file contents");
				Ok(Some(text))
			}
			None => {
				debug!(path, "file not found");
				Ok(None)
			}
		}
	}

	/// Run a code search scoped to the configured repository.
	///
	/// Returns unique repository paths in relevance order.
	#[instrument(skip(self), fields(owner = %self.config.owner(), repo = %self.config.repo()))]
	pub async fn search_code(&self, query: &str) -> Result<Vec<String>, GithubError> {
		let q = format!(
			"{query} repo:{}/{}",
			self.config.owner(),
			self.config.repo()
		);
		let url = format!("{}/search/code", self.config.base_url());

		let response = retry(&self.config.retry_config, || async {
			let response = self
				.http
				.get(&url)
				.query(&[("q", q.as_str())])
				.header("Authorization", format!("token {}", self.config.token()))
				.header("Accept", ACCEPT)
				.send()
				.await
				.map_err(GithubError::from_reqwest)?;

			let response = check_status(response).await?;
			response.json::<CodeSearchResponse>().await.map_err(|e| {
				GithubError::InvalidResponse(format!("failed to parse search response: {e}"))
			})
		})
		.await?;

		let paths = response.unique_paths();
		debug!(
			total_count = response.total_count,
			hits = paths.len(),
			"code search complete"
		);
		Ok(paths)
	}

	fn contents_url(&self, path: &str) -> String {
		let encoded: Vec<String> = path
			.trim_start_matches('/')
			.split('/')
			.map(|segment| urlencoding::encode(segment).into_owned())
			.collect();
		format!(
			"{}/repos/{}/{}/contents/{}",
			self.config.base_url(),
			urlencoding::encode(self.config.owner()),
			urlencoding::encode(self.config.repo()),
			encoded.join("/")
		)
	}
}

async fn check_status(response: Response) -> Result<Response, GithubError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let message = response.text().await.unwrap_or_default();
	match status {
		StatusCode::UNAUTHORIZED => Err(GithubError::Unauthorized),
		StatusCode::FORBIDDEN if message.contains("rate limit") => Err(GithubError::RateLimited),
		StatusCode::FORBIDDEN => Err(GithubError::Forbidden),
		StatusCode::TOO_MANY_REQUESTS => Err(GithubError::RateLimited),
		_ => Err(GithubError::api_error(status.as_u16(), message)),
	}
}

#[async_trait]
impl SourceHost for GithubClient {
	async fn fetch_file(&self, path: &str) -> Result<Option<String>, SourceHostError> {
		Ok(self.get_file_contents(path).await?)
	}

	async fn search_by_filename(&self, file_name: &str) -> Result<Vec<String>, SourceHostError> {
		match self.search_code(&format!("filename:{file_name}")).await {
			Ok(paths) => Ok(paths),
			Err(e) => {
				warn!(file_name, error = %e, "filename search failed, treating as no results");
				Ok(Vec::new())
			}
		}
	}

	async fn search_by_text(&self, text: &str) -> Result<Vec<String>, SourceHostError> {
		let query = text.trim();
		if query.is_empty() {
			return Ok(Vec::new());
		}
		match self.search_code(&format!("\"{}\"", query.replace('"', " "))).await {
			Ok(paths) => Ok(paths),
			Err(e) => {
				warn!(error = %e, "text search failed, treating as no results");
				Ok(Vec::new())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use actionguard_common_http::RetryConfig;
	use std::time::Duration;
	use wiremock::matchers::{header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn client_for(server: &MockServer, retry_config: RetryConfig) -> GithubClient {
		let config = GithubConfig::new("ghp_test", "acme", "shop")
			.unwrap()
			.with_base_url(server.uri())
			.with_retry_config(retry_config);
		GithubClient::new(config).unwrap()
	}

	fn fast_retry() -> RetryConfig {
		RetryConfig {
			max_attempts: 3,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			jitter: false,
			..RetryConfig::default()
		}
	}

	#[tokio::test]
	async fn fetches_and_decodes_file() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/shop/contents/lib/main.dart"))
			.and(query_param("ref", "main"))
			.and(header("Authorization", "token ghp_test"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"path": "lib/main.dart",
				"encoding": "base64",
				"content": "dm9pZCBtYWlu\nKCkge30K\n"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = client_for(&server, RetryConfig::no_retry());
		let text = client.fetch_file("lib/main.dart").await.unwrap();
		assert_eq!(text.as_deref(), Some("void main() {}\n"));
	}

	#[tokio::test]
	async fn missing_file_is_none() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/shop/contents/lib/missing.dart"))
			.respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
				"message": "Not Found"
			})))
			.mount(&server)
			.await;

		let client = client_for(&server, RetryConfig::no_retry());
		assert!(client.fetch_file("lib/missing.dart").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn server_errors_are_retried_then_propagated() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/repos/acme/shop/contents/lib/main.dart"))
			.respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
			.expect(3)
			.mount(&server)
			.await;

		let client = client_for(&server, fast_retry());
		let err = client.fetch_file("lib/main.dart").await.unwrap_err();
		assert!(matches!(err, SourceHostError::Api { status: 502, .. }));
	}

	#[tokio::test]
	async fn unauthorized_is_not_retried() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(401))
			.expect(1)
			.mount(&server)
			.await;

		let client = client_for(&server, fast_retry());
		let err = client.fetch_file("lib/main.dart").await.unwrap_err();
		assert!(matches!(err, SourceHostError::Unauthorized(_)));
	}

	#[tokio::test]
	async fn filename_search_scopes_to_repo_and_dedupes() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/search/code"))
			.and(query_param("q", "filename:found.dart repo:acme/shop"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"total_count": 2,
				"items": [
					{"name": "found.dart", "path": "lib/found.dart"},
					{"name": "found.dart", "path": "lib/found.dart"}
				]
			})))
			.mount(&server)
			.await;

		let client = client_for(&server, RetryConfig::no_retry());
		let paths = client.search_by_filename("found.dart").await.unwrap();
		assert_eq!(paths, vec!["lib/found.dart"]);
	}

	#[tokio::test]
	async fn search_failures_become_empty_results() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/search/code"))
			.respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
			.mount(&server)
			.await;

		let client = client_for(&server, RetryConfig::no_retry());
		assert!(client.search_by_text("submitOrder").await.unwrap().is_empty());
		assert!(client.search_by_filename("a.dart").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn blank_text_search_skips_request() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.expect(0)
			.mount(&server)
			.await;

		let client = client_for(&server, RetryConfig::no_retry());
		assert!(client.search_by_text("   ").await.unwrap().is_empty());
	}
}
