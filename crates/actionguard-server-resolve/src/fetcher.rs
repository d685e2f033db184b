// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source retrieval with search fallback.
//!
//! Paths from stack frames are normalized to repository paths and fetched
//! directly. On a miss the fetcher searches the repository by file name, then
//! by function name, and fetches the first hit. Search hits are already
//! repository paths and are fetched as-is.

use std::fmt;
use std::sync::Arc;

use actionguard_crash_core::{CodeWindow, SourceHost, SourceHostError, UNKNOWN};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub const DEFAULT_CONTEXT_LINES: u32 = 15;
pub const DEFAULT_WIDE_CONTEXT_LINES: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
	/// Prefix prepended to paths outside the source and test roots.
	pub source_root: String,
	pub test_root: String,
	/// Lines on each side of the target for direct and filename fetches.
	pub context_lines: u32,
	/// Lines on each side of the target after a free-text search hit.
	pub wide_context_lines: u32,
}

impl Default for FetcherConfig {
	fn default() -> Self {
		Self {
			source_root: "lib/".to_string(),
			test_root: "test/".to_string(),
			context_lines: DEFAULT_CONTEXT_LINES,
			wide_context_lines: DEFAULT_WIDE_CONTEXT_LINES,
		}
	}
}

/// How the content was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
	Direct,
	FilenameSearch,
	TextSearch,
}

impl fmt::Display for FetchStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FetchStrategy::Direct => write!(f, "direct"),
			FetchStrategy::FilenameSearch => write!(f, "filename_search"),
			FetchStrategy::TextSearch => write!(f, "text_search"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
	pub window: CodeWindow,
	pub strategy: FetchStrategy,
}

pub struct SourceFetcher {
	host: Arc<dyn SourceHost>,
	config: FetcherConfig,
}

impl SourceFetcher {
	pub fn new(host: Arc<dyn SourceHost>, config: FetcherConfig) -> Self {
		Self { host, config }
	}

	pub fn config(&self) -> &FetcherConfig {
		&self.config
	}

	/// Map a stack frame path to a repository path.
	///
	/// `package:shop/cart.dart` becomes `lib/cart.dart`; `widgets/a.dart`
	/// becomes `lib/widgets/a.dart`; `test/a_test.dart` is kept.
	pub fn normalize_path(&self, path: &str) -> String {
		let mut path = path.trim();
		if let Some(rest) = path.strip_prefix("package:") {
			path = rest.split_once('/').map(|(_, p)| p).unwrap_or(rest);
		}
		let path = path.trim_start_matches("./").trim_start_matches('/');

		if path.starts_with(&self.config.source_root) || path.starts_with(&self.config.test_root) {
			path.to_string()
		} else {
			format!("{}{}", self.config.source_root, path)
		}
	}

	/// Fetch the file a stack frame points at.
	///
	/// `target_line` of `None` (or zero) returns the full file. `Ok(None)` when
	/// neither the direct path nor any search hit has content; transport
	/// failures on fetches propagate.
	#[instrument(skip(self), fields(path = %path))]
	pub async fn fetch(
		&self,
		path: &str,
		target_line: Option<u32>,
		function_name: Option<&str>,
	) -> Result<Option<FetchedSource>, SourceHostError> {
		let normalized = self.normalize_path(path);
		if let Some(source) = self
			.fetch_exact(&normalized, target_line, FetchStrategy::Direct)
			.await?
		{
			return Ok(Some(source));
		}

		let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
		debug!(normalized = %normalized, file_name, "direct fetch missed, searching by file name");
		for hit in self.search_filename(file_name).await.iter().take(1) {
			if let Some(source) = self
				.fetch_exact(hit, target_line, FetchStrategy::FilenameSearch)
				.await?
			{
				return Ok(Some(source));
			}
		}

		let Some(function_name) = function_name
			.map(str::trim)
			.filter(|f| !f.is_empty() && *f != UNKNOWN)
		else {
			return Ok(None);
		};
		debug!(function_name, "searching by function name");
		for hit in self.search_text(function_name).await.iter().take(1) {
			if let Some(source) = self
				.fetch_exact(hit, target_line, FetchStrategy::TextSearch)
				.await?
			{
				return Ok(Some(source));
			}
		}

		Ok(None)
	}

	/// Fetch a repository path without normalization.
	pub async fn fetch_exact(
		&self,
		repo_path: &str,
		target_line: Option<u32>,
		strategy: FetchStrategy,
	) -> Result<Option<FetchedSource>, SourceHostError> {
		let Some(content) = self.host.fetch_file(repo_path).await? else {
			return Ok(None);
		};

		let context = match strategy {
			FetchStrategy::TextSearch => self.config.wide_context_lines,
			_ => self.config.context_lines,
		};
		let window = match target_line.filter(|l| *l > 0) {
			Some(line) => CodeWindow::around(repo_path, content, line, context),
			None => CodeWindow::full(repo_path, content),
		};
		debug!(
			path = repo_path,
			strategy = %strategy,
			start_line = window.start_line,
			end_line = window.end_line,
			"source fetched"
		);
		Ok(Some(FetchedSource { window, strategy }))
	}

	/// Free-text repository search. Failures are logged and yield no hits.
	pub async fn search_text(&self, text: &str) -> Vec<String> {
		match self.host.search_by_text(text).await {
			Ok(hits) => dedup(hits),
			Err(e) => {
				warn!(error = %e, "text search failed, treating as no results");
				Vec::new()
			}
		}
	}

	async fn search_filename(&self, file_name: &str) -> Vec<String> {
		match self.host.search_by_filename(file_name).await {
			Ok(hits) => dedup(hits),
			Err(e) => {
				warn!(file_name, error = %e, "filename search failed, treating as no results");
				Vec::new()
			}
		}
	}
}

fn dedup(hits: Vec<String>) -> Vec<String> {
	let mut unique: Vec<String> = Vec::with_capacity(hits.len());
	for hit in hits {
		if !unique.contains(&hit) {
			unique.push(hit);
		}
	}
	unique
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FakeHost, HostCall};

	fn numbered_file(lines: u32) -> String {
		(1..=lines)
			.map(|n| format!("line {n}"))
			.collect::<Vec<_>>()
			.join("\n")
	}

	fn fetcher(host: FakeHost) -> (SourceFetcher, Arc<FakeHost>) {
		let host = Arc::new(host);
		(
			SourceFetcher::new(host.clone(), FetcherConfig::default()),
			host,
		)
	}

	#[test]
	fn normalizes_paths() {
		let (fetcher, _) = fetcher(FakeHost::new());
		assert_eq!(fetcher.normalize_path("package:shop/cart.dart"), "lib/cart.dart");
		assert_eq!(
			fetcher.normalize_path("package:shop/screens/home.dart"),
			"lib/screens/home.dart"
		);
		assert_eq!(fetcher.normalize_path("lib/main.dart"), "lib/main.dart");
		assert_eq!(fetcher.normalize_path("test/cart_test.dart"), "test/cart_test.dart");
		assert_eq!(fetcher.normalize_path("widgets/pay.dart"), "lib/widgets/pay.dart");
	}

	#[tokio::test]
	async fn direct_fetch_windows_around_line() {
		let (fetcher, _) = fetcher(FakeHost::new().with_file("lib/cart.dart", &numbered_file(100)));
		let source = fetcher
			.fetch("package:shop/cart.dart", Some(50), Some("submit"))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(source.strategy, FetchStrategy::Direct);
		assert_eq!(source.window.start_line, 35);
		assert_eq!(source.window.end_line, 65);
		assert_eq!(source.window.window_len(), 31);
		assert!(source.window.text.starts_with("35: line 35"));
		assert_eq!(source.window.total_lines, 100);
	}

	#[tokio::test]
	async fn no_target_line_returns_full_file() {
		let content = numbered_file(5);
		let (fetcher, _) = fetcher(FakeHost::new().with_file("lib/a.dart", &content));
		let source = fetcher.fetch("lib/a.dart", None, None).await.unwrap().unwrap();
		assert_eq!(source.window.text, content);
		assert!(source.window.target_line.is_none());
	}

	#[tokio::test]
	async fn falls_back_to_filename_search() {
		let host = FakeHost::new()
			.with_file("lib/features/cart/cart.dart", &numbered_file(20))
			.with_filename_hit("cart.dart", "lib/features/cart/cart.dart")
			.with_filename_hit("cart.dart", "lib/features/cart/cart.dart");
		let (fetcher, host) = fetcher(host);

		let source = fetcher.fetch("lib/cart.dart", Some(3), None).await.unwrap().unwrap();
		assert_eq!(source.strategy, FetchStrategy::FilenameSearch);
		assert_eq!(source.window.file_path, "lib/features/cart/cart.dart");
		assert_eq!(
			host.fetched(),
			vec!["lib/cart.dart", "lib/features/cart/cart.dart"]
		);
	}

	#[tokio::test]
	async fn falls_back_to_function_search_with_wide_window() {
		let host = FakeHost::new()
			.with_file("lib/found.dart", &numbered_file(200))
			.with_text_hit("submitOrder", "lib/found.dart");
		let (fetcher, host) = fetcher(host);

		let source = fetcher
			.fetch("lib/missing.dart", Some(100), Some("submitOrder"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(source.strategy, FetchStrategy::TextSearch);
		assert_eq!(source.window.file_path, "lib/found.dart");
		assert_eq!(source.window.start_line, 60);
		assert_eq!(source.window.end_line, 140);
		assert_eq!(
			host.calls(),
			vec![
				HostCall::Fetch("lib/missing.dart".to_string()),
				HostCall::Filename("missing.dart".to_string()),
				HostCall::Text("submitOrder".to_string()),
				HostCall::Fetch("lib/found.dart".to_string()),
			]
		);
	}

	#[tokio::test]
	async fn unknown_function_skips_text_search() {
		let (fetcher, host) = fetcher(FakeHost::new());
		let source = fetcher
			.fetch("lib/missing.dart", Some(1), Some(UNKNOWN))
			.await
			.unwrap();
		assert!(source.is_none());
		assert!(host.text_queries().is_empty());
	}

	#[tokio::test]
	async fn transport_failure_propagates() {
		let (fetcher, _) = fetcher(FakeHost::new().with_broken("lib/a.dart"));
		let err = fetcher.fetch("lib/a.dart", Some(1), None).await.unwrap_err();
		assert!(matches!(err, SourceHostError::Api { status: 502, .. }));
	}
}
