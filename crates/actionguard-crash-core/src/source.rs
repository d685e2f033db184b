// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source host abstraction.

use async_trait::async_trait;

/// Failures talking to a source host.
///
/// A missing file is not an error; hosts return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum SourceHostError {
	#[error("source host request timed out")]
	Timeout,

	#[error("source host unauthorized: {0}")]
	Unauthorized(String),

	#[error("source host rate limited")]
	RateLimited,

	#[error("source host error ({status}): {message}")]
	Api { status: u16, message: String },

	#[error("source host transport error: {0}")]
	Transport(String),

	#[error("source content could not be decoded: {0}")]
	Decode(String),
}

/// Repository file access used by the source fetcher.
///
/// Paths are repository-relative. Search methods return repository paths,
/// deduplicated, in the host's relevance order.
#[async_trait]
pub trait SourceHost: Send + Sync {
	async fn fetch_file(&self, path: &str) -> Result<Option<String>, SourceHostError>;

	async fn search_by_filename(&self, file_name: &str) -> Result<Vec<String>, SourceHostError>;

	async fn search_by_text(&self, text: &str) -> Result<Vec<String>, SourceHostError>;
}
