// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub API wire types.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::GithubError;

/// Response of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContents {
	pub path: String,
	#[serde(default)]
	pub sha: Option<String>,
	#[serde(default)]
	pub size: Option<u64>,
	#[serde(default)]
	pub encoding: Option<String>,
	#[serde(default)]
	pub content: Option<String>,
}

impl FileContents {
	/// Decode the transported content into UTF-8 text.
	///
	/// GitHub wraps base64 content at 60 columns, so whitespace is removed
	/// before decoding.
	pub fn decode(&self) -> Result<String, GithubError> {
		let raw = self.content.as_deref().unwrap_or_default();
		match self.encoding.as_deref() {
			Some("base64") | None => {
				let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
				let bytes = base64::engine::general_purpose::STANDARD
					.decode(compact)
					.map_err(|e| GithubError::InvalidResponse(format!("base64 content: {e}")))?;
				String::from_utf8(bytes)
					.map_err(|e| GithubError::InvalidResponse(format!("non UTF-8 content: {e}")))
			}
			Some("utf-8") | Some("utf8") => Ok(raw.to_string()),
			Some(other) => Err(GithubError::InvalidResponse(format!(
				"unsupported content encoding '{other}'"
			))),
		}
	}
}

/// Response of `GET /search/code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeSearchResponse {
	#[serde(default)]
	pub total_count: u64,
	#[serde(default)]
	pub incomplete_results: bool,
	#[serde(default)]
	pub items: Vec<CodeSearchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSearchItem {
	pub name: String,
	pub path: String,
	#[serde(default)]
	pub sha: Option<String>,
}

impl CodeSearchResponse {
	/// Paths of the hits, first occurrence wins.
	pub fn unique_paths(&self) -> Vec<String> {
		let mut paths: Vec<String> = Vec::with_capacity(self.items.len());
		for item in &self.items {
			if !paths.contains(&item.path) {
				paths.push(item.path.clone());
			}
		}
		paths
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_wrapped_base64() {
		let contents = FileContents {
			path: "lib/main.dart".to_string(),
			sha: None,
			size: None,
			encoding: Some("base64".to_string()),
			content: Some("dm9pZCBtYWlu\nKCkge30K\n".to_string()),
		};
		assert_eq!(contents.decode().unwrap(), "void main() {}\n");
	}

	#[test]
	fn rejects_unknown_encoding() {
		let contents = FileContents {
			path: "lib/big.dart".to_string(),
			sha: None,
			size: None,
			encoding: Some("none".to_string()),
			content: Some(String::new()),
		};
		assert!(matches!(
			contents.decode(),
			Err(GithubError::InvalidResponse(_))
		));
	}

	#[test]
	fn unique_paths_dedupes_in_order() {
		let response: CodeSearchResponse = serde_json::from_value(serde_json::json!({
			"total_count": 3,
			"items": [
				{"name": "a.dart", "path": "lib/a.dart"},
				{"name": "b.dart", "path": "lib/b.dart"},
				{"name": "a.dart", "path": "lib/a.dart"}
			]
		}))
		.unwrap();
		assert_eq!(response.unique_paths(), vec!["lib/a.dart", "lib/b.dart"]);
	}
}
