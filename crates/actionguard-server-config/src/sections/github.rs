// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source host (GitHub) configuration section.

use actionguard_common_config::SecretString;
use serde::Deserialize;

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_BASE_URL: &str = "https://api.github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubConfigLayer {
	#[serde(default)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub owner: Option<String>,
	#[serde(default)]
	pub repo: Option<String>,
	#[serde(default)]
	pub branch: Option<String>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl GithubConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.owner.is_some() {
			self.owner = other.owner;
		}
		if other.repo.is_some() {
			self.repo = other.repo;
		}
		if other.branch.is_some() {
			self.branch = other.branch;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	/// `None` unless a token, owner and repository are all configured.
	pub fn finalize(self) -> Option<GithubSettings> {
		let (Some(token), Some(owner), Some(repo)) = (self.token, self.owner, self.repo) else {
			return None;
		};
		Some(GithubSettings {
			token,
			owner,
			repo,
			branch: self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
			base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		})
	}
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
	pub token: SecretString,
	pub owner: String,
	pub repo: String,
	pub branch: String,
	pub base_url: String,
	pub timeout_secs: u64,
}
