// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generative model (Gemini) configuration section.

use actionguard_common_config::SecretString;
use serde::Deserialize;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiConfigLayer {
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	/// Set to false to run pattern extraction only even with a key present.
	#[serde(default)]
	pub enabled: Option<bool>,
}

impl GeminiConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.model.is_some() {
			self.model = other.model;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
	}

	/// `None` when no API key is configured or the model is disabled.
	pub fn finalize(self) -> Option<GeminiSettings> {
		if self.enabled == Some(false) {
			return None;
		}
		self.api_key.map(|api_key| GeminiSettings {
			api_key,
			model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
			base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		})
	}
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
	pub api_key: SecretString,
	pub model: String,
	pub base_url: String,
	pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finalize_none_without_key() {
		let layer = GeminiConfigLayer {
			model: Some("gemini-2.0-flash".to_string()),
			..Default::default()
		};
		assert!(layer.finalize().is_none());
	}

	#[test]
	fn finalize_with_key_uses_defaults() {
		let layer = GeminiConfigLayer {
			api_key: Some(SecretString::new("key".to_string())),
			..Default::default()
		};
		let settings = layer.finalize().unwrap();
		assert_eq!(settings.model, "gemini-1.5-flash");
		assert_eq!(settings.timeout_secs, 30);
	}

	#[test]
	fn disabled_wins_over_key() {
		let layer = GeminiConfigLayer {
			api_key: Some(SecretString::new("key".to_string())),
			enabled: Some(false),
			..Default::default()
		};
		assert!(layer.finalize().is_none());
	}
}
