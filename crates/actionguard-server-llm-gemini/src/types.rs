// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gemini `generateContent` wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
	pub contents: Vec<GeminiContent>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiRequest {
	/// Single-turn user prompt.
	pub fn from_prompt(prompt: impl Into<String>, config: GeminiGenerationConfig) -> Self {
		Self {
			contents: vec![GeminiContent {
				role: Some("user".to_string()),
				parts: vec![GeminiPart {
					text: prompt.into(),
				}],
			}],
			generation_config: Some(config),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role: Option<String>,
	#[serde(default)]
	pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
	#[serde(default)]
	pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_output_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
	#[serde(default)]
	pub candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
	/// Concatenated text of the first candidate.
	pub fn text(&self) -> Option<String> {
		let candidate = self.candidates.first()?;
		let text: String = candidate
			.content
			.parts
			.iter()
			.map(|p| p.text.as_str())
			.collect();
		(!text.trim().is_empty()).then_some(text)
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
	pub content: GeminiContent,
	pub finish_reason: Option<String>,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiErrorBody {
	pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiErrorDetail {
	pub message: String,
}
