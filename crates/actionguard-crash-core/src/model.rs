// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generative model abstraction for action id extraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::extraction::Confidence;

/// Context handed to the model for one crash site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelExtractionRequest {
	pub file_path: String,
	pub line: u32,
	pub function_name: String,
	/// Numbered code window around the crash line.
	pub code_window: String,
}

/// Structured answer parsed from the model output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
	#[serde(default)]
	pub action_id: String,
	#[serde(default)]
	pub component_id: Option<String>,
	#[serde(default)]
	pub confidence: Confidence,
	#[serde(default)]
	pub reasoning: String,
	#[serde(default)]
	pub found_at_line: Option<u32>,
	#[serde(default)]
	pub suggested_fix: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	#[error("model request timed out")]
	Timeout,

	#[error("model request failed: {0}")]
	Request(String),

	#[error("model reply could not be parsed: {0}")]
	Parse(String),
}

#[async_trait]
pub trait ActionIdModel: Send + Sync {
	/// Stable provider name recorded in extraction metadata.
	fn name(&self) -> &str;

	async fn extract_action_id(
		&self,
		request: &ModelExtractionRequest,
	) -> Result<ModelReply, ModelError>;
}
