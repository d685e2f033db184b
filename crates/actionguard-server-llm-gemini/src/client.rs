// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gemini `generateContent` client.

use actionguard_common_http::retry;
use actionguard_crash_core::{ActionIdModel, ModelError, ModelExtractionRequest, ModelReply};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GeminiConfig;
use crate::error::GeminiError;
use crate::prompt::{build_prompt, parse_reply};
use crate::types::{GeminiErrorBody, GeminiGenerationConfig, GeminiRequest, GeminiResponse};

pub struct GeminiClient {
	config: GeminiConfig,
	http_client: Client,
}

impl GeminiClient {
	pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
		let http_client = actionguard_common_http::builder()
			.timeout(config.timeout)
			.build()
			.map_err(|e| GeminiError::Config(format!("failed to build HTTP client: {e}")))?;

		info!(
			model = %config.model,
			base_url = %config.base_url,
			"Initialized Gemini client"
		);

		Ok(Self {
			config,
			http_client,
		})
	}

	/// Send a single-turn prompt and return the reply text.
	#[instrument(skip(self, prompt), fields(model = %self.config.model))]
	pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
		let url = self.config.generate_url();
		let body = GeminiRequest::from_prompt(
			prompt,
			GeminiGenerationConfig {
				max_output_tokens: Some(self.config.max_output_tokens),
				temperature: Some(self.config.temperature),
			},
		);

		let response = retry(&self.config.retry_config, || async {
			let response = self
				.http_client
				.post(&url)
				.header("Content-Type", "application/json")
				.header("x-goog-api-key", self.config.api_key())
				.json(&body)
				.send()
				.await
				.map_err(|e| {
					if e.is_timeout() {
						GeminiError::Timeout
					} else {
						GeminiError::Network(e)
					}
				})?;

			if !response.status().is_success() {
				return Err(self.handle_error_response(response).await);
			}

			response
				.json::<GeminiResponse>()
				.await
				.map_err(|e| GeminiError::InvalidResponse(e.to_string()))
		})
		.await?;

		let text = response
			.text()
			.ok_or_else(|| GeminiError::InvalidResponse("no candidate text".to_string()))?;
		debug!(reply_len = text.len(), "Received Gemini reply");
		Ok(text)
	}

	async fn handle_error_response(&self, response: reqwest::Response) -> GeminiError {
		let status = response.status();
		let status_code = status.as_u16();

		match status_code {
			401 | 403 => return GeminiError::Unauthorized,
			429 => return GeminiError::RateLimited,
			_ => {}
		}

		match response.json::<GeminiErrorBody>().await {
			Ok(body) => {
				error!(status = %status, message = %body.error.message, "Gemini API error");
				GeminiError::ApiError {
					status: status_code,
					message: body.error.message,
				}
			}
			Err(e) => {
				error!(status = %status, parse_error = %e, "Failed to parse Gemini error response");
				GeminiError::ApiError {
					status: status_code,
					message: format!("HTTP {status}"),
				}
			}
		}
	}
}

#[async_trait]
impl ActionIdModel for GeminiClient {
	fn name(&self) -> &str {
		&self.config.model
	}

	#[instrument(skip(self, request), fields(file = %request.file_path, line = request.line))]
	async fn extract_action_id(
		&self,
		request: &ModelExtractionRequest,
	) -> Result<ModelReply, ModelError> {
		let prompt = build_prompt(request);

		let text = match tokio::time::timeout(self.config.timeout, self.generate(&prompt)).await {
			Ok(result) => result?,
			Err(_) => {
				warn!(timeout_ms = self.config.timeout.as_millis() as u64, "Gemini extraction timed out");
				return Err(ModelError::Timeout);
			}
		};

		let reply = parse_reply(&text)?;
		debug!(
			action_id = %reply.action_id,
			confidence = %reply.confidence,
			"Parsed Gemini extraction"
		);
		Ok(reply)
	}
}
