// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gemini client for ActionGuard.
//!
//! Asks a Gemini model for the literal action identifier guarding a crash
//! site. [`GeminiClient`] implements [`actionguard_crash_core::ActionIdModel`].

mod client;
mod config;
mod error;
mod prompt;
mod types;

pub use client::GeminiClient;
pub use config::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::GeminiError;
pub use prompt::{build_prompt, parse_reply, PLACEHOLDER_ACTION_ID};
pub use types::{
	GeminiCandidate, GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequest,
	GeminiResponse,
};
