// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prompt construction and reply parsing for action id extraction.

use actionguard_crash_core::{Confidence, ModelExtractionRequest, ModelReply};
use serde::Deserialize;

use crate::error::GeminiError;

/// Template value the prompt shows for `actionId`; models sometimes echo it.
pub const PLACEHOLDER_ACTION_ID: &str = "exact_string_from_code_or_empty";

/// Build the extraction prompt for one crash site.
pub fn build_prompt(request: &ModelExtractionRequest) -> String {
	format!(
		r#"You are analyzing a crash in an application to identify the EXACT actionId that caused it.

FILE: {file}
ERROR LINE: {line}
FUNCTION: {function}

CODE CONTEXT:
```
{code}
```

The application wraps risky operations with the ActionGuard SDK. Each guarded operation carries a
unique string literal in its actionId parameter, for example:
  ActionGuard.guard(actionId: 'checkout_submit', action: _submit)
  ActionGuard.run(actionId: 'checkout_submit', ...)

Find the LITERAL STRING VALUE of the actionId parameter nearest to line {line}.

RULES:
- Return the exact string literal from the code.
- Never return widget names, function names, or class names.
- Never invent an actionId. If none is present, leave actionId empty and set confidence to "none".

RESPOND ONLY WITH VALID JSON:
{{
  "actionId": "{placeholder}",
  "componentId": "component_name_if_found_or_null",
  "confidence": "high|medium|low|none",
  "reasoning": "where you found it or why you could not",
  "foundAtLine": number_or_null,
  "suggestedFix": "short fix suggestion or null"
}}"#,
		file = request.file_path,
		line = request.line,
		function = request.function_name,
		code = request.code_window,
		placeholder = PLACEHOLDER_ACTION_ID,
	)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
	#[serde(default)]
	action_id: Option<String>,
	#[serde(default)]
	component_id: Option<String>,
	#[serde(default)]
	confidence: Option<String>,
	#[serde(default)]
	reasoning: Option<String>,
	#[serde(default)]
	found_at_line: Option<serde_json::Value>,
	#[serde(default)]
	suggested_fix: Option<String>,
}

/// Parse model output into a [`ModelReply`].
///
/// Markdown code fences and surrounding prose are ignored. The placeholder
/// value is cleared, and an empty identifier always carries confidence none.
pub fn parse_reply(text: &str) -> Result<ModelReply, GeminiError> {
	let cleaned = text.replace("```json", "").replace("```", "");
	let cleaned = cleaned.trim();
	let json = match (cleaned.find('{'), cleaned.rfind('}')) {
		(Some(start), Some(end)) if start < end => &cleaned[start..=end],
		_ => {
			return Err(GeminiError::InvalidResponse(
				"reply does not contain a JSON object".to_string(),
			))
		}
	};

	let raw: RawReply = serde_json::from_str(json)
		.map_err(|e| GeminiError::InvalidResponse(format!("reply is not valid JSON: {e}")))?;

	let action_id = raw
		.action_id
		.map(|id| id.trim().to_string())
		.filter(|id| !id.is_empty() && id != PLACEHOLDER_ACTION_ID)
		.unwrap_or_default();
	let confidence = if action_id.is_empty() {
		Confidence::None
	} else {
		raw.confidence
			.as_deref()
			.and_then(|c| c.parse().ok())
			.unwrap_or(Confidence::Low)
	};

	Ok(ModelReply {
		action_id,
		component_id: non_empty(raw.component_id),
		confidence,
		reasoning: non_empty(raw.reasoning).unwrap_or_else(|| "generative extraction".to_string()),
		found_at_line: raw.found_at_line.and_then(|v| match v {
			serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
			serde_json::Value::String(s) => s.trim().parse().ok(),
			_ => None,
		}),
		suggested_fix: non_empty(raw.suggested_fix),
	})
}

fn non_empty(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty() && v != "null")
}
