// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Action identifier extraction results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrashError;

/// Values models echo back instead of a real identifier.
const PLACEHOLDER_ACTION_IDS: &[&str] = &[
	"exact_string_from_code_or_empty",
	"unknown",
	"null",
	"none",
	"n/a",
];

/// How sure an extraction is of its identifier.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
	#[default]
	None,
	Low,
	Medium,
	High,
}

impl fmt::Display for Confidence {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Confidence::None => write!(f, "none"),
			Confidence::Low => write!(f, "low"),
			Confidence::Medium => write!(f, "medium"),
			Confidence::High => write!(f, "high"),
		}
	}
}

impl FromStr for Confidence {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"none" | "" => Ok(Confidence::None),
			"low" => Ok(Confidence::Low),
			"medium" => Ok(Confidence::Medium),
			"high" => Ok(Confidence::High),
			_ => Err(CrashError::InvalidConfidence(s.to_string())),
		}
	}
}

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
	Pattern,
	Generative,
}

impl fmt::Display for ExtractionMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExtractionMethod::Pattern => write!(f, "pattern"),
			ExtractionMethod::Generative => write!(f, "generative"),
		}
	}
}

impl FromStr for ExtractionMethod {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pattern" => Ok(ExtractionMethod::Pattern),
			"generative" => Ok(ExtractionMethod::Generative),
			_ => Err(CrashError::InvalidMethod(s.to_string())),
		}
	}
}

/// The pipeline's terminal judgment for one crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExtraction {
	pub action_id: Option<String>,
	pub confidence: Confidence,
	pub method: ExtractionMethod,
	pub rationale: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub suggested_fix: Option<String>,
	/// Display name suggested by the model for a newly created component.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub found_at_line: Option<u32>,
	/// Name of the pattern that matched, for pattern extractions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<String>,
}

impl ActionExtraction {
	/// An extraction that found nothing.
	pub fn not_found(method: ExtractionMethod, rationale: impl Into<String>) -> Self {
		Self {
			action_id: None,
			confidence: Confidence::None,
			method,
			rationale: rationale.into(),
			suggested_fix: None,
			display_name: None,
			found_at_line: None,
			pattern: None,
		}
	}

	/// The identifier, when the extraction is usable for linking.
	///
	/// Confidence `none`, empty and placeholder identifiers all count as "no
	/// action id found".
	pub fn usable_action_id(&self) -> Option<&str> {
		if self.confidence == Confidence::None {
			return None;
		}
		self.action_id
			.as_deref()
			.map(str::trim)
			.filter(|id| !is_placeholder_action_id(id))
	}
}

/// True for empty identifiers and values models echo back instead of a real one.
pub fn is_placeholder_action_id(id: &str) -> bool {
	let id = id.trim();
	id.is_empty()
		|| PLACEHOLDER_ACTION_IDS
			.iter()
			.any(|placeholder| id.eq_ignore_ascii_case(placeholder))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn extraction(id: Option<&str>, confidence: Confidence) -> ActionExtraction {
		ActionExtraction {
			action_id: id.map(str::to_string),
			confidence,
			..ActionExtraction::not_found(ExtractionMethod::Generative, "test")
		}
	}

	#[test]
	fn usable_requires_confidence_and_real_id() {
		assert_eq!(
			extraction(Some("checkout_submit"), Confidence::Low).usable_action_id(),
			Some("checkout_submit")
		);
		assert!(extraction(Some("checkout_submit"), Confidence::None)
			.usable_action_id()
			.is_none());
		assert!(extraction(Some("  "), Confidence::High).usable_action_id().is_none());
		assert!(extraction(None, Confidence::High).usable_action_id().is_none());
		assert!(
			extraction(Some("exact_string_from_code_or_empty"), Confidence::High)
				.usable_action_id()
				.is_none()
		);
	}

	#[test]
	fn usable_id_is_trimmed() {
		assert_eq!(
			extraction(Some(" pay_now "), Confidence::Medium).usable_action_id(),
			Some("pay_now")
		);
	}

	#[test]
	fn confidence_parses_case_insensitively() {
		assert_eq!("HIGH".parse::<Confidence>().unwrap(), Confidence::High);
		assert_eq!("".parse::<Confidence>().unwrap(), Confidence::None);
		assert!("certain".parse::<Confidence>().is_err());
	}

	#[test]
	fn confidence_orders_by_strength() {
		assert!(Confidence::High > Confidence::Medium);
		assert!(Confidence::Low > Confidence::None);
	}

	#[test]
	fn serialized_extraction_skips_absent_fields() {
		let meta = serde_json::to_value(extraction(Some("a"), Confidence::High)).unwrap();
		assert_eq!(meta["confidence"], "high");
		assert_eq!(meta["method"], "generative");
		assert!(meta.get("suggested_fix").is_none());
	}
}
