// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client builder with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Creates a new HTTP client builder with the standard ActionGuard User-Agent header.
///
/// Callers set their own timeouts before building.
///
/// # Example
/// ```ignore
/// let client = actionguard_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard ActionGuard User-Agent string.
///
/// Format: `actionguard/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"actionguard/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("actionguard/"));
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert!(parts[1].contains('-'));
	}

	#[test]
	fn builder_builds() {
		assert!(builder().build().is_ok());
	}
}
