// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! App version normalization.

/// Reduce reporter version strings to the plain release version.
///
/// `my_app@1.2.0+7 (7)` becomes `1.2.0`. Missing or blank versions become
/// `unknown`.
pub fn normalize_app_version(raw: Option<&str>) -> String {
	let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
		return "unknown".to_string();
	};

	let mut version = raw;
	if let Some((_, rest)) = version.split_once('@') {
		version = rest;
	}
	if let Some((head, _)) = version.split_once('+') {
		version = head;
	}
	if let Some((head, _)) = version.split_once(" (") {
		version = head;
	}

	let version = version.trim();
	if version.is_empty() {
		"unknown".to_string()
	} else {
		version.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_package_build_and_bracket_suffixes() {
		assert_eq!(normalize_app_version(Some("my_app@1.2.0+7")), "1.2.0");
		assert_eq!(normalize_app_version(Some("1.0.0 (1)")), "1.0.0");
		assert_eq!(normalize_app_version(Some("shop@2.1.0 (14)")), "2.1.0");
		assert_eq!(normalize_app_version(Some("3.0.0")), "3.0.0");
	}

	#[test]
	fn missing_versions_are_unknown() {
		assert_eq!(normalize_app_version(None), "unknown");
		assert_eq!(normalize_app_version(Some("  ")), "unknown");
		assert_eq!(normalize_app_version(Some("app@")), "unknown");
	}
}
