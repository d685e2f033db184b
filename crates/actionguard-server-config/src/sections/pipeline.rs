// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash pipeline tuning: stack resolution, source windows, batching.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_EXTENSION: &str = "dart";
const DEFAULT_SOURCE_ROOT: &str = "lib/";
const DEFAULT_TEST_ROOT: &str = "test/";
const DEFAULT_CONTEXT_LINES: u32 = 15;
const DEFAULT_WIDE_CONTEXT_LINES: u32 = 40;
const DEFAULT_BATCH_SIZE: u32 = 10;
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticMarkerSettings {
	pub marker: String,
	pub file_path: String,
	pub line: u32,
	pub column: u32,
	pub function_name: String,
}

impl Default for SyntheticMarkerSettings {
	fn default() -> Self {
		Self {
			marker: "Sentry Test".to_string(),
			file_path: "lib/main.dart".to_string(),
			line: 95,
			column: 7,
			function_name: "_incrementCounter".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
	pub extension: String,
	/// `None` keeps the built-in framework deny-list.
	pub deny_list: Option<Vec<String>>,
	pub source_root: String,
	pub test_root: String,
	pub context_lines: u32,
	pub wide_context_lines: u32,
	pub message_search: bool,
	pub synthetic_marker: Option<SyntheticMarkerSettings>,
	pub batch_size: u32,
	pub delay_ms: u64,
	pub concurrency: usize,
	pub watch_interval_secs: u64,
}

impl Default for PipelineSettings {
	fn default() -> Self {
		Self {
			extension: DEFAULT_EXTENSION.to_string(),
			deny_list: None,
			source_root: DEFAULT_SOURCE_ROOT.to_string(),
			test_root: DEFAULT_TEST_ROOT.to_string(),
			context_lines: DEFAULT_CONTEXT_LINES,
			wide_context_lines: DEFAULT_WIDE_CONTEXT_LINES,
			message_search: true,
			synthetic_marker: Some(SyntheticMarkerSettings::default()),
			batch_size: DEFAULT_BATCH_SIZE,
			delay_ms: DEFAULT_DELAY_MS,
			concurrency: DEFAULT_CONCURRENCY,
			watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfigLayer {
	#[serde(default)]
	pub extension: Option<String>,
	#[serde(default)]
	pub deny_list: Option<Vec<String>>,
	#[serde(default)]
	pub source_root: Option<String>,
	#[serde(default)]
	pub test_root: Option<String>,
	#[serde(default)]
	pub context_lines: Option<u32>,
	#[serde(default)]
	pub wide_context_lines: Option<u32>,
	#[serde(default)]
	pub message_search: Option<bool>,
	#[serde(default)]
	pub synthetic_marker_enabled: Option<bool>,
	#[serde(default)]
	pub synthetic_marker: Option<String>,
	#[serde(default)]
	pub synthetic_file: Option<String>,
	#[serde(default)]
	pub synthetic_line: Option<u32>,
	#[serde(default)]
	pub synthetic_column: Option<u32>,
	#[serde(default)]
	pub synthetic_function: Option<String>,
	#[serde(default)]
	pub batch_size: Option<u32>,
	#[serde(default)]
	pub delay_ms: Option<u64>,
	#[serde(default)]
	pub concurrency: Option<usize>,
	#[serde(default)]
	pub watch_interval_secs: Option<u64>,
}

macro_rules! merge_fields {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

impl PipelineConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_fields!(
			self,
			other,
			extension,
			deny_list,
			source_root,
			test_root,
			context_lines,
			wide_context_lines,
			message_search,
			synthetic_marker_enabled,
			synthetic_marker,
			synthetic_file,
			synthetic_line,
			synthetic_column,
			synthetic_function,
			batch_size,
			delay_ms,
			concurrency,
			watch_interval_secs,
		);
	}

	pub fn finalize(self) -> Result<PipelineSettings, ConfigError> {
		let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
		if batch_size == 0 {
			return Err(ConfigError::InvalidValue {
				key: "pipeline.batch_size".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
		if concurrency == 0 {
			return Err(ConfigError::InvalidValue {
				key: "pipeline.concurrency".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		let extension = self
			.extension
			.map(|e| e.trim().trim_start_matches('.').to_string())
			.unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
		if extension.is_empty() {
			return Err(ConfigError::InvalidValue {
				key: "pipeline.extension".to_string(),
				message: "must not be empty".to_string(),
			});
		}

		let synthetic_marker = if self.synthetic_marker_enabled.unwrap_or(true) {
			let defaults = SyntheticMarkerSettings::default();
			Some(SyntheticMarkerSettings {
				marker: self.synthetic_marker.unwrap_or(defaults.marker),
				file_path: self.synthetic_file.unwrap_or(defaults.file_path),
				line: self.synthetic_line.unwrap_or(defaults.line),
				column: self.synthetic_column.unwrap_or(defaults.column),
				function_name: self.synthetic_function.unwrap_or(defaults.function_name),
			})
		} else {
			None
		};

		Ok(PipelineSettings {
			extension,
			deny_list: self.deny_list,
			source_root: with_trailing_slash(self.source_root, DEFAULT_SOURCE_ROOT),
			test_root: with_trailing_slash(self.test_root, DEFAULT_TEST_ROOT),
			context_lines: self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
			wide_context_lines: self.wide_context_lines.unwrap_or(DEFAULT_WIDE_CONTEXT_LINES),
			message_search: self.message_search.unwrap_or(true),
			synthetic_marker,
			batch_size,
			delay_ms: self.delay_ms.unwrap_or(DEFAULT_DELAY_MS),
			concurrency,
			watch_interval_secs: self
				.watch_interval_secs
				.unwrap_or(DEFAULT_WATCH_INTERVAL_SECS),
		})
	}
}

fn with_trailing_slash(value: Option<String>, default: &str) -> String {
	match value {
		Some(v) if !v.trim().is_empty() => {
			let v = v.trim().trim_end_matches('/');
			format!("{v}/")
		}
		_ => default.to_string(),
	}
}
