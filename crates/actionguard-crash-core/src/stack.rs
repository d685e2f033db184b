// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack location resolution.
//!
//! Crash reporters deliver frames one per line in the form
//! `lib/cart.dart in submitOrder at line 42:13`. The resolver picks the first
//! frame that belongs to application code, skipping framework and runtime
//! internals listed in the deny-list.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Placeholder for file and function names that could not be determined.
pub const UNKNOWN: &str = "unknown";

const DEFAULT_EXTENSION: &str = "dart";

const DEFAULT_DENY_LIST: &[&str] = &[
	"errors.dart",
	"zone.dart",
	"isolate_helper.dart",
	"future.dart",
	"binding.dart",
	"platform_dispatcher.dart",
	"pointer_binding.dart",
	"operations.dart",
	"js_allow_interop_patch.dart",
	"window.dart",
	"framework.dart",
	"component_stat.dart",
	"view.dart",
	"binding_wrapper.dart",
	"frame_service.dart",
];

/// A resolved crash site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashLocation {
	pub file_path: String,
	pub line: u32,
	pub column: u32,
	pub function_name: String,
	pub raw_line: String,
}

impl CrashLocation {
	/// True when the location came from the loose fallback rather than a full frame.
	pub fn is_degraded(&self) -> bool {
		self.line == 0
	}

	/// File name without directories or URI prefix.
	pub fn file_name(&self) -> &str {
		file_name(&self.file_path)
	}

	/// Function name, if one was recovered from the frame.
	pub fn known_function(&self) -> Option<&str> {
		let name = self.function_name.trim();
		(!name.is_empty() && name != UNKNOWN).then_some(name)
	}
}

/// Settings for [`StackResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResolverConfig {
	/// Source file extension without the dot.
	pub extension: String,
	/// File names that belong to the framework or runtime.
	pub deny_list: Vec<String>,
}

impl Default for StackResolverConfig {
	fn default() -> Self {
		Self {
			extension: DEFAULT_EXTENSION.to_string(),
			deny_list: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
		}
	}
}

/// Extracts the first non-framework source location from a raw stack trace.
#[derive(Debug, Clone)]
pub struct StackResolver {
	frame: Regex,
	path_token: Regex,
	extension: String,
	deny_list: Vec<String>,
}

impl Default for StackResolver {
	fn default() -> Self {
		// The default extension is a literal word, so the patterns always compile.
		Self::new(StackResolverConfig::default()).expect("default stack patterns are valid")
	}
}

impl StackResolver {
	pub fn new(config: StackResolverConfig) -> Result<Self> {
		let ext = regex::escape(config.extension.trim_start_matches('.'));
		let frame = Regex::new(&format!(
			r"^(.+?\.{ext})\s+in\s+(.+?)\s+at\s+line\s+(\d+):(\d+)"
		))?;
		let path_token = Regex::new(&format!(r"([A-Za-z0-9_./:\-]+\.{ext})\b"))?;

		Ok(Self {
			frame,
			path_token,
			extension: format!(".{}", config.extension.trim_start_matches('.')),
			deny_list: config.deny_list,
		})
	}

	/// Resolve the innermost user-code frame.
	///
	/// Falls back to the first line that mentions a source file outside the
	/// deny-list, with line and column zeroed and the function unknown.
	pub fn resolve(&self, stack_trace: &str) -> Option<CrashLocation> {
		if let Some(location) = self.strict_frames(stack_trace).next() {
			return Some(location);
		}

		self.lines(stack_trace)
			.find(|line| {
				line.contains(&self.extension)
					&& !self.deny_list.iter().any(|denied| line.contains(denied.as_str()))
			})
			.map(|line| CrashLocation {
				file_path: self
					.path_token
					.captures(line)
					.map(|c| c[1].to_string())
					.unwrap_or_else(|| UNKNOWN.to_string()),
				line: 0,
				column: 0,
				function_name: UNKNOWN.to_string(),
				raw_line: line.to_string(),
			})
	}

	/// Every user-code frame in the trace, in order.
	pub fn resolve_all(&self, stack_trace: &str) -> Vec<CrashLocation> {
		self.strict_frames(stack_trace).collect()
	}

	fn lines<'a>(&self, stack_trace: &'a str) -> impl Iterator<Item = &'a str> {
		stack_trace
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty())
	}

	fn strict_frames<'a>(&'a self, stack_trace: &'a str) -> impl Iterator<Item = CrashLocation> + 'a {
		self.lines(stack_trace).filter_map(move |line| {
			let caps = self.frame.captures(line)?;
			let file_path = caps[1].trim().to_string();
			if self.is_denied(&file_path) {
				return None;
			}
			Some(CrashLocation {
				file_path,
				line: caps[3].parse().ok()?,
				column: caps[4].parse().ok()?,
				function_name: caps[2].trim().replace(['[', ']', '<', '>'], ""),
				raw_line: line.to_string(),
			})
		})
	}

	fn is_denied(&self, file_path: &str) -> bool {
		let name = file_name(file_path);
		self.deny_list.iter().any(|denied| denied == name)
	}
}

fn file_name(path: &str) -> &str {
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}
