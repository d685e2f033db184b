// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fetched source content with an optional window around the crash line.

use serde::{Deserialize, Serialize};

/// Source content for one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeWindow {
	/// Repository path the content was read from.
	pub file_path: String,
	/// Windowed text, each line prefixed with its 1-based number. Equals
	/// `full_text` when no target line was requested.
	pub text: String,
	pub full_text: String,
	pub total_lines: u32,
	pub start_line: u32,
	pub end_line: u32,
	pub target_line: Option<u32>,
}

impl CodeWindow {
	/// Whole-file view.
	pub fn full(file_path: impl Into<String>, content: String) -> Self {
		let total = content.split('\n').count() as u32;
		Self {
			file_path: file_path.into(),
			text: content.clone(),
			full_text: content,
			total_lines: total,
			start_line: 1,
			end_line: total,
			target_line: None,
		}
	}

	/// `2 * context + 1` lines centered on `target_line`, clamped to the file.
	///
	/// A target line of zero means the line is unknown and yields the full file.
	pub fn around(
		file_path: impl Into<String>,
		content: String,
		target_line: u32,
		context: u32,
	) -> Self {
		if target_line == 0 {
			return Self::full(file_path, content);
		}

		let lines: Vec<&str> = content.split('\n').collect();
		let total = lines.len() as u32;
		let start = target_line.saturating_sub(context).max(1).min(total);
		let end = target_line.saturating_add(context).min(total).max(start);

		let text = lines[(start - 1) as usize..end as usize]
			.iter()
			.enumerate()
			.map(|(idx, line)| format!("{}: {}", start + idx as u32, line))
			.collect::<Vec<_>>()
			.join("\n");

		Self {
			file_path: file_path.into(),
			text,
			full_text: content,
			total_lines: total,
			start_line: start,
			end_line: end,
			target_line: Some(target_line),
		}
	}

	/// Number of lines in the window.
	pub fn window_len(&self) -> u32 {
		self.end_line + 1 - self.start_line
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn numbered(n: u32) -> String {
		(1..=n).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n")
	}

	#[test]
	fn window_is_centered_and_numbered() {
		let window = CodeWindow::around("lib/a.dart", numbered(100), 50, 2);
		assert_eq!(window.start_line, 48);
		assert_eq!(window.end_line, 52);
		assert_eq!(window.window_len(), 5);
		assert_eq!(
			window.text,
			"48: line48\n49: line49\n50: line50\n51: line51\n52: line52"
		);
		assert_eq!(window.total_lines, 100);
	}

	#[test]
	fn window_clamps_to_start() {
		let window = CodeWindow::around("lib/a.dart", numbered(10), 2, 5);
		assert_eq!(window.start_line, 1);
		assert_eq!(window.end_line, 7);
		assert!(window.text.starts_with("1: line1"));
	}

	#[test]
	fn window_clamps_to_end() {
		let window = CodeWindow::around("lib/a.dart", numbered(10), 9, 5);
		assert_eq!(window.start_line, 4);
		assert_eq!(window.end_line, 10);
		assert!(window.text.ends_with("10: line10"));
	}

	#[test]
	fn target_past_end_still_yields_last_line() {
		let window = CodeWindow::around("lib/a.dart", numbered(3), 40, 2);
		assert_eq!(window.start_line, 3);
		assert_eq!(window.end_line, 3);
		assert_eq!(window.text, "3: line3");
	}

	#[test]
	fn zero_target_is_full_file() {
		let window = CodeWindow::around("lib/a.dart", numbered(4), 0, 2);
		assert_eq!(window.target_line, None);
		assert_eq!(window.text, window.full_text);
		assert_eq!(window.end_line, 4);
	}
}
