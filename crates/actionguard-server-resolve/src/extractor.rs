// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Action identifier extraction strategies.
//!
//! Strategies run in order and the chain stops at the first one that yields a
//! usable identifier. The deterministic pattern strategy always runs first;
//! the generative strategy is only consulted when no pattern matched.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use actionguard_crash_core::{
	is_placeholder_action_id, ActionExtraction, ActionIdModel, CodeWindow, Confidence,
	CrashLocation, ExtractionMethod, ModelExtractionRequest,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

pub const GUARD_CALL_PATTERN: &str = "guard_call";
pub const ACTION_ID_ARGUMENT_PATTERN: &str = "action_id_argument";

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a strategy may look at for one crash.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
	pub location: &'a CrashLocation,
	pub source: &'a CodeWindow,
}

#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
	fn name(&self) -> &str;

	/// Never fails: problems are reported as a not-found extraction with a
	/// rationale.
	async fn extract(&self, ctx: ExtractionContext<'_>) -> ActionExtraction;
}

struct Candidate {
	action_id: String,
	line: u32,
}

/// Opening of a guard invocation; the argument list is scanned separately.
static GUARD_OPEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"ActionGuard\.(?:guard|run)\s*(?:<[^>]*>)?\s*\(").unwrap()
});

static ACTION_ID_ARGUMENT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"actionId:\s*['"]([^'"\n]+)['"]"#).unwrap());

/// Literal `actionId:` arguments found by regular expression.
///
/// Guard invocations are tried first and only count an `actionId:` that is a
/// direct argument of the guard call. Within each tier the first match in the
/// file wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternStrategy;

impl PatternStrategy {
	pub fn new() -> Self {
		Self
	}

	fn guard_call(text: &str) -> Option<Candidate> {
		GUARD_OPEN.find_iter(text).find_map(|open| {
			top_level_arguments(text, open.end())
				.into_iter()
				.find_map(|(start, end)| Self::first_argument(text, start, end))
		})
	}

	fn action_id_argument(text: &str) -> Option<Candidate> {
		Self::first_argument(text, 0, text.len())
	}

	fn first_argument(text: &str, start: usize, end: usize) -> Option<Candidate> {
		ACTION_ID_ARGUMENT
			.captures_iter(&text[start..end])
			.find_map(|caps| {
				let id = caps.get(1)?;
				let value = id.as_str().trim();
				if value.is_empty() || is_placeholder_action_id(value) {
					return None;
				}
				Some(Candidate {
					action_id: value.to_string(),
					line: line_of(text, start + id.start()),
				})
			})
	}
}

/// Byte ranges of an argument list that sit outside nested brackets, from just
/// after the opening paren up to its matching close.
///
/// Returns nothing when the list never closes.
fn top_level_arguments(text: &str, from: usize) -> Vec<(usize, usize)> {
	let mut segments = Vec::new();
	let mut depth = 0usize;
	let mut segment_start = from;
	let mut quote: Option<char> = None;
	let mut escaped = false;

	for (offset, ch) in text[from..].char_indices() {
		let at = from + offset;
		if let Some(q) = quote {
			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == q {
				quote = None;
			}
			continue;
		}
		match ch {
			'\'' | '"' => quote = Some(ch),
			'(' | '[' | '{' => {
				if depth == 0 {
					segments.push((segment_start, at));
				}
				depth += 1;
			}
			')' | ']' | '}' if depth > 0 => {
				depth -= 1;
				if depth == 0 {
					segment_start = at + 1;
				}
			}
			')' => {
				segments.push((segment_start, at));
				return segments;
			}
			_ => {}
		}
	}
	Vec::new()
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
	fn name(&self) -> &str {
		"pattern"
	}

	async fn extract(&self, ctx: ExtractionContext<'_>) -> ActionExtraction {
		let text = ctx.source.full_text.as_str();

		let tiers: [(fn(&str) -> Option<Candidate>, Confidence, &str); 2] = [
			(Self::guard_call, Confidence::High, GUARD_CALL_PATTERN),
			(Self::action_id_argument, Confidence::Medium, ACTION_ID_ARGUMENT_PATTERN),
		];
		for (scan, confidence, pattern) in tiers {
			if let Some(hit) = scan(text) {
				debug!(action_id = %hit.action_id, line = hit.line, pattern, "pattern matched");
				return ActionExtraction {
					action_id: Some(hit.action_id),
					confidence,
					method: ExtractionMethod::Pattern,
					rationale: format!(
						"{pattern} matched in {} at line {}",
						ctx.source.file_path, hit.line
					),
					suggested_fix: None,
					display_name: None,
					found_at_line: Some(hit.line),
					pattern: Some(pattern.to_string()),
				};
			}
		}

		ActionExtraction::not_found(
			ExtractionMethod::Pattern,
			format!("no actionId literal in {}", ctx.source.file_path),
		)
	}
}

fn line_of(text: &str, offset: usize) -> u32 {
	text[..offset].matches('\n').count() as u32 + 1
}

/// Asks a generative model for the identifier.
pub struct GenerativeStrategy {
	model: Arc<dyn ActionIdModel>,
	timeout: Duration,
}

impl GenerativeStrategy {
	pub fn new(model: Arc<dyn ActionIdModel>) -> Self {
		Self {
			model,
			timeout: DEFAULT_MODEL_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

#[async_trait]
impl ExtractionStrategy for GenerativeStrategy {
	fn name(&self) -> &str {
		"generative"
	}

	#[instrument(skip(self, ctx), fields(model = self.model.name(), file = %ctx.source.file_path))]
	async fn extract(&self, ctx: ExtractionContext<'_>) -> ActionExtraction {
		let request = ModelExtractionRequest {
			file_path: ctx.source.file_path.clone(),
			line: ctx.location.line,
			function_name: ctx.location.function_name.clone(),
			code_window: ctx.source.text.clone(),
		};

		let reply = match tokio::time::timeout(self.timeout, self.model.extract_action_id(&request)).await
		{
			Ok(Ok(reply)) => reply,
			Ok(Err(e)) => {
				warn!(error = %e, "model extraction failed");
				return ActionExtraction::not_found(
					ExtractionMethod::Generative,
					format!("model {} failed: {e}", self.model.name()),
				);
			}
			Err(_) => {
				warn!(timeout = ?self.timeout, "model extraction timed out");
				return ActionExtraction::not_found(
					ExtractionMethod::Generative,
					format!(
						"model {} timed out after {}s",
						self.model.name(),
						self.timeout.as_secs()
					),
				);
			}
		};

		let action_id = Some(reply.action_id.trim().to_string())
			.filter(|id| !id.is_empty() && !is_placeholder_action_id(id));
		let confidence = if action_id.is_some() {
			reply.confidence
		} else {
			Confidence::None
		};
		info!(
			action_id = action_id.as_deref().unwrap_or(""),
			%confidence,
			"model extraction complete"
		);

		ActionExtraction {
			action_id,
			confidence,
			method: ExtractionMethod::Generative,
			rationale: reply.reasoning,
			suggested_fix: reply.suggested_fix.filter(|f| !f.trim().is_empty()),
			display_name: reply
				.component_id
				.map(|n| n.trim().to_string())
				.filter(|n| !n.is_empty()),
			found_at_line: reply.found_at_line,
			pattern: None,
		}
	}
}

/// Ordered strategies; the first usable extraction wins.
#[derive(Clone)]
pub struct ExtractorChain {
	strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl ExtractorChain {
	pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
		Self { strategies }
	}

	/// Pattern matching only.
	pub fn pattern_only() -> Self {
		Self::new(vec![Arc::new(PatternStrategy::new())])
	}

	/// Pattern matching with a model fallback.
	pub fn with_model(model: Arc<dyn ActionIdModel>, timeout: Duration) -> Self {
		Self::new(vec![
			Arc::new(PatternStrategy::new()),
			Arc::new(GenerativeStrategy::new(model).with_timeout(timeout)),
		])
	}

	pub fn strategy_names(&self) -> Vec<&str> {
		self.strategies.iter().map(|s| s.name()).collect()
	}

	/// Run strategies in order. When none succeeds, the last strategy's
	/// result is returned so its rationale is kept.
	pub async fn extract(&self, ctx: ExtractionContext<'_>) -> ActionExtraction {
		let mut last = None;
		for strategy in &self.strategies {
			let extraction = strategy.extract(ctx).await;
			if extraction.usable_action_id().is_some() {
				return extraction;
			}
			debug!(strategy = strategy.name(), rationale = %extraction.rationale, "strategy found nothing");
			last = Some(extraction);
		}
		last.unwrap_or_else(|| {
			ActionExtraction::not_found(ExtractionMethod::Pattern, "no extraction strategies configured")
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::FakeModel;
	use actionguard_crash_core::UNKNOWN;
	use proptest::prelude::*;

	const MAIN_DART: &str = "\
import 'package:flutter/material.dart';

class _HomeState extends State<Home> {
  int _counter = 0;

  void _incrementCounter() {
    setState(() {
      _counter++;
      if (_counter == 5) throw FormatException('Crash at $_counter');
    });
  }

  Widget build(BuildContext context) {
    return FloatingActionButton(
      onPressed: ActionGuard.guard(actionId: 'checkout_submit', action: _incrementCounter),
    );
  }
}";

	fn location(function: &str, line: u32) -> CrashLocation {
		CrashLocation {
			file_path: "lib/main.dart".to_string(),
			line,
			column: 7,
			function_name: function.to_string(),
			raw_line: String::new(),
		}
	}

	fn window(content: &str, line: u32) -> CodeWindow {
		CodeWindow::around("lib/main.dart", content.to_string(), line, 2)
	}

	#[tokio::test]
	async fn guard_call_is_high_confidence_from_full_text() {
		let loc = location("_incrementCounter", 9);
		let source = window(MAIN_DART, 9);
		assert!(!source.text.contains("actionId"));

		let extraction = PatternStrategy::new()
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;

		assert_eq!(extraction.action_id.as_deref(), Some("checkout_submit"));
		assert_eq!(extraction.confidence, Confidence::High);
		assert_eq!(extraction.method, ExtractionMethod::Pattern);
		assert_eq!(extraction.pattern.as_deref(), Some(GUARD_CALL_PATTERN));
		assert_eq!(extraction.found_at_line, Some(15));
	}

	#[tokio::test]
	async fn multi_line_guard_call_matches() {
		let code = "ActionGuard.run(\n  () => pay(),\n  actionId: \"pay_now\",\n)";
		let loc = location(UNKNOWN, 0);
		let source = CodeWindow::full("lib/pay.dart", code.to_string());
		let extraction = PatternStrategy::new()
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert_eq!(extraction.action_id.as_deref(), Some("pay_now"));
		assert_eq!(extraction.confidence, Confidence::High);
		assert_eq!(extraction.found_at_line, Some(3));
	}

	#[tokio::test]
	async fn bare_argument_is_medium_confidence() {
		let code = "final cfg = GuardConfig(actionId: 'cart_add');";
		let loc = location(UNKNOWN, 0);
		let source = CodeWindow::full("lib/cart.dart", code.to_string());
		let extraction = PatternStrategy::new()
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert_eq!(extraction.action_id.as_deref(), Some("cart_add"));
		assert_eq!(extraction.confidence, Confidence::Medium);
		assert_eq!(extraction.pattern.as_deref(), Some(ACTION_ID_ARGUMENT_PATTERN));
	}

	async fn extract(code: &str, loc: &CrashLocation) -> ActionExtraction {
		let source = CodeWindow::full("lib/a.dart", code.to_string());
		PatternStrategy::new()
			.extract(ExtractionContext {
				location: loc,
				source: &source,
			})
			.await
	}

	#[tokio::test]
	async fn first_match_wins_regardless_of_crash_line() {
		let code = "\
GuardConfig(actionId: 'first');
a();
b();
c();
d();
GuardConfig(actionId: 'second');";
		let extraction = extract(code, &location(UNKNOWN, 5)).await;
		assert_eq!(extraction.action_id.as_deref(), Some("first"));
		assert_eq!(extraction.found_at_line, Some(1));
	}

	#[tokio::test]
	async fn first_guard_call_wins() {
		let code = "\
ActionGuard.guard(actionId: 'refresh', action: _reload)
void _pay() { throw 1; }
ActionGuard.guard(actionId: 'pay', action: _pay)";
		let extraction = extract(code, &location("_pay", 2)).await;
		assert_eq!(extraction.action_id.as_deref(), Some("refresh"));
		assert_eq!(extraction.confidence, Confidence::High);
	}

	#[tokio::test]
	async fn argument_after_closed_guard_is_medium_confidence() {
		let code = "\
final b = ActionGuard.guard(action: _pay);
final c = Config(actionId: 'cfg_only');";
		let extraction = extract(code, &location(UNKNOWN, 0)).await;
		assert_eq!(extraction.action_id.as_deref(), Some("cfg_only"));
		assert_eq!(extraction.confidence, Confidence::Medium);
		assert_eq!(extraction.pattern.as_deref(), Some(ACTION_ID_ARGUMENT_PATTERN));
	}

	#[tokio::test]
	async fn guard_skips_action_ids_nested_in_its_arguments() {
		let code = "\
ActionGuard.guard(
  action: () => track(actionId: 'inner', label: 'a (b)'),
  actionId: 'outer',
)";
		let extraction = extract(code, &location(UNKNOWN, 0)).await;
		assert_eq!(extraction.action_id.as_deref(), Some("outer"));
		assert_eq!(extraction.confidence, Confidence::High);
		assert_eq!(extraction.found_at_line, Some(3));
	}

	#[tokio::test]
	async fn unclosed_guard_falls_back_to_bare_argument() {
		let code = "ActionGuard.guard(actionId: 'half', action: go";
		let extraction = extract(code, &location(UNKNOWN, 0)).await;
		assert_eq!(extraction.action_id.as_deref(), Some("half"));
		assert_eq!(extraction.confidence, Confidence::Medium);
	}

	#[tokio::test]
	async fn placeholder_literals_are_ignored() {
		let code = "GuardConfig(actionId: 'exact_string_from_code_or_empty');";
		let loc = location(UNKNOWN, 0);
		let source = CodeWindow::full("lib/a.dart", code.to_string());
		let extraction = PatternStrategy::new()
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert!(extraction.action_id.is_none());
		assert_eq!(extraction.confidence, Confidence::None);
	}

	#[tokio::test]
	async fn generative_reply_is_mapped() {
		let model = FakeModel::replying("checkout_submit", Confidence::Medium);
		let loc = location("_incrementCounter", 9);
		let source = window(MAIN_DART, 9);
		let extraction = GenerativeStrategy::new(model.clone())
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;

		assert_eq!(model.calls(), 1);
		assert_eq!(extraction.action_id.as_deref(), Some("checkout_submit"));
		assert_eq!(extraction.confidence, Confidence::Medium);
		assert_eq!(extraction.method, ExtractionMethod::Generative);
		assert_eq!(extraction.display_name.as_deref(), Some("Checkout Button"));
		assert_eq!(extraction.found_at_line, Some(12));
	}

	#[tokio::test]
	async fn generative_placeholder_is_not_found() {
		let model = FakeModel::replying("exact_string_from_code_or_empty", Confidence::High);
		let loc = location("f", 1);
		let source = window("x", 1);
		let extraction = GenerativeStrategy::new(model)
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert!(extraction.action_id.is_none());
		assert_eq!(extraction.confidence, Confidence::None);
	}

	#[tokio::test]
	async fn generative_failure_records_rationale() {
		let model = FakeModel::failing("503 unavailable");
		let loc = location("f", 1);
		let source = window("x", 1);
		let extraction = GenerativeStrategy::new(model)
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert_eq!(extraction.confidence, Confidence::None);
		assert!(extraction.rationale.contains("503 unavailable"));
	}

	#[tokio::test]
	async fn chain_skips_model_when_pattern_matches() {
		let model = FakeModel::replying("other", Confidence::High);
		let chain = ExtractorChain::with_model(model.clone(), DEFAULT_MODEL_TIMEOUT);
		let loc = location("_incrementCounter", 9);
		let source = window(MAIN_DART, 9);
		let extraction = chain
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;

		assert_eq!(extraction.action_id.as_deref(), Some("checkout_submit"));
		assert_eq!(model.calls(), 0);
		assert_eq!(chain.strategy_names(), vec!["pattern", "generative"]);
	}

	#[tokio::test]
	async fn chain_falls_back_to_model() {
		let model = FakeModel::replying("from_model", Confidence::Low);
		let chain = ExtractorChain::with_model(model.clone(), DEFAULT_MODEL_TIMEOUT);
		let loc = location("f", 1);
		let source = window("void f() { throw 1; }", 1);
		let extraction = chain
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert_eq!(extraction.action_id.as_deref(), Some("from_model"));
		assert_eq!(extraction.method, ExtractionMethod::Generative);
		assert_eq!(model.calls(), 1);
	}

	#[tokio::test]
	async fn empty_chain_finds_nothing() {
		let loc = location("f", 1);
		let source = window("x", 1);
		let extraction = ExtractorChain::new(Vec::new())
			.extract(ExtractionContext {
				location: &loc,
				source: &source,
			})
			.await;
		assert!(extraction.usable_action_id().is_none());
	}

	proptest! {
		#[test]
		fn extracted_id_is_substring_of_code(
			prefix in "[a-z ;\n]{0,40}",
			id in "[a-z][a-z0-9_]{2,20}",
			suffix in "[a-z ;\n]{0,40}",
			guarded in any::<bool>(),
		) {
			prop_assume!(!is_placeholder_action_id(&id));
			let call = if guarded {
				format!("ActionGuard.guard(actionId: '{id}', action: go)")
			} else {
				format!("Config(actionId: '{id}')")
			};
			let code = format!("{prefix}{call}{suffix}");
			let loc = location(UNKNOWN, 0);
			let source = CodeWindow::full("lib/p.dart", code.clone());
			let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
			let extraction = rt.block_on(PatternStrategy::new().extract(ExtractionContext {
				location: &loc,
				source: &source,
			}));

			let found = extraction.action_id.unwrap();
			prop_assert!(code.contains(&found));
			prop_assert_eq!(&found, &id);
			let expected = if guarded { Confidence::High } else { Confidence::Medium };
			prop_assert_eq!(extraction.confidence, expected);
		}
	}
}
