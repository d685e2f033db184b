// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash reports as delivered by the ingestion boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extraction::ActionExtraction;
use crate::stack::CrashLocation;
use crate::{ComponentId, CrashId, ProjectId};

/// Immutable crash input, consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
	pub id: CrashId,
	pub project_id: ProjectId,
	pub error_message: String,
	pub stack_trace: Option<String>,
	pub app_version: Option<String>,
	pub event_count: u64,
	pub received_at: DateTime<Utc>,
}

impl CrashReport {
	pub fn new(project_id: ProjectId, error_message: impl Into<String>) -> Self {
		Self {
			id: CrashId::new(),
			project_id,
			error_message: error_message.into(),
			stack_trace: None,
			app_version: None,
			event_count: 1,
			received_at: Utc::now(),
		}
	}

	pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
		self.stack_trace = Some(stack_trace.into());
		self
	}

	pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
		self.app_version = Some(app_version.into());
		self
	}

	pub fn with_event_count(mut self, event_count: u64) -> Self {
		self.event_count = event_count;
		self
	}

	/// Event count used when attaching the crash; reporters that omit it count once.
	pub fn effective_event_count(&self) -> u64 {
		self.event_count.max(1)
	}
}

/// What the pipeline concluded about a crash.
///
/// `component_id` is set once the crash is linked. Unlinked terminal states
/// carry a human-readable `reason`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashResolution {
	pub component_id: Option<ComponentId>,
	pub reason: Option<String>,
	pub location: Option<CrashLocation>,
	pub extraction: Option<ActionExtraction>,
	pub recorded_at: Option<DateTime<Utc>>,
}

impl CrashResolution {
	pub fn unlinked(reason: impl Into<String>) -> Self {
		Self {
			reason: Some(reason.into()),
			recorded_at: Some(Utc::now()),
			..Self::default()
		}
	}

	pub fn with_location(mut self, location: Option<CrashLocation>) -> Self {
		self.location = location;
		self
	}

	pub fn with_extraction(mut self, extraction: Option<ActionExtraction>) -> Self {
		self.extraction = extraction;
		self
	}

	pub fn is_linked(&self) -> bool {
		self.component_id.is_some()
	}
}

/// A stored crash together with its resolution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCrash {
	pub report: CrashReport,
	pub resolution: CrashResolution,
}
