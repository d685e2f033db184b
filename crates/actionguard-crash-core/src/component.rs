// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracked components and the errors attributed to them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CrashError;
use crate::{ComponentErrorId, ComponentId, ProjectId};

/// Crash count at which a new component is switched to maintenance.
pub const DEFAULT_CRASH_THRESHOLD: u32 = 3;

/// Lifecycle status of a component, as seen by the client SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
	#[default]
	Active,
	Maintenance,
	Deprecated,
}

impl fmt::Display for ComponentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ComponentStatus::Active => write!(f, "active"),
			ComponentStatus::Maintenance => write!(f, "maintenance"),
			ComponentStatus::Deprecated => write!(f, "deprecated"),
		}
	}
}

impl FromStr for ComponentStatus {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(ComponentStatus::Active),
			"maintenance" => Ok(ComponentStatus::Maintenance),
			"deprecated" => Ok(ComponentStatus::Deprecated),
			_ => Err(CrashError::InvalidStatus(s.to_string())),
		}
	}
}

/// Status after an aggregate recompute.
///
/// Only the active/maintenance toggle is automatic. Deprecated components and
/// operator overrides keep their current status.
pub fn derive_status(
	current: ComponentStatus,
	status_override: bool,
	crash_count: u64,
	crash_threshold: u32,
) -> ComponentStatus {
	if status_override || current == ComponentStatus::Deprecated {
		return current;
	}
	if crash_count >= u64::from(crash_threshold) {
		ComponentStatus::Maintenance
	} else {
		ComponentStatus::Active
	}
}

/// A feature addressed by an action identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
	pub id: ComponentId,
	pub project_id: ProjectId,
	pub identifier: String,
	pub name: String,
	pub status: ComponentStatus,
	/// Set when an operator chose the status; recomputes leave it alone.
	pub status_override: bool,
	pub fallback_message: Option<String>,
	pub crash_threshold: u32,
	pub crash_count: u64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Component {
	/// A fresh active component for a newly seen identifier.
	pub fn new(project_id: ProjectId, identifier: impl Into<String>, name: Option<String>) -> Self {
		let identifier = identifier.into();
		let now = Utc::now();
		Self {
			id: ComponentId::new(),
			project_id,
			name: name
				.map(|n| n.trim().to_string())
				.filter(|n| !n.is_empty())
				.unwrap_or_else(|| identifier.clone()),
			identifier,
			status: ComponentStatus::Active,
			status_override: false,
			fallback_message: None,
			crash_threshold: DEFAULT_CRASH_THRESHOLD,
			crash_count: 0,
			created_at: now,
			updated_at: now,
		}
	}
}

/// One (possibly merged) crash occurrence attributed to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentErrorRecord {
	pub id: ComponentErrorId,
	pub component_id: ComponentId,
	pub project_id: ProjectId,
	pub action_id: String,
	pub app_version: String,
	pub error_message: String,
	pub stack_trace: Option<String>,
	pub event_count: u64,
	pub metadata: serde_json::Value,
	pub archived: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Per-version crash and invocation counters for a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionStat {
	pub component_id: ComponentId,
	pub app_version: String,
	pub crash_count: u64,
	pub action_count: u64,
	pub updated_at: DateTime<Utc>,
}

impl VersionStat {
	/// Crashes per recorded invocation; zero before any invocation is recorded.
	pub fn crash_rate(&self) -> f64 {
		if self.action_count == 0 {
			0.0
		} else {
			self.crash_count as f64 / self.action_count as f64
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_flips_at_threshold() {
		assert_eq!(
			derive_status(ComponentStatus::Active, false, 2, 3),
			ComponentStatus::Active
		);
		assert_eq!(
			derive_status(ComponentStatus::Active, false, 3, 3),
			ComponentStatus::Maintenance
		);
		assert_eq!(
			derive_status(ComponentStatus::Maintenance, false, 1, 3),
			ComponentStatus::Active
		);
	}

	#[test]
	fn overrides_and_deprecated_are_sticky() {
		assert_eq!(
			derive_status(ComponentStatus::Active, true, 10, 3),
			ComponentStatus::Active
		);
		assert_eq!(
			derive_status(ComponentStatus::Maintenance, true, 0, 3),
			ComponentStatus::Maintenance
		);
		assert_eq!(
			derive_status(ComponentStatus::Deprecated, false, 10, 3),
			ComponentStatus::Deprecated
		);
	}

	#[test]
	fn new_component_defaults_name_to_identifier() {
		let project = ProjectId::new();
		let c = Component::new(project, "checkout_submit", None);
		assert_eq!(c.name, "checkout_submit");
		assert_eq!(c.status, ComponentStatus::Active);
		assert_eq!(c.crash_threshold, DEFAULT_CRASH_THRESHOLD);

		let named = Component::new(project, "checkout_submit", Some("Checkout".into()));
		assert_eq!(named.name, "Checkout");

		let blank = Component::new(project, "checkout_submit", Some("  ".into()));
		assert_eq!(blank.name, "checkout_submit");
	}

	#[test]
	fn crash_rate_handles_zero_invocations() {
		let mut stat = VersionStat {
			component_id: ComponentId::new(),
			app_version: "1.0.0".to_string(),
			crash_count: 3,
			action_count: 0,
			updated_at: Utc::now(),
		};
		assert_eq!(stat.crash_rate(), 0.0);
		stat.action_count = 12;
		assert!((stat.crash_rate() - 0.25).abs() < f64::EPSILON);
	}

	#[test]
	fn status_roundtrips_through_strings() {
		for status in [
			ComponentStatus::Active,
			ComponentStatus::Maintenance,
			ComponentStatus::Deprecated,
		] {
			assert_eq!(status.to_string().parse::<ComponentStatus>().unwrap(), status);
		}
		assert!("locked".parse::<ComponentStatus>().is_err());
	}
}
