// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component reconciliation and operator actions.
//!
//! Reconciliation attaches a resolved crash to the component named by its
//! action identifier and keeps the component's aggregate crash count and
//! status in step with its error records. Each state change runs in one
//! database transaction and is serialized per component by an in-process
//! keyed lock.

use std::sync::Arc;

use actionguard_crash_core::{
	normalize_app_version, ActionExtraction, Component, ComponentErrorId, ComponentId,
	ComponentStatus, CrashLocation, CrashReport, CrashResolution, ProjectId,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::error::{CrashServerError, Result};
use crate::locks::KeyedLocks;
use crate::repository::{AppliedCrash, CrashApplication, CrashRepository};

/// Reason stored against crashes whose extraction yielded no usable id.
pub const NO_ACTION_ID_FOUND: &str = "no action id found";

/// Result of reconciling one crash.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
	Linked(AppliedCrash),
	Unlinked { reason: String },
}

/// Summary of [`Reconciler::recompute_all`].
#[derive(Debug, Clone, Default)]
pub struct RecomputeSummary {
	pub components: usize,
	pub status_changes: usize,
	pub failures: Vec<(ComponentId, String)>,
}

pub struct Reconciler {
	repository: Arc<dyn CrashRepository>,
	locks: KeyedLocks<(ProjectId, String)>,
}

impl Reconciler {
	pub fn new(repository: Arc<dyn CrashRepository>) -> Self {
		Self {
			repository,
			locks: KeyedLocks::new(),
		}
	}

	pub fn repository(&self) -> &Arc<dyn CrashRepository> {
		&self.repository
	}

	/// Attach a crash to its component, or record why it stays unlinked.
	///
	/// Re-running for the same crash id leaves every count unchanged.
	#[instrument(skip(self, crash, location, extraction), fields(crash_id = %crash.id))]
	pub async fn reconcile(
		&self,
		crash: &CrashReport,
		location: Option<&CrashLocation>,
		extraction: &ActionExtraction,
	) -> Result<ReconcileOutcome> {
		let Some(action_id) = extraction.usable_action_id() else {
			let resolution = CrashResolution::unlinked(NO_ACTION_ID_FOUND)
				.with_location(location.cloned())
				.with_extraction(Some(extraction.clone()));
			self.repository.record_resolution(crash.id, &resolution).await?;
			info!(confidence = %extraction.confidence, "crash left unlinked: {NO_ACTION_ID_FOUND}");
			return Ok(ReconcileOutcome::Unlinked {
				reason: NO_ACTION_ID_FOUND.to_string(),
			});
		};

		let application = CrashApplication {
			crash_id: crash.id,
			project_id: crash.project_id,
			action_id: action_id.to_string(),
			display_name: extraction.display_name.clone(),
			error_message: crash.error_message.clone(),
			stack_trace: crash.stack_trace.clone(),
			app_version: normalize_app_version(crash.app_version.as_deref()),
			event_count: crash.effective_event_count(),
			metadata: json!({
				"crash_id": crash.id,
				"extraction": extraction,
				"location": location,
			}),
			location: location.cloned(),
			extraction: extraction.clone(),
		};

		let _guard = self
			.locks
			.lock(&(crash.project_id, application.action_id.clone()))
			.await;
		let applied = self.repository.apply_crash(&application).await?;

		info!(
			action_id = %application.action_id,
			component_id = %applied.component.id,
			error_id = %applied.error_id,
			created_component = applied.created_component,
			first_application = applied.first_application,
			crash_count = applied.component.crash_count,
			status = %applied.component.status,
			"crash linked to component"
		);
		Ok(ReconcileOutcome::Linked(applied))
	}

	/// Pin a component's status. Automatic recomputes leave it alone afterwards.
	#[instrument(skip(self), fields(component_id = %id, status = %status))]
	pub async fn set_component_status(&self, id: ComponentId, status: ComponentStatus) -> Result<Component> {
		let component = self.require_component(id).await?;
		let _guard = self.lock_component(&component).await;
		let component = self.repository.set_status_override(id, Some(status)).await?;
		info!("component status pinned by operator");
		Ok(component)
	}

	/// Release an operator override and re-derive status from the aggregate.
	#[instrument(skip(self), fields(component_id = %id))]
	pub async fn clear_status_override(&self, id: ComponentId) -> Result<Component> {
		let component = self.require_component(id).await?;
		let _guard = self.lock_component(&component).await;
		let component = self.repository.set_status_override(id, None).await?;
		info!(status = %component.status, "component status override cleared");
		Ok(component)
	}

	/// Archive an error record and recompute its component.
	#[instrument(skip(self), fields(error_id = %id))]
	pub async fn archive_error(&self, id: ComponentErrorId) -> Result<Component> {
		let error = self
			.repository
			.get_component_error(id)
			.await?
			.ok_or_else(|| CrashServerError::ErrorNotFound(id.to_string()))?;
		let component = self.require_component(error.component_id).await?;
		let _guard = self.lock_component(&component).await;
		let component = self.repository.set_error_archived(id, true).await?;
		info!(
			component_id = %component.id,
			crash_count = component.crash_count,
			"component error archived"
		);
		Ok(component)
	}

	/// Resync every component's aggregate and status.
	///
	/// A failing component is reported in the summary and does not stop the sweep.
	#[instrument(skip(self))]
	pub async fn recompute_all(&self, project_id: Option<ProjectId>) -> Result<RecomputeSummary> {
		let components = self.repository.list_components(project_id).await?;
		let mut summary = RecomputeSummary {
			components: components.len(),
			..RecomputeSummary::default()
		};

		for component in components {
			let _guard = self.lock_component(&component).await;
			match self.repository.recompute_component(component.id).await {
				Ok(updated) => {
					if updated.status != component.status {
						summary.status_changes += 1;
					}
				}
				Err(e) => {
					warn!(component_id = %component.id, error = %e, "recompute failed");
					summary.failures.push((component.id, e.to_string()));
				}
			}
		}

		info!(
			components = summary.components,
			status_changes = summary.status_changes,
			failures = summary.failures.len(),
			"recompute complete"
		);
		Ok(summary)
	}

	/// Status lookup for SDK polling. Unknown identifiers are active.
	#[instrument(skip(self, identifiers), fields(project_id = %project_id, count = identifiers.len()))]
	pub async fn component_statuses(
		&self,
		project_id: ProjectId,
		identifiers: &[String],
	) -> Result<Vec<(String, ComponentStatus)>> {
		let known = self
			.repository
			.list_component_statuses(project_id, identifiers)
			.await?;

		Ok(identifiers
			.iter()
			.map(|identifier| {
				let status = known
					.iter()
					.find(|(known_id, _)| known_id == identifier)
					.map(|(_, status)| *status)
					.unwrap_or_default();
				(identifier.clone(), status)
			})
			.collect())
	}

	/// Count guarded action invocations for crash-rate statistics.
	///
	/// Returns false when no component exists for the identifier yet.
	#[instrument(skip(self), fields(project_id = %project_id, identifier = %identifier))]
	pub async fn record_action_invocation(
		&self,
		project_id: ProjectId,
		identifier: &str,
		app_version: Option<&str>,
		count: u64,
	) -> Result<bool> {
		let Some(component) = self
			.repository
			.get_component_by_identifier(project_id, identifier)
			.await?
		else {
			warn!("invocation for unknown component ignored");
			return Ok(false);
		};

		let app_version = normalize_app_version(app_version);
		self.repository
			.increment_action_count(component.id, &app_version, count.max(1))
			.await?;
		Ok(true)
	}

	async fn require_component(&self, id: ComponentId) -> Result<Component> {
		self.repository
			.get_component(id)
			.await?
			.ok_or_else(|| CrashServerError::ComponentNotFound(id.to_string()))
	}

	async fn lock_component(&self, component: &Component) -> tokio::sync::OwnedMutexGuard<()> {
		self.locks
			.lock(&(component.project_id, component.identifier.clone()))
			.await
	}
}
