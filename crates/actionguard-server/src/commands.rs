// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand implementations.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use actionguard_crash_core::{
	ComponentErrorId, ComponentId, ComponentStatus, CrashId, CrashReport, ProjectId,
};
use actionguard_server_crash::{CrashRepository, Reconciler};
use actionguard_server_resolve::{BatchRunner, CancellationToken, Orchestrator};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};

/// Crash report as accepted by `ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestRecord {
	pub project_id: ProjectId,
	pub error_message: String,
	#[serde(default)]
	pub stack_trace: Option<String>,
	#[serde(default)]
	pub app_version: Option<String>,
	#[serde(default)]
	pub event_count: Option<u64>,
	#[serde(default)]
	pub received_at: Option<DateTime<Utc>>,
}

impl From<IngestRecord> for CrashReport {
	fn from(record: IngestRecord) -> Self {
		let mut report = CrashReport::new(record.project_id, record.error_message);
		report.stack_trace = record.stack_trace.filter(|t| !t.trim().is_empty());
		report.app_version = record.app_version;
		if let Some(count) = record.event_count {
			report.event_count = count;
		}
		if let Some(received_at) = record.received_at {
			report.received_at = received_at;
		}
		report
	}
}

/// Parse one record or an array of records.
pub fn parse_ingest(input: &str) -> Result<Vec<IngestRecord>> {
	let value: serde_json::Value = serde_json::from_str(input).context("input is not JSON")?;
	let records = if value.is_array() {
		serde_json::from_value(value)?
	} else {
		vec![serde_json::from_value(value)?]
	};
	Ok(records)
}

pub async fn ingest(repository: &dyn CrashRepository, path: &Path) -> Result<Vec<CrashId>> {
	let input = if path == Path::new("-") {
		let mut buf = String::new();
		std::io::stdin()
			.read_to_string(&mut buf)
			.context("failed to read stdin")?;
		buf
	} else {
		std::fs::read_to_string(path)
			.with_context(|| format!("failed to read {}", path.display()))?
	};

	let mut ids = Vec::new();
	for record in parse_ingest(&input)? {
		let report = CrashReport::from(record);
		repository.insert_crash_report(&report).await?;
		info!(crash_id = %report.id, project_id = %report.project_id, "crash stored");
		ids.push(report.id);
	}
	Ok(ids)
}

pub async fn process(orchestrator: &Orchestrator, id: CrashId) -> Result<()> {
	let outcome = orchestrator.process_crash_id(id).await?;
	println!("{}", serde_json::to_string_pretty(&outcome)?);
	Ok(())
}

pub async fn batch(runner: &BatchRunner, cancel: &CancellationToken) -> Result<()> {
	let summary = runner.run(cancel).await?;
	println!(
		"selected={} linked={} unlinked={} failed={} cancelled={}",
		summary.selected,
		summary.linked,
		summary.unlinked,
		summary.failures.len(),
		summary.cancelled
	);
	for (crash_id, reason) in &summary.failures {
		println!("  failed {crash_id}: {reason}");
	}
	Ok(())
}

/// Run batches until cancelled. Cancellation is honoured between items and
/// while waiting for the next tick.
pub async fn watch(runner: &BatchRunner, interval: Duration, cancel: &CancellationToken) -> Result<()> {
	info!(interval_secs = interval.as_secs(), "watching for unlinked crashes");
	while !cancel.is_cancelled() {
		if let Err(e) = runner.run(cancel).await {
			error!(error = %e, "batch failed");
		}

		tokio::select! {
			_ = tokio::time::sleep(interval) => {}
			_ = cancel.cancelled() => {}
		}
	}
	info!("watch stopped");
	Ok(())
}

pub async fn recompute(reconciler: &Reconciler, project_id: Option<ProjectId>) -> Result<()> {
	let summary = reconciler.recompute_all(project_id).await?;
	println!(
		"components={} status_changes={} failures={}",
		summary.components,
		summary.status_changes,
		summary.failures.len()
	);
	for (component_id, reason) in &summary.failures {
		println!("  failed {component_id}: {reason}");
	}
	Ok(())
}

pub async fn set_status(reconciler: &Reconciler, id: ComponentId, status: ComponentStatus) -> Result<()> {
	let component = reconciler.set_component_status(id, status).await?;
	println!("{} {} (override)", component.identifier, component.status);
	Ok(())
}

pub async fn clear_override(reconciler: &Reconciler, id: ComponentId) -> Result<()> {
	let component = reconciler.clear_status_override(id).await?;
	println!(
		"{} {} (crashes={})",
		component.identifier, component.status, component.crash_count
	);
	Ok(())
}

pub async fn archive_error(reconciler: &Reconciler, id: ComponentErrorId) -> Result<()> {
	let component = reconciler.archive_error(id).await?;
	println!(
		"{} {} (crashes={})",
		component.identifier, component.status, component.crash_count
	);
	Ok(())
}

pub async fn statuses(
	reconciler: &Reconciler,
	project_id: ProjectId,
	identifiers: &[String],
) -> Result<()> {
	let statuses = reconciler.component_statuses(project_id, identifiers).await?;
	let map: serde_json::Map<String, serde_json::Value> = statuses
		.into_iter()
		.map(|(identifier, status)| (identifier, serde_json::Value::String(status.to_string())))
		.collect();
	println!("{}", serde_json::to_string_pretty(&map)?);
	Ok(())
}

pub async fn record_invocation(
	reconciler: &Reconciler,
	project_id: ProjectId,
	identifier: &str,
	app_version: Option<&str>,
	count: u64,
) -> Result<()> {
	let recorded = reconciler
		.record_action_invocation(project_id, identifier, app_version, count)
		.await?;
	if !recorded {
		println!("no component for {identifier}, invocation ignored");
	}
	Ok(())
}
