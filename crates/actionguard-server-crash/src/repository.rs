// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository layer for crash and component persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use actionguard_crash_core::{
	derive_status, ActionExtraction, Component, ComponentErrorId, ComponentErrorRecord,
	ComponentId, ComponentStatus, CrashId, CrashLocation, CrashReport, CrashResolution, ProjectId,
	StoredCrash, VersionStat,
};

use crate::error::{CrashServerError, Result};

/// Everything needed to attach one resolved crash to its component.
#[derive(Debug, Clone)]
pub struct CrashApplication {
	pub crash_id: CrashId,
	pub project_id: ProjectId,
	pub action_id: String,
	/// Name for the component if it has to be created.
	pub display_name: Option<String>,
	pub error_message: String,
	pub stack_trace: Option<String>,
	/// Already normalized.
	pub app_version: String,
	pub event_count: u64,
	pub metadata: serde_json::Value,
	pub location: Option<CrashLocation>,
	pub extraction: ActionExtraction,
}

/// Result of [`CrashRepository::apply_crash`].
#[derive(Debug, Clone)]
pub struct AppliedCrash {
	/// Component state after the aggregate and status recompute.
	pub component: Component,
	pub error_id: ComponentErrorId,
	pub created_component: bool,
	pub created_error: bool,
	/// False when this crash had been applied before and nothing changed.
	pub first_application: bool,
}

/// Repository trait for crash pipeline state.
#[async_trait]
pub trait CrashRepository: Send + Sync {
	// Crash reports
	async fn insert_crash_report(&self, report: &CrashReport) -> Result<()>;
	async fn get_crash(&self, id: CrashId) -> Result<Option<StoredCrash>>;
	/// Unlinked crashes with a stack trace. Crashes never attempted come first,
	/// each group oldest first.
	async fn list_unlinked_crashes(&self, limit: u32) -> Result<Vec<CrashReport>>;
	/// Store an unlinked terminal state. Linked crashes are left untouched.
	async fn record_resolution(&self, id: CrashId, resolution: &CrashResolution) -> Result<()>;

	// Components
	async fn get_component(&self, id: ComponentId) -> Result<Option<Component>>;
	async fn get_component_by_identifier(
		&self,
		project_id: ProjectId,
		identifier: &str,
	) -> Result<Option<Component>>;
	async fn list_components(&self, project_id: Option<ProjectId>) -> Result<Vec<Component>>;
	async fn list_component_statuses(
		&self,
		project_id: ProjectId,
		identifiers: &[String],
	) -> Result<Vec<(String, ComponentStatus)>>;

	// Errors and version stats
	async fn get_component_error(&self, id: ComponentErrorId) -> Result<Option<ComponentErrorRecord>>;
	async fn list_component_errors(&self, component_id: ComponentId) -> Result<Vec<ComponentErrorRecord>>;
	async fn list_version_stats(&self, component_id: ComponentId) -> Result<Vec<VersionStat>>;
	async fn increment_action_count(
		&self,
		component_id: ComponentId,
		app_version: &str,
		count: u64,
	) -> Result<()>;

	// Atomic state transitions
	async fn apply_crash(&self, application: &CrashApplication) -> Result<AppliedCrash>;
	async fn recompute_component(&self, id: ComponentId) -> Result<Component>;
	/// `Some` pins the status as an operator override; `None` releases it and re-derives.
	async fn set_status_override(
		&self,
		id: ComponentId,
		status: Option<ComponentStatus>,
	) -> Result<Component>;
	async fn set_error_archived(&self, id: ComponentErrorId, archived: bool) -> Result<Component>;
}

/// SQLite implementation of the crash repository.
#[derive(Clone)]
pub struct SqliteCrashRepository {
	pool: SqlitePool,
}

impl SqliteCrashRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

const COMPONENT_COLUMNS: &str = "id, project_id, identifier, name, status, status_override, \
	fallback_message, crash_threshold, crash_count, created_at, updated_at";

const ERROR_COLUMNS: &str = "id, component_id, project_id, action_id, app_version, error_message, \
	stack_trace, event_count, metadata, archived, created_at, updated_at";

const CRASH_COLUMNS: &str = "id, project_id, error_message, stack_trace, app_version, event_count, \
	received_at, component_id, resolution_reason, resolution_location, resolution_extraction, \
	recorded_at";

#[async_trait]
impl CrashRepository for SqliteCrashRepository {
	#[instrument(skip(self, report), fields(crash_id = %report.id))]
	async fn insert_crash_report(&self, report: &CrashReport) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO crash_reports (
				id, project_id, error_message, stack_trace, app_version,
				event_count, received_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(report.id.0.to_string())
		.bind(report.project_id.0.to_string())
		.bind(&report.error_message)
		.bind(&report.stack_trace)
		.bind(&report.app_version)
		.bind(report.event_count as i64)
		.bind(report.received_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(crash_id = %id))]
	async fn get_crash(&self, id: CrashId) -> Result<Option<StoredCrash>> {
		let row = sqlx::query_as::<_, CrashRow>(&format!(
			"SELECT {CRASH_COLUMNS} FROM crash_reports WHERE id = ?"
		))
		.bind(id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn list_unlinked_crashes(&self, limit: u32) -> Result<Vec<CrashReport>> {
		let rows = sqlx::query_as::<_, CrashRow>(&format!(
			r#"
			SELECT {CRASH_COLUMNS} FROM crash_reports
			WHERE component_id IS NULL AND stack_trace IS NOT NULL
			ORDER BY recorded_at IS NOT NULL, received_at ASC, id ASC
			LIMIT ?
			"#
		))
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter()
			.map(|row| StoredCrash::try_from(row).map(|crash| crash.report))
			.collect()
	}

	#[instrument(skip(self, resolution), fields(crash_id = %id))]
	async fn record_resolution(&self, id: CrashId, resolution: &CrashResolution) -> Result<()> {
		let location = resolution
			.location
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		let extraction = resolution
			.extraction
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		let recorded_at = resolution.recorded_at.unwrap_or_else(Utc::now);

		let result = sqlx::query(
			r#"
			UPDATE crash_reports
			SET resolution_reason = ?, resolution_location = ?, resolution_extraction = ?,
				recorded_at = ?
			WHERE id = ? AND component_id IS NULL
			"#,
		)
		.bind(&resolution.reason)
		.bind(location)
		.bind(extraction)
		.bind(recorded_at.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			debug!("crash missing or already linked, resolution not stored");
		}
		Ok(())
	}

	#[instrument(skip(self), fields(component_id = %id))]
	async fn get_component(&self, id: ComponentId) -> Result<Option<Component>> {
		let mut conn = self.pool.acquire().await?;
		fetch_component(&mut conn, &id.0.to_string()).await
	}

	#[instrument(skip(self), fields(project_id = %project_id, identifier = %identifier))]
	async fn get_component_by_identifier(
		&self,
		project_id: ProjectId,
		identifier: &str,
	) -> Result<Option<Component>> {
		let mut conn = self.pool.acquire().await?;
		fetch_component_by_identifier(&mut conn, &project_id.0.to_string(), identifier).await
	}

	#[instrument(skip(self))]
	async fn list_components(&self, project_id: Option<ProjectId>) -> Result<Vec<Component>> {
		let rows = match project_id {
			Some(project_id) => {
				sqlx::query_as::<_, ComponentRow>(&format!(
					"SELECT {COMPONENT_COLUMNS} FROM components WHERE project_id = ? ORDER BY identifier"
				))
				.bind(project_id.0.to_string())
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query_as::<_, ComponentRow>(&format!(
					"SELECT {COMPONENT_COLUMNS} FROM components ORDER BY project_id, identifier"
				))
				.fetch_all(&self.pool)
				.await?
			}
		};

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, identifiers), fields(project_id = %project_id, count = identifiers.len()))]
	async fn list_component_statuses(
		&self,
		project_id: ProjectId,
		identifiers: &[String],
	) -> Result<Vec<(String, ComponentStatus)>> {
		if identifiers.is_empty() {
			return Ok(Vec::new());
		}

		let mut query = QueryBuilder::<Sqlite>::new(
			"SELECT identifier, status FROM components WHERE project_id = ",
		);
		query.push_bind(project_id.0.to_string());
		query.push(" AND identifier IN (");
		let mut separated = query.separated(", ");
		for identifier in identifiers {
			separated.push_bind(identifier.as_str());
		}
		separated.push_unseparated(")");

		let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&self.pool).await?;
		rows.into_iter()
			.map(|(identifier, status)| Ok((identifier, parse_status(&status)?)))
			.collect()
	}

	#[instrument(skip(self), fields(error_id = %id))]
	async fn get_component_error(&self, id: ComponentErrorId) -> Result<Option<ComponentErrorRecord>> {
		let row = sqlx::query_as::<_, ErrorRow>(&format!(
			"SELECT {ERROR_COLUMNS} FROM component_errors WHERE id = ?"
		))
		.bind(id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(component_id = %component_id))]
	async fn list_component_errors(&self, component_id: ComponentId) -> Result<Vec<ComponentErrorRecord>> {
		let rows = sqlx::query_as::<_, ErrorRow>(&format!(
			"SELECT {ERROR_COLUMNS} FROM component_errors WHERE component_id = ? ORDER BY created_at"
		))
		.bind(component_id.0.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(component_id = %component_id))]
	async fn list_version_stats(&self, component_id: ComponentId) -> Result<Vec<VersionStat>> {
		let rows = sqlx::query_as::<_, VersionStatRow>(
			r#"
			SELECT component_id, app_version, crash_count, action_count, updated_at
			FROM version_stats
			WHERE component_id = ?
			ORDER BY app_version
			"#,
		)
		.bind(component_id.0.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(component_id = %component_id, app_version = %app_version))]
	async fn increment_action_count(
		&self,
		component_id: ComponentId,
		app_version: &str,
		count: u64,
	) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO version_stats (component_id, app_version, crash_count, action_count, updated_at)
			VALUES (?, ?, 0, ?, ?)
			ON CONFLICT (component_id, app_version) DO UPDATE SET
				action_count = action_count + excluded.action_count,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(component_id.0.to_string())
		.bind(app_version)
		.bind(count as i64)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(
		skip(self, application),
		fields(crash_id = %application.crash_id, action_id = %application.action_id)
	)]
	async fn apply_crash(&self, application: &CrashApplication) -> Result<AppliedCrash> {
		let mut tx = self.pool.begin().await?;
		let crash_id = application.crash_id.0.to_string();

		let prior: Option<(String, String)> = sqlx::query_as(
			r#"
			SELECT o.error_id, e.component_id
			FROM component_error_occurrences o
			JOIN component_errors e ON e.id = o.error_id
			WHERE o.crash_id = ?
			"#,
		)
		.bind(&crash_id)
		.fetch_optional(&mut *tx)
		.await?;

		if let Some((error_id, component_id)) = prior {
			let component = fetch_component(&mut tx, &component_id)
				.await?
				.ok_or_else(|| CrashServerError::ComponentNotFound(component_id.clone()))?;
			tx.commit().await?;
			debug!("crash already applied, counts unchanged");
			return Ok(AppliedCrash {
				component,
				error_id: ComponentErrorId(error_id.parse()?),
				created_component: false,
				created_error: false,
				first_application: false,
			});
		}

		let now = Utc::now().to_rfc3339();
		let project_id = application.project_id.0.to_string();
		let event_count = application.event_count.max(1) as i64;

		let candidate = Component::new(
			application.project_id,
			application.action_id.clone(),
			application.display_name.clone(),
		);
		let created_component = sqlx::query(
			r#"
			INSERT INTO components (
				id, project_id, identifier, name, status, status_override,
				fallback_message, crash_threshold, crash_count, created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, 0, NULL, ?, 0, ?, ?)
			ON CONFLICT (project_id, identifier) DO NOTHING
			"#,
		)
		.bind(candidate.id.0.to_string())
		.bind(&project_id)
		.bind(&candidate.identifier)
		.bind(&candidate.name)
		.bind(candidate.status.to_string())
		.bind(candidate.crash_threshold as i64)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await?
		.rows_affected()
			> 0;

		let component = fetch_component_by_identifier(&mut tx, &project_id, &application.action_id)
			.await?
			.ok_or_else(|| CrashServerError::ComponentNotFound(application.action_id.clone()))?;
		let component_id = component.id.0.to_string();
		let metadata = serde_json::to_string(&application.metadata)?;

		let existing: Option<String> = sqlx::query_scalar(
			"SELECT id FROM component_errors WHERE component_id = ? AND error_message = ?",
		)
		.bind(&component_id)
		.bind(&application.error_message)
		.fetch_optional(&mut *tx)
		.await?;

		let (error_id, created_error) = match existing {
			Some(error_id) => {
				sqlx::query(
					r#"
					UPDATE component_errors
					SET action_id = ?, app_version = ?, stack_trace = COALESCE(?, stack_trace),
						metadata = ?, event_count = event_count + ?, archived = 0, updated_at = ?
					WHERE id = ?
					"#,
				)
				.bind(&application.action_id)
				.bind(&application.app_version)
				.bind(&application.stack_trace)
				.bind(&metadata)
				.bind(event_count)
				.bind(&now)
				.bind(&error_id)
				.execute(&mut *tx)
				.await?;
				(error_id, false)
			}
			None => {
				let error_id = ComponentErrorId::new().0.to_string();
				sqlx::query(
					r#"
					INSERT INTO component_errors (
						id, component_id, project_id, action_id, app_version, error_message,
						stack_trace, event_count, metadata, archived, created_at, updated_at
					)
					VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
					"#,
				)
				.bind(&error_id)
				.bind(&component_id)
				.bind(&project_id)
				.bind(&application.action_id)
				.bind(&application.app_version)
				.bind(&application.error_message)
				.bind(&application.stack_trace)
				.bind(event_count)
				.bind(&metadata)
				.bind(&now)
				.bind(&now)
				.execute(&mut *tx)
				.await?;
				(error_id, true)
			}
		};

		sqlx::query(
			r#"
			INSERT INTO component_error_occurrences (crash_id, error_id, event_count, applied_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(&crash_id)
		.bind(&error_id)
		.bind(event_count)
		.bind(&now)
		.execute(&mut *tx)
		.await?;

		sqlx::query(
			r#"
			INSERT INTO version_stats (component_id, app_version, crash_count, action_count, updated_at)
			VALUES (?, ?, ?, 0, ?)
			ON CONFLICT (component_id, app_version) DO UPDATE SET
				crash_count = crash_count + excluded.crash_count,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(&component_id)
		.bind(&application.app_version)
		.bind(event_count)
		.bind(&now)
		.execute(&mut *tx)
		.await?;

		let component = recompute(&mut tx, &component_id).await?;

		let location = application
			.location
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		sqlx::query(
			r#"
			UPDATE crash_reports
			SET component_id = ?, resolution_reason = NULL, resolution_location = ?,
				resolution_extraction = ?, recorded_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&component_id)
		.bind(location)
		.bind(serde_json::to_string(&application.extraction)?)
		.bind(&now)
		.bind(&crash_id)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(AppliedCrash {
			component,
			error_id: ComponentErrorId(error_id.parse()?),
			created_component,
			created_error,
			first_application: true,
		})
	}

	#[instrument(skip(self), fields(component_id = %id))]
	async fn recompute_component(&self, id: ComponentId) -> Result<Component> {
		let mut tx = self.pool.begin().await?;
		let component = recompute(&mut tx, &id.0.to_string()).await?;
		tx.commit().await?;
		Ok(component)
	}

	#[instrument(skip(self), fields(component_id = %id, status = ?status))]
	async fn set_status_override(
		&self,
		id: ComponentId,
		status: Option<ComponentStatus>,
	) -> Result<Component> {
		let mut tx = self.pool.begin().await?;
		let component_id = id.0.to_string();
		let now = Utc::now().to_rfc3339();

		let result = match status {
			Some(status) => {
				sqlx::query(
					"UPDATE components SET status = ?, status_override = 1, updated_at = ? WHERE id = ?",
				)
				.bind(status.to_string())
				.bind(&now)
				.bind(&component_id)
				.execute(&mut *tx)
				.await?
			}
			None => {
				sqlx::query("UPDATE components SET status_override = 0, updated_at = ? WHERE id = ?")
					.bind(&now)
					.bind(&component_id)
					.execute(&mut *tx)
					.await?
			}
		};
		if result.rows_affected() == 0 {
			return Err(CrashServerError::ComponentNotFound(component_id));
		}

		let component = recompute(&mut tx, &component_id).await?;
		tx.commit().await?;
		Ok(component)
	}

	#[instrument(skip(self), fields(error_id = %id, archived))]
	async fn set_error_archived(&self, id: ComponentErrorId, archived: bool) -> Result<Component> {
		let mut tx = self.pool.begin().await?;
		let error_id = id.0.to_string();

		let component_id: Option<String> =
			sqlx::query_scalar("SELECT component_id FROM component_errors WHERE id = ?")
				.bind(&error_id)
				.fetch_optional(&mut *tx)
				.await?;
		let component_id = component_id.ok_or_else(|| CrashServerError::ErrorNotFound(error_id.clone()))?;

		sqlx::query("UPDATE component_errors SET archived = ?, updated_at = ? WHERE id = ?")
			.bind(archived)
			.bind(Utc::now().to_rfc3339())
			.bind(&error_id)
			.execute(&mut *tx)
			.await?;

		let component = recompute(&mut tx, &component_id).await?;
		tx.commit().await?;
		Ok(component)
	}
}

async fn fetch_component(conn: &mut SqliteConnection, id: &str) -> Result<Option<Component>> {
	let row = sqlx::query_as::<_, ComponentRow>(&format!(
		"SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?"
	))
	.bind(id)
	.fetch_optional(&mut *conn)
	.await?;

	row.map(TryInto::try_into).transpose()
}

async fn fetch_component_by_identifier(
	conn: &mut SqliteConnection,
	project_id: &str,
	identifier: &str,
) -> Result<Option<Component>> {
	let row = sqlx::query_as::<_, ComponentRow>(&format!(
		"SELECT {COMPONENT_COLUMNS} FROM components WHERE project_id = ? AND identifier = ?"
	))
	.bind(project_id)
	.bind(identifier)
	.fetch_optional(&mut *conn)
	.await?;

	row.map(TryInto::try_into).transpose()
}

/// Resync a component's aggregate with its non-archived errors and re-derive its status.
async fn recompute(conn: &mut SqliteConnection, component_id: &str) -> Result<Component> {
	let mut component = fetch_component(&mut *conn, component_id)
		.await?
		.ok_or_else(|| CrashServerError::ComponentNotFound(component_id.to_string()))?;

	let total: i64 = sqlx::query_scalar(
		"SELECT COALESCE(SUM(event_count), 0) FROM component_errors WHERE component_id = ? AND archived = 0",
	)
	.bind(component_id)
	.fetch_one(&mut *conn)
	.await?;

	let crash_count = total.max(0) as u64;
	let status = derive_status(
		component.status,
		component.status_override,
		crash_count,
		component.crash_threshold,
	);

	if crash_count != component.crash_count || status != component.status {
		let now = Utc::now();
		sqlx::query("UPDATE components SET crash_count = ?, status = ?, updated_at = ? WHERE id = ?")
			.bind(crash_count as i64)
			.bind(status.to_string())
			.bind(now.to_rfc3339())
			.bind(component_id)
			.execute(&mut *conn)
			.await?;

		if status != component.status {
			debug!(
				component_id,
				from = %component.status,
				to = %status,
				crash_count,
				"component status changed"
			);
		}
		component.crash_count = crash_count;
		component.status = status;
		component.updated_at = now;
	}

	Ok(component)
}

fn parse_status(s: &str) -> Result<ComponentStatus> {
	s.parse()
		.map_err(|_| CrashServerError::Parse(format!("invalid component status: {s}")))
}

#[derive(Debug, sqlx::FromRow)]
struct CrashRow {
	id: String,
	project_id: String,
	error_message: String,
	stack_trace: Option<String>,
	app_version: Option<String>,
	event_count: i64,
	received_at: String,
	component_id: Option<String>,
	resolution_reason: Option<String>,
	resolution_location: Option<String>,
	resolution_extraction: Option<String>,
	recorded_at: Option<String>,
}

impl TryFrom<CrashRow> for StoredCrash {
	type Error = CrashServerError;

	fn try_from(row: CrashRow) -> Result<Self> {
		Ok(StoredCrash {
			report: CrashReport {
				id: CrashId(row.id.parse()?),
				project_id: ProjectId(row.project_id.parse()?),
				error_message: row.error_message,
				stack_trace: row.stack_trace,
				app_version: row.app_version,
				event_count: row.event_count.max(0) as u64,
				received_at: parse_datetime(&row.received_at)?,
			},
			resolution: CrashResolution {
				component_id: row
					.component_id
					.map(|s| s.parse().map(ComponentId))
					.transpose()?,
				reason: row.resolution_reason,
				location: row
					.resolution_location
					.map(|s| serde_json::from_str(&s))
					.transpose()?,
				extraction: row
					.resolution_extraction
					.map(|s| serde_json::from_str(&s))
					.transpose()?,
				recorded_at: row.recorded_at.map(|s| parse_datetime(&s)).transpose()?,
			},
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct ComponentRow {
	id: String,
	project_id: String,
	identifier: String,
	name: String,
	status: String,
	status_override: i64,
	fallback_message: Option<String>,
	crash_threshold: i64,
	crash_count: i64,
	created_at: String,
	updated_at: String,
}

impl TryFrom<ComponentRow> for Component {
	type Error = CrashServerError;

	fn try_from(row: ComponentRow) -> Result<Self> {
		Ok(Component {
			id: ComponentId(row.id.parse()?),
			project_id: ProjectId(row.project_id.parse()?),
			identifier: row.identifier,
			name: row.name,
			status: parse_status(&row.status)?,
			status_override: row.status_override != 0,
			fallback_message: row.fallback_message,
			crash_threshold: row.crash_threshold.max(0) as u32,
			crash_count: row.crash_count.max(0) as u64,
			created_at: parse_datetime(&row.created_at)?,
			updated_at: parse_datetime(&row.updated_at)?,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct ErrorRow {
	id: String,
	component_id: String,
	project_id: String,
	action_id: String,
	app_version: String,
	error_message: String,
	stack_trace: Option<String>,
	event_count: i64,
	metadata: String,
	archived: i64,
	created_at: String,
	updated_at: String,
}

impl TryFrom<ErrorRow> for ComponentErrorRecord {
	type Error = CrashServerError;

	fn try_from(row: ErrorRow) -> Result<Self> {
		Ok(ComponentErrorRecord {
			id: ComponentErrorId(row.id.parse()?),
			component_id: ComponentId(row.component_id.parse()?),
			project_id: ProjectId(row.project_id.parse()?),
			action_id: row.action_id,
			app_version: row.app_version,
			error_message: row.error_message,
			stack_trace: row.stack_trace,
			event_count: row.event_count.max(0) as u64,
			metadata: serde_json::from_str(&row.metadata)?,
			archived: row.archived != 0,
			created_at: parse_datetime(&row.created_at)?,
			updated_at: parse_datetime(&row.updated_at)?,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
struct VersionStatRow {
	component_id: String,
	app_version: String,
	crash_count: i64,
	action_count: i64,
	updated_at: String,
}

impl TryFrom<VersionStatRow> for VersionStat {
	type Error = CrashServerError;

	fn try_from(row: VersionStatRow) -> Result<Self> {
		Ok(VersionStat {
			component_id: ComponentId(row.component_id.parse()?),
			app_version: row.app_version,
			crash_count: row.crash_count.max(0) as u64,
			action_count: row.action_count.max(0) as u64,
			updated_at: parse_datetime(&row.updated_at)?,
		})
	}
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| CrashServerError::InvalidDateTime(s.to_string()))
}
