// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::{CrashServerError, Result};

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./actionguard.db")
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| CrashServerError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

const MIGRATIONS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS crash_reports (
		id TEXT PRIMARY KEY,
		project_id TEXT NOT NULL,
		error_message TEXT NOT NULL,
		stack_trace TEXT,
		app_version TEXT,
		event_count INTEGER NOT NULL DEFAULT 1,
		received_at TEXT NOT NULL,
		component_id TEXT REFERENCES components(id) ON DELETE SET NULL,
		resolution_reason TEXT,
		resolution_location TEXT,
		resolution_extraction TEXT,
		recorded_at TEXT
	)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_crash_reports_unlinked
		ON crash_reports (received_at)
		WHERE component_id IS NULL
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS components (
		id TEXT PRIMARY KEY,
		project_id TEXT NOT NULL,
		identifier TEXT NOT NULL,
		name TEXT NOT NULL,
		status TEXT NOT NULL DEFAULT 'active',
		status_override INTEGER NOT NULL DEFAULT 0,
		fallback_message TEXT,
		crash_threshold INTEGER NOT NULL DEFAULT 3,
		crash_count INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE (project_id, identifier)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS component_errors (
		id TEXT PRIMARY KEY,
		component_id TEXT NOT NULL REFERENCES components(id) ON DELETE CASCADE,
		project_id TEXT NOT NULL,
		action_id TEXT NOT NULL,
		app_version TEXT NOT NULL,
		error_message TEXT NOT NULL,
		stack_trace TEXT,
		event_count INTEGER NOT NULL DEFAULT 1,
		metadata TEXT NOT NULL DEFAULT '{}',
		archived INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE (component_id, error_message)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS component_error_occurrences (
		crash_id TEXT PRIMARY KEY,
		error_id TEXT NOT NULL REFERENCES component_errors(id) ON DELETE CASCADE,
		event_count INTEGER NOT NULL,
		applied_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS version_stats (
		component_id TEXT NOT NULL REFERENCES components(id) ON DELETE CASCADE,
		app_version TEXT NOT NULL,
		crash_count INTEGER NOT NULL DEFAULT 0,
		action_count INTEGER NOT NULL DEFAULT 0,
		updated_at TEXT NOT NULL,
		PRIMARY KEY (component_id, app_version)
	)
	"#,
];

/// Create every table and index the crash pipeline needs.
///
/// Safe to run on every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for statement in MIGRATIONS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = MIGRATIONS.len(), "migrations applied");
	Ok(())
}
