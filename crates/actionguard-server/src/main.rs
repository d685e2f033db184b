// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ActionGuard crash resolution runner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actionguard_crash_core::{ComponentErrorId, ComponentId, ComponentStatus, CrashId, ProjectId};
use actionguard_server_crash::Reconciler;
use actionguard_server_resolve::CancellationToken;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod version;
mod wiring;

/// Resolve crash reports to guarded actions and keep component health current.
#[derive(Parser, Debug)]
#[command(name = "actionguard-server", about = "ActionGuard crash resolution pipeline", version)]
struct Args {
	/// Config file (defaults to /etc/actionguard/server.toml)
	#[arg(long, global = true, env = "ACTIONGUARD_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Store crash reports from a JSON file (`-` for stdin)
	Ingest { path: PathBuf },
	/// Run the pipeline for one stored crash
	Process { crash_id: CrashId },
	/// Process one batch of unlinked crashes
	Batch,
	/// Process batches on an interval until interrupted
	Watch {
		/// Seconds between batches
		#[arg(long)]
		interval: Option<u64>,
	},
	/// Resync every component's crash count and status
	Recompute {
		#[arg(long)]
		project: Option<ProjectId>,
	},
	/// Pin a component's status
	SetStatus {
		component_id: ComponentId,
		status: ComponentStatus,
	},
	/// Return a component to automatic status
	ClearOverride { component_id: ComponentId },
	/// Archive an error record and recompute its component
	ArchiveError { error_id: ComponentErrorId },
	/// Print statuses for component identifiers
	Statuses {
		#[arg(long)]
		project: ProjectId,
		identifiers: Vec<String>,
	},
	/// Count guarded action invocations for crash-rate statistics
	RecordInvocation {
		#[arg(long)]
		project: ProjectId,
		identifier: String,
		#[arg(long)]
		app_version: Option<String>,
		#[arg(long, default_value_t = 1)]
		count: u64,
	},
	/// Create or update the database schema
	Migrate,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => actionguard_server_config::load_config_with_file(path)?,
		None => actionguard_server_config::load_config()?,
	};
	logging::init_tracing(&config.logging);

	let repository = wiring::open_store(&config).await?;
	let reconciler = Arc::new(Reconciler::new(repository.clone()));

	match args.command {
		Command::Ingest { path } => {
			for id in commands::ingest(repository.as_ref(), &path).await? {
				println!("{id}");
			}
		}
		Command::Process { crash_id } => {
			let orchestrator = wiring::orchestrator(&config, reconciler)?;
			commands::process(&orchestrator, crash_id).await?;
		}
		Command::Batch => {
			let runner = wiring::batch_runner(&config, reconciler)?;
			let cancel = cancel_on_ctrl_c();
			commands::batch(&runner, &cancel).await?;
		}
		Command::Watch { interval } => {
			let runner = wiring::batch_runner(&config, reconciler)?;
			let interval =
				Duration::from_secs(interval.unwrap_or(config.pipeline.watch_interval_secs).max(1));
			let cancel = cancel_on_ctrl_c();
			commands::watch(&runner, interval, &cancel).await?;
		}
		Command::Recompute { project } => {
			commands::recompute(&reconciler, project).await?;
		}
		Command::SetStatus {
			component_id,
			status,
		} => {
			commands::set_status(&reconciler, component_id, status).await?;
		}
		Command::ClearOverride { component_id } => {
			commands::clear_override(&reconciler, component_id).await?;
		}
		Command::ArchiveError { error_id } => {
			commands::archive_error(&reconciler, error_id).await?;
		}
		Command::Statuses {
			project,
			identifiers,
		} => {
			commands::statuses(&reconciler, project, &identifiers).await?;
		}
		Command::RecordInvocation {
			project,
			identifier,
			app_version,
			count,
		} => {
			commands::record_invocation(
				&reconciler,
				project,
				&identifier,
				app_version.as_deref(),
				count,
			)
			.await?;
		}
		Command::Migrate => {
			println!("migrations applied to {}", config.database.url);
		}
		Command::Version => unreachable!("version is printed before configuration is loaded"),
	}

	Ok(())
}

/// Token cancelled on the first Ctrl-C. In-flight crashes finish first.
fn cancel_on_ctrl_c() -> CancellationToken {
	let cancel = CancellationToken::new();
	let token = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::info!("received shutdown signal, finishing in-flight crashes");
			token.cancel();
		}
	});
	cancel
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_process_command() {
		let id = CrashId::new();
		let args = Args::try_parse_from(["actionguard-server", "process", &id.to_string()]).unwrap();
		assert!(matches!(args.command, Command::Process { crash_id } if crash_id == id));
	}

	#[test]
	fn parses_watch_interval_and_config() {
		let args = Args::try_parse_from([
			"actionguard-server",
			"watch",
			"--interval",
			"30",
			"--config",
			"/tmp/ag.toml",
		])
		.unwrap();
		assert!(matches!(args.command, Command::Watch { interval: Some(30) }));
		assert_eq!(args.config, Some(PathBuf::from("/tmp/ag.toml")));
	}

	#[test]
	fn parses_set_status() {
		let id = ComponentId::new();
		let args = Args::try_parse_from([
			"actionguard-server",
			"set-status",
			&id.to_string(),
			"maintenance",
		])
		.unwrap();
		assert!(matches!(
			args.command,
			Command::SetStatus { status: ComponentStatus::Maintenance, .. }
		));
	}

	#[test]
	fn parses_version_command() {
		let args = Args::try_parse_from(["actionguard-server", "version"]).unwrap();
		assert!(matches!(args.command, Command::Version));
	}

	#[test]
	fn rejects_malformed_crash_id() {
		assert!(Args::try_parse_from(["actionguard-server", "process", "42"]).is_err());
	}

	#[test]
	fn cli_definition_is_consistent() {
		use clap::CommandFactory;
		Args::command().debug_assert();
	}
}
