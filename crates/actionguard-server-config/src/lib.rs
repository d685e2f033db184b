// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the ActionGuard crash pipeline.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file and the environment
//! - Consistent environment variable naming (`ACTIONGUARD_<SECTION>_<FIELD>`)
//! - Secrets loaded with `*_FILE` support and redacted in logs
//!
//! # Usage
//!
//! ```ignore
//! use actionguard_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database: {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	/// `None` when the source host is not configured.
	pub github: Option<GithubSettings>,
	/// `None` runs pattern extraction only.
	pub gemini: Option<GeminiSettings>,
	pub pipeline: PipelineSettings,
	pub logging: LoggingConfig,
}

/// Load configuration with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ACTIONGUARD_*`, `GITHUB_TOKEN`, `GEMINI_API_KEY`)
/// 2. Config file (`/etc/actionguard/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let github = layer.github.and_then(|l| l.finalize());
	let gemini = layer.gemini.and_then(|l| l.finalize());
	let pipeline = layer.pipeline.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		database = %database.url,
		github_configured = github.is_some(),
		gemini_configured = gemini.is_some(),
		batch_size = pipeline.batch_size,
		concurrency = pipeline.concurrency,
		"configuration loaded"
	);

	Ok(ServerConfig {
		database,
		github,
		gemini,
		pipeline,
		logging,
	})
}
