// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;

use actionguard_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, GeminiConfigLayer, GithubConfigLayer, LoggingConfigLayer,
	PipelineConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults. Every default lives in the section `finalize` methods,
/// so this layer is empty.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/actionguard/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `ACTIONGUARD_<SECTION>_<FIELD>`. Secrets use their
/// conventional names (`GITHUB_TOKEN`, `GEMINI_API_KEY`) and accept a
/// `*_FILE` variant.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()),
			github: Some(load_github_from_env()?),
			gemini: Some(load_gemini_from_env()?),
			pipeline: Some(load_pipeline_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!(
				"invalid {} value '{v}'",
				std::any::type_name::<T>()
			),
		}),
		None => Ok(None),
	}
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("ACTIONGUARD_DATABASE_URL"),
	}
}

fn load_github_from_env() -> Result<GithubConfigLayer, ConfigError> {
	Ok(GithubConfigLayer {
		token: load_secret_env("GITHUB_TOKEN").map_err(|e| ConfigError::Secret(e.to_string()))?,
		owner: env_var("ACTIONGUARD_GITHUB_OWNER"),
		repo: env_var("ACTIONGUARD_GITHUB_REPO"),
		branch: env_var("ACTIONGUARD_GITHUB_BRANCH"),
		base_url: env_var("ACTIONGUARD_GITHUB_BASE_URL"),
		timeout_secs: env_parse("ACTIONGUARD_GITHUB_TIMEOUT_SECS")?,
	})
}

fn load_gemini_from_env() -> Result<GeminiConfigLayer, ConfigError> {
	Ok(GeminiConfigLayer {
		api_key: load_secret_env("GEMINI_API_KEY")
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
		model: env_var("ACTIONGUARD_GEMINI_MODEL"),
		base_url: env_var("ACTIONGUARD_GEMINI_BASE_URL"),
		timeout_secs: env_parse("ACTIONGUARD_GEMINI_TIMEOUT_SECS")?,
		enabled: env_bool("ACTIONGUARD_GEMINI_ENABLED"),
	})
}

fn load_pipeline_from_env() -> Result<PipelineConfigLayer, ConfigError> {
	Ok(PipelineConfigLayer {
		extension: env_var("ACTIONGUARD_PIPELINE_EXTENSION"),
		deny_list: env_list("ACTIONGUARD_PIPELINE_DENY_LIST"),
		source_root: env_var("ACTIONGUARD_PIPELINE_SOURCE_ROOT"),
		test_root: env_var("ACTIONGUARD_PIPELINE_TEST_ROOT"),
		context_lines: env_parse("ACTIONGUARD_PIPELINE_CONTEXT_LINES")?,
		wide_context_lines: env_parse("ACTIONGUARD_PIPELINE_WIDE_CONTEXT_LINES")?,
		message_search: env_bool("ACTIONGUARD_PIPELINE_MESSAGE_SEARCH"),
		synthetic_marker_enabled: env_bool("ACTIONGUARD_PIPELINE_SYNTHETIC_MARKER_ENABLED"),
		synthetic_marker: env_var("ACTIONGUARD_PIPELINE_SYNTHETIC_MARKER"),
		synthetic_file: env_var("ACTIONGUARD_PIPELINE_SYNTHETIC_FILE"),
		synthetic_line: env_parse("ACTIONGUARD_PIPELINE_SYNTHETIC_LINE")?,
		synthetic_column: env_parse("ACTIONGUARD_PIPELINE_SYNTHETIC_COLUMN")?,
		synthetic_function: env_var("ACTIONGUARD_PIPELINE_SYNTHETIC_FUNCTION"),
		batch_size: env_parse("ACTIONGUARD_PIPELINE_BATCH_SIZE")?,
		delay_ms: env_parse("ACTIONGUARD_PIPELINE_DELAY_MS")?,
		concurrency: env_parse("ACTIONGUARD_PIPELINE_CONCURRENCY")?,
		watch_interval_secs: env_parse("ACTIONGUARD_PIPELINE_WATCH_INTERVAL_SECS")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("ACTIONGUARD_LOG_LEVEL"),
		json: env_var("ACTIONGUARD_LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.database.is_none());
		assert!(layer.pipeline.is_none());
	}

	#[test]
	fn toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/actionguard.toml").load().unwrap();
		assert!(layer.github.is_none());
	}

	#[test]
	fn toml_source_reads_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/tmp/crashes.db"

[github]
owner = "acme"
repo = "shop"

[pipeline]
batch_size = 25
concurrency = 4
synthetic_marker_enabled = false

[logging]
level = "debug"
json = true
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/tmp/crashes.db")
		);
		assert_eq!(layer.github.unwrap().repo.as_deref(), Some("shop"));
		let pipeline = layer.pipeline.unwrap();
		assert_eq!(pipeline.batch_size, Some(25));
		assert_eq!(pipeline.synthetic_marker_enabled, Some(false));
		assert_eq!(layer.logging.unwrap().json, Some(true));
	}

	#[test]
	fn toml_source_reports_parse_errors_with_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[pipeline]\nbatch_size = \"many\"").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
		assert!(err.to_string().contains(&file.path().display().to_string()));
	}

	#[test]
	fn env_parse_rejects_garbage() {
		std::env::set_var("ACTIONGUARD_TEST_ENV_PARSE_GARBAGE", "ten");
		let err = env_parse::<u32>("ACTIONGUARD_TEST_ENV_PARSE_GARBAGE").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
		std::env::remove_var("ACTIONGUARD_TEST_ENV_PARSE_GARBAGE");
	}

	#[test]
	fn env_list_splits_and_trims() {
		std::env::set_var("ACTIONGUARD_TEST_ENV_LIST", " a.dart, ,b.dart ");
		assert_eq!(
			env_list("ACTIONGUARD_TEST_ENV_LIST"),
			Some(vec!["a.dart".to_string(), "b.dart".to_string()])
		);
		std::env::remove_var("ACTIONGUARD_TEST_ENV_LIST");
	}
}
