// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Construction of pipeline services from resolved configuration.

use std::sync::Arc;
use std::time::Duration;

use actionguard_crash_core::StackResolverConfig;
use actionguard_server_config::{
	GeminiSettings, GithubSettings, PipelineSettings, ServerConfig, SyntheticMarkerSettings,
};
use actionguard_server_crash::{create_pool, run_migrations, Reconciler, SqliteCrashRepository};
use actionguard_server_github::{GithubClient, GithubConfig};
use actionguard_server_llm_gemini::{GeminiClient, GeminiConfig};
use actionguard_server_resolve::{
	BatchConfig, BatchRunner, ExtractorChain, FetcherConfig, Orchestrator, PipelineConfig,
	SyntheticMarker,
};
use anyhow::{Context, Result};
use tracing::info;

pub fn pipeline_config(settings: &PipelineSettings) -> PipelineConfig {
	let mut stack = StackResolverConfig {
		extension: settings.extension.clone(),
		..StackResolverConfig::default()
	};
	if let Some(deny_list) = &settings.deny_list {
		stack.deny_list = deny_list.clone();
	}

	PipelineConfig {
		stack,
		fetcher: FetcherConfig {
			source_root: settings.source_root.clone(),
			test_root: settings.test_root.clone(),
			context_lines: settings.context_lines,
			wide_context_lines: settings.wide_context_lines,
		},
		message_search: settings.message_search,
		synthetic_marker: settings.synthetic_marker.as_ref().map(synthetic_marker),
	}
}

fn synthetic_marker(settings: &SyntheticMarkerSettings) -> SyntheticMarker {
	SyntheticMarker {
		marker: settings.marker.clone(),
		file_path: settings.file_path.clone(),
		line: settings.line,
		column: settings.column,
		function_name: settings.function_name.clone(),
	}
}

pub fn batch_config(settings: &PipelineSettings) -> BatchConfig {
	BatchConfig {
		batch_size: settings.batch_size,
		delay: Duration::from_millis(settings.delay_ms),
		concurrency: settings.concurrency,
	}
}

pub fn github_client(settings: &GithubSettings) -> Result<GithubClient> {
	GithubConfig::parse_base_url(&settings.base_url).context("invalid GitHub base URL")?;
	let config = GithubConfig::with_secret(settings.token.clone(), &settings.owner, &settings.repo)
		.context("invalid GitHub configuration")?
		.with_branch(&settings.branch)
		.with_base_url(&settings.base_url)
		.with_timeout(Duration::from_secs(settings.timeout_secs));
	GithubClient::new(config).context("failed to build GitHub client")
}

pub fn extractor(gemini: Option<&GeminiSettings>) -> Result<ExtractorChain> {
	let Some(settings) = gemini else {
		info!("no model configured, using pattern extraction only");
		return Ok(ExtractorChain::pattern_only());
	};

	let config = GeminiConfig::with_secret(settings.api_key.clone())
		.with_model(&settings.model)
		.with_base_url(&settings.base_url)
		.with_timeout(Duration::from_secs(settings.timeout_secs));
	let budget = config.extraction_budget();
	let client = GeminiClient::new(config).context("failed to build Gemini client")?;
	info!(model = %settings.model, budget_secs = budget.as_secs(), "model fallback enabled");
	Ok(ExtractorChain::with_model(Arc::new(client), budget))
}

/// Open the database and bring the schema up to date.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<SqliteCrashRepository>> {
	let pool = create_pool(&config.database.url)
		.await
		.with_context(|| format!("failed to open database {}", config.database.url))?;
	run_migrations(&pool)
		.await
		.context("failed to run migrations")?;
	Ok(Arc::new(SqliteCrashRepository::new(pool)))
}

pub fn orchestrator(config: &ServerConfig, reconciler: Arc<Reconciler>) -> Result<Orchestrator> {
	let github = config.github.as_ref().context(
		"source host not configured: set GITHUB_TOKEN, ACTIONGUARD_GITHUB_OWNER and ACTIONGUARD_GITHUB_REPO",
	)?;
	let host = Arc::new(github_client(github)?);
	let extractor = extractor(config.gemini.as_ref())?;
	Orchestrator::new(host, extractor, reconciler, pipeline_config(&config.pipeline))
		.context("invalid pipeline configuration")
}

pub fn batch_runner(config: &ServerConfig, reconciler: Arc<Reconciler>) -> Result<BatchRunner> {
	let orchestrator = orchestrator(config, reconciler)?;
	Ok(BatchRunner::new(
		Arc::new(orchestrator),
		batch_config(&config.pipeline),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use actionguard_common_config::SecretString;
	use actionguard_server_config::PipelineConfigLayer;

	#[test]
	fn pipeline_settings_map_onto_pipeline_config() {
		let settings = PipelineConfigLayer {
			extension: Some("js".to_string()),
			deny_list: Some(vec!["react-dom.js".to_string()]),
			source_root: Some("src".to_string()),
			context_lines: Some(5),
			synthetic_marker_enabled: Some(false),
			..Default::default()
		}
		.finalize()
		.unwrap();

		let config = pipeline_config(&settings);
		assert_eq!(config.stack.extension, "js");
		assert_eq!(config.stack.deny_list, vec!["react-dom.js".to_string()]);
		assert_eq!(config.fetcher.source_root, "src/");
		assert_eq!(config.fetcher.context_lines, 5);
		assert!(config.synthetic_marker.is_none());
	}

	#[test]
	fn default_settings_keep_builtin_deny_list_and_marker() {
		let config = pipeline_config(&PipelineSettings::default());
		assert_eq!(config, PipelineConfig::default());
	}

	#[test]
	fn batch_settings_map_onto_batch_config() {
		let config = batch_config(&PipelineSettings::default());
		assert_eq!(config, BatchConfig::default());
	}

	#[test]
	fn no_model_means_pattern_only() {
		let chain = extractor(None).unwrap();
		assert_eq!(chain.strategy_names(), vec!["pattern"]);
	}

	#[test]
	fn model_settings_add_generative_fallback() {
		let settings = GeminiSettings {
			api_key: SecretString::new("key".to_string()),
			model: "gemini-1.5-flash".to_string(),
			base_url: "http://127.0.0.1:9".to_string(),
			timeout_secs: 5,
		};
		let chain = extractor(Some(&settings)).unwrap();
		assert_eq!(chain.strategy_names(), vec!["pattern", "generative"]);
	}

	#[test]
	fn invalid_github_base_url_is_rejected() {
		let settings = GithubSettings {
			token: SecretString::new("ghp_test".to_string()),
			owner: "acme".to_string(),
			repo: "shop".to_string(),
			branch: "main".to_string(),
			base_url: "not a url".to_string(),
			timeout_secs: 5,
		};
		assert!(github_client(&settings).is_err());
	}

	#[tokio::test]
	async fn orchestrator_requires_source_host() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = ServerConfig::default();
		config.database.url = format!("sqlite:{}", dir.path().join("crashes.db").display());

		let repository = open_store(&config).await.unwrap();
		let reconciler = Arc::new(Reconciler::new(repository));
		let err = orchestrator(&config, reconciler).err().unwrap();
		assert!(err.to_string().contains("GITHUB_TOKEN"));
	}
}
