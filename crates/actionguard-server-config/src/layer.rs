// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, GeminiConfigLayer, GithubConfigLayer, LoggingConfigLayer,
	PipelineConfigLayer,
};

/// One source's view of the configuration. Absent sections and fields defer
/// to lower-precedence sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub github: Option<GithubConfigLayer>,
	#[serde(default)]
	pub gemini: Option<GeminiConfigLayer>,
	#[serde(default)]
	pub pipeline: Option<PipelineConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(other)) => merge(existing, other),
		(None, Some(other)) => *base = Some(other),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.github, other.github, GithubConfigLayer::merge);
		merge_section(&mut self.gemini, other.gemini, GeminiConfigLayer::merge);
		merge_section(&mut self.pipeline, other.pipeline, PipelineConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}
