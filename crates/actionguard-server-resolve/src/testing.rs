// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use actionguard_crash_core::{
	ActionIdModel, Confidence, ModelError, ModelExtractionRequest, ModelReply, SourceHost,
	SourceHostError,
};
use actionguard_server_crash::{run_migrations, SqliteCrashRepository};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// One request made against a [`FakeHost`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
	Fetch(String),
	Filename(String),
	Text(String),
}

#[derive(Default)]
pub struct FakeHost {
	pub files: HashMap<String, String>,
	pub by_filename: HashMap<String, Vec<String>>,
	pub by_text: HashMap<String, Vec<String>>,
	/// Paths whose fetch fails with a transport error.
	pub broken: Vec<String>,
	pub calls: Mutex<Vec<HostCall>>,
}

impl FakeHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file(mut self, path: &str, content: &str) -> Self {
		self.files.insert(path.to_string(), content.to_string());
		self
	}

	pub fn with_filename_hit(mut self, name: &str, path: &str) -> Self {
		self.by_filename
			.entry(name.to_string())
			.or_default()
			.push(path.to_string());
		self
	}

	pub fn with_text_hit(mut self, text: &str, path: &str) -> Self {
		self.by_text
			.entry(text.to_string())
			.or_default()
			.push(path.to_string());
		self
	}

	pub fn with_broken(mut self, path: &str) -> Self {
		self.broken.push(path.to_string());
		self
	}

	pub fn calls(&self) -> Vec<HostCall> {
		self.calls.lock().unwrap().clone()
	}

	pub fn fetched(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				HostCall::Fetch(path) => Some(path),
				_ => None,
			})
			.collect()
	}

	pub fn text_queries(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				HostCall::Text(text) => Some(text),
				_ => None,
			})
			.collect()
	}

	fn record(&self, call: HostCall) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl SourceHost for FakeHost {
	async fn fetch_file(&self, path: &str) -> Result<Option<String>, SourceHostError> {
		self.record(HostCall::Fetch(path.to_string()));
		if self.broken.iter().any(|p| p == path) {
			return Err(SourceHostError::Api {
				status: 502,
				message: "bad gateway".to_string(),
			});
		}
		Ok(self.files.get(path).cloned())
	}

	async fn search_by_filename(&self, file_name: &str) -> Result<Vec<String>, SourceHostError> {
		self.record(HostCall::Filename(file_name.to_string()));
		Ok(self.by_filename.get(file_name).cloned().unwrap_or_default())
	}

	async fn search_by_text(&self, text: &str) -> Result<Vec<String>, SourceHostError> {
		self.record(HostCall::Text(text.to_string()));
		Ok(self.by_text.get(text).cloned().unwrap_or_default())
	}
}

/// Model that returns a canned reply and counts calls.
pub struct FakeModel {
	pub reply: Result<ModelReply, String>,
	pub calls: AtomicU32,
}

impl FakeModel {
	pub fn replying(action_id: &str, confidence: Confidence) -> Arc<Self> {
		Arc::new(Self {
			reply: Ok(ModelReply {
				action_id: action_id.to_string(),
				component_id: Some("Checkout Button".to_string()),
				confidence,
				reasoning: "found in window".to_string(),
				found_at_line: Some(12),
				suggested_fix: Some("check cart before submit".to_string()),
			}),
			calls: AtomicU32::new(0),
		})
	}

	pub fn failing(message: &str) -> Arc<Self> {
		Arc::new(Self {
			reply: Err(message.to_string()),
			calls: AtomicU32::new(0),
		})
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ActionIdModel for FakeModel {
	fn name(&self) -> &str {
		"fake"
	}

	async fn extract_action_id(
		&self,
		_request: &ModelExtractionRequest,
	) -> Result<ModelReply, ModelError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.reply.clone().map_err(ModelError::Request)
	}
}

pub async fn create_test_repository() -> Arc<SqliteCrashRepository> {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);
	let pool: SqlitePool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");
	run_migrations(&pool).await.unwrap();
	Arc::new(SqliteCrashRepository::new(pool))
}
