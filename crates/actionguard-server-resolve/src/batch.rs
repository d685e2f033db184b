// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch processing of unlinked crashes.

use std::sync::Arc;
use std::time::Duration;

use actionguard_crash_core::CrashId;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::context::CancellationToken;
use crate::error::Result;
use crate::orchestrator::{CrashOutcome, Orchestrator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
	/// Maximum crashes selected per run.
	pub batch_size: u32,
	/// Pause before dispatching each item after the first.
	pub delay: Duration,
	/// Crashes processed at the same time.
	pub concurrency: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			batch_size: 10,
			delay: Duration::from_secs(1),
			concurrency: 1,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
	pub selected: usize,
	pub linked: usize,
	pub unlinked: usize,
	pub failures: Vec<(CrashId, String)>,
	/// True when the run stopped early on cancellation.
	pub cancelled: bool,
	pub outcomes: Vec<CrashOutcome>,
}

impl BatchSummary {
	pub fn processed(&self) -> usize {
		self.linked + self.unlinked + self.failures.len()
	}
}

pub struct BatchRunner {
	orchestrator: Arc<Orchestrator>,
	config: BatchConfig,
}

impl BatchRunner {
	pub fn new(orchestrator: Arc<Orchestrator>, config: BatchConfig) -> Self {
		Self {
			orchestrator,
			config,
		}
	}

	/// Process the oldest unlinked crashes that carry a stack trace.
	///
	/// A failing crash is recorded in the summary and the batch moves on.
	/// Cancellation is checked before each dispatch; crashes already
	/// dispatched run to completion.
	#[instrument(skip(self, cancel), fields(batch_size = self.config.batch_size))]
	pub async fn run(&self, cancel: &CancellationToken) -> Result<BatchSummary> {
		let crashes = self
			.orchestrator
			.reconciler()
			.repository()
			.list_unlinked_crashes(self.config.batch_size)
			.await?;

		let mut summary = BatchSummary {
			selected: crashes.len(),
			..Default::default()
		};
		if crashes.is_empty() {
			info!("no unlinked crashes");
			return Ok(summary);
		}
		info!(count = crashes.len(), "processing unlinked crashes");

		let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
		let mut tasks = JoinSet::new();

		for (index, crash) in crashes.into_iter().enumerate() {
			let Ok(permit) = semaphore.clone().acquire_owned().await else {
				break;
			};
			if index > 0 && !self.config.delay.is_zero() {
				tokio::time::sleep(self.config.delay).await;
			}
			if cancel.is_cancelled() {
				info!(remaining = summary.selected - index, "batch cancelled");
				summary.cancelled = true;
				break;
			}

			let orchestrator = self.orchestrator.clone();
			tasks.spawn(async move {
				let _permit = permit;
				let result = orchestrator.process(&crash).await;
				(crash.id, result)
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((_, Ok(outcome))) => {
					if outcome.is_linked() {
						summary.linked += 1;
					} else {
						summary.unlinked += 1;
					}
					summary.outcomes.push(outcome);
				}
				Ok((crash_id, Err(e))) => {
					error!(crash_id = %crash_id, error = %e, "crash processing failed");
					summary.failures.push((crash_id, e.to_string()));
				}
				Err(e) => {
					warn!(error = %e, "crash processing task aborted");
				}
			}
		}

		info!(
			linked = summary.linked,
			unlinked = summary.unlinked,
			failed = summary.failures.len(),
			cancelled = summary.cancelled,
			"batch complete"
		);
		Ok(summary)
	}
}
