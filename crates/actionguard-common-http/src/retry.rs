// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for transient HTTP failures.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

/// Classifies errors as transient (worth retrying) or permanent.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		match self.status() {
			Some(status) => status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
			None => self.is_request(),
		}
	}
}

/// Backoff settings for [`retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	/// Randomize each delay between 50% and 100% of its computed value.
	pub jitter: bool,
	/// Statuses that callers treat as retryable when mapping responses.
	pub retryable_statuses: Vec<StatusCode>,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
			retryable_statuses: vec![
				StatusCode::TOO_MANY_REQUESTS,
				StatusCode::REQUEST_TIMEOUT,
				StatusCode::INTERNAL_SERVER_ERROR,
				StatusCode::BAD_GATEWAY,
				StatusCode::SERVICE_UNAVAILABLE,
				StatusCode::GATEWAY_TIMEOUT,
			],
		}
	}
}

impl RetryConfig {
	/// A config that never retries.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	/// Delay before the given retry (1-based).
	pub fn delay_for(&self, retry: u32) -> Duration {
		let capped = self.capped_delay(retry).as_secs_f64();
		let secs = if self.jitter {
			capped * (0.5 + fastrand::f64() * 0.5)
		} else {
			capped
		};
		Duration::from_secs_f64(secs)
	}

	/// Longest a full [`retry`] run can take when every attempt is cut off at
	/// `per_attempt`.
	pub fn budget(&self, per_attempt: Duration) -> Duration {
		let attempts = self.max_attempts.max(1);
		(1..attempts).fold(per_attempt * attempts, |total, retry| {
			total + self.capped_delay(retry)
		})
	}

	fn capped_delay(&self, retry: u32) -> Duration {
		let exp = self.backoff_factor.powi(retry.saturating_sub(1) as i32);
		let raw = self.base_delay.as_secs_f64() * exp;
		Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
	}
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
	E: RetryableError + std::fmt::Display,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let max_attempts = config.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(e) if attempt < max_attempts && e.is_retryable() => {
				let delay = config.delay_for(attempt);
				warn!(
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %e,
					"transient failure, retrying"
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
			Err(e) => {
				debug!(attempt, error = %e, "giving up");
				return Err(e);
			}
		}
	}
}
