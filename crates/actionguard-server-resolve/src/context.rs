// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

/// Cooperative stop signal checked between batch items.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
	inner: Arc<Inner>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.inner.cancelled.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once [`cancel`](Self::cancel) has been called.
	pub async fn cancelled(&self) {
		// Registered before the flag check so a concurrent cancel is not missed.
		let notified = self.inner.notify.notified();
		if self.is_cancelled() {
			return;
		}
		notified.await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn cancelled_resolves_after_cancel() {
		let token = CancellationToken::new();
		let waiter = {
			let token = token.clone();
			tokio::spawn(async move { token.cancelled().await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!token.is_cancelled());

		token.cancel();
		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.unwrap()
			.unwrap();
		assert!(token.is_cancelled());
	}

	#[tokio::test]
	async fn cancelled_returns_immediately_when_already_cancelled() {
		let token = CancellationToken::new();
		token.cancel();
		tokio::time::timeout(Duration::from_millis(100), token.cancelled())
			.await
			.unwrap();
	}
}
