// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process keyed mutexes.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand.
///
/// Entries nobody holds or waits on are pruned on the next acquisition.
pub struct KeyedLocks<K> {
	locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
	pub fn new() -> Self {
		Self {
			locks: Mutex::new(HashMap::new()),
		}
	}

	pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
			locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
			locks
				.entry(key.clone())
				.or_insert_with(|| Arc::new(AsyncMutex::new(())))
				.clone()
		};
		lock.lock_owned().await
	}

	pub fn len(&self) -> usize {
		self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::time::Duration;

	#[tokio::test]
	async fn same_key_is_serialized() {
		let locks = Arc::new(KeyedLocks::<String>::new());
		let inside = Arc::new(AtomicU32::new(0));
		let max_inside = Arc::new(AtomicU32::new(0));

		let mut handles = Vec::new();
		for _ in 0..8 {
			let locks = locks.clone();
			let inside = inside.clone();
			let max_inside = max_inside.clone();
			handles.push(tokio::spawn(async move {
				let _guard = locks.lock(&"checkout_submit".to_string()).await;
				let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
				max_inside.fetch_max(now, Ordering::SeqCst);
				tokio::time::sleep(Duration::from_millis(2)).await;
				inside.fetch_sub(1, Ordering::SeqCst);
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		assert_eq!(max_inside.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn different_keys_do_not_block() {
		let locks = KeyedLocks::<u32>::new();
		let _a = locks.lock(&1).await;
		let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&2)).await;
		assert!(b.is_ok());
	}

	#[tokio::test]
	async fn released_entries_are_pruned() {
		let locks = KeyedLocks::<u32>::new();
		{
			let _a = locks.lock(&1).await;
		}
		let _b = locks.lock(&2).await;
		assert_eq!(locks.len(), 1);
	}
}
