// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for sensitive configuration values.

use std::fmt;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

/// Placeholder printed instead of secret values.
pub const REDACTED: &str = "[REDACTED]";

/// A value that never appears in `Debug` or `Display` output and is zeroed on drop.
#[derive(Clone)]
pub struct Secret<T: Zeroize>(T);

pub type SecretString = Secret<String>;

impl<T: Zeroize> Secret<T> {
	pub fn new(value: T) -> Self {
		Self(value)
	}

	/// Access the wrapped value. Keep the borrow short and never log it.
	pub fn expose(&self) -> &T {
		&self.0
	}
}

impl<T: Zeroize> Drop for Secret<T> {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T: Zeroize> fmt::Display for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		T::deserialize(deserializer).map(Secret::new)
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Secret::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Secret::new(value.to_string())
	}
}
