// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Common configuration primitives for ActionGuard.
//!
//! - [`Secret<T>`]: A wrapper type that prevents accidental logging of
//!   sensitive values such as the source host token or model API key
//! - [`load_secret_env`]: Helper for loading secrets from environment variables
//!   with `*_FILE` support

pub mod env;
pub mod secret;

pub use env::{load_secret_env, SecretEnvError};
pub use secret::{Secret, SecretString, REDACTED};
