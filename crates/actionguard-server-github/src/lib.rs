// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub source host for ActionGuard.
//!
//! Reads application source files through the repository contents API and
//! locates moved files through code search. [`GithubClient`] implements
//! [`actionguard_crash_core::SourceHost`].

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use actionguard_common_http::RetryConfig;
pub use client::GithubClient;
pub use config::GithubConfig;
pub use error::GithubError;
pub use types::{CodeSearchItem, CodeSearchResponse, FileContents};
