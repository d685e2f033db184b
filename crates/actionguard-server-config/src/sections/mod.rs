// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a partial `*ConfigLayer` for merging and
//! a resolved runtime type produced by `finalize`.

mod database;
mod gemini;
mod github;
mod logging;
mod pipeline;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use gemini::{GeminiSettings, GeminiConfigLayer};
pub use github::{GithubSettings, GithubConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use pipeline::{PipelineSettings, PipelineConfigLayer, SyntheticMarkerSettings};
