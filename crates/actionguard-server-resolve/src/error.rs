// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use actionguard_crash_core::{CrashError, CrashId, SourceHostError};
use actionguard_server_crash::CrashServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("crash not found: {0}")]
	CrashNotFound(CrashId),

	#[error("store error: {0}")]
	Store(#[from] CrashServerError),

	#[error("source host error: {0}")]
	Source(#[from] SourceHostError),

	#[error("invalid pipeline configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Core(#[from] CrashError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
