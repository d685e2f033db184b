// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash resolution pipeline for ActionGuard.
//!
//! Given a stored crash, the pipeline locates the crash site in the stack
//! trace, fetches the surrounding source from the repository host, extracts
//! the guarded action identifier and hands the result to the reconciler.
//!
//! - [`SourceFetcher`]: path normalization, windowing and search fallback
//! - [`ExtractorChain`]: pattern matching with an optional model fallback
//! - [`Orchestrator`]: the per-crash pipeline
//! - [`BatchRunner`]: bounded, cancellable processing of unlinked crashes

pub mod batch;
pub mod context;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;

#[cfg(test)]
mod testing;

pub use batch::{BatchConfig, BatchRunner, BatchSummary};
pub use context::CancellationToken;
pub use error::{ResolveError, Result};
pub use extractor::{
	ExtractionContext, ExtractionStrategy, ExtractorChain, GenerativeStrategy, PatternStrategy,
	DEFAULT_MODEL_TIMEOUT,
};
pub use fetcher::{FetchStrategy, FetchedSource, FetcherConfig, SourceFetcher};
pub use orchestrator::{
	CrashLink, CrashOutcome, LocationSource, Orchestrator, PipelineConfig, SyntheticMarker,
	MESSAGE_SEARCH_CHARS, SOURCE_FETCH_FAILED, STACK_TRACE_PARSING_FAILED,
};
