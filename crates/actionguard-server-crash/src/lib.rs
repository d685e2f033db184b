// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash persistence and component reconciliation for ActionGuard.
//!
//! This crate provides:
//!
//! - SQLite pool creation and idempotent migrations
//! - Repository layer for crashes, components, errors and version stats
//! - The reconciler that links resolved crashes to components
//! - Operator actions (status overrides, archiving, recompute)

pub mod error;
pub mod locks;
pub mod pool;
pub mod reconciler;
pub mod repository;

pub use error::{CrashServerError, Result};
pub use locks::KeyedLocks;
pub use pool::{create_pool, run_migrations};
pub use reconciler::{ReconcileOutcome, RecomputeSummary, Reconciler, NO_ACTION_ID_FOUND};
pub use repository::{AppliedCrash, CrashApplication, CrashRepository, SqliteCrashRepository};
