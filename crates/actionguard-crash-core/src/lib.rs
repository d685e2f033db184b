// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for ActionGuard crash resolution.
//!
//! This crate provides the shared vocabulary of the resolution pipeline:
//! crash reports, resolved crash locations, fetched code windows, action
//! extractions, and the durable component records that crashes attach to.
//! It also defines the collaborator traits implemented by the source host
//! and generative model clients.
//!
//! # Overview
//!
//! - [`StackResolver`] turns a raw stack trace into the first user-code
//!   [`CrashLocation`]
//! - [`CodeWindow`] renders file content around a target line
//! - [`ActionExtraction`] is the terminal judgment for one crash
//! - [`Component`], [`ComponentErrorRecord`] and [`VersionStat`] are the
//!   records reconciliation maintains

pub mod code;
pub mod component;
pub mod error;
pub mod extraction;
pub mod model;
pub mod report;
pub mod source;
pub mod stack;
pub mod version;

pub use code::CodeWindow;
pub use component::{
	derive_status, Component, ComponentErrorRecord, ComponentStatus, VersionStat,
	DEFAULT_CRASH_THRESHOLD,
};
pub use error::{CrashError, Result};
pub use extraction::{is_placeholder_action_id, ActionExtraction, Confidence, ExtractionMethod};
pub use model::{ActionIdModel, ModelError, ModelExtractionRequest, ModelReply};
pub use report::{CrashReport, CrashResolution, StoredCrash};
pub use source::{SourceHost, SourceHostError};
pub use stack::{CrashLocation, StackResolver, StackResolverConfig, UNKNOWN};
pub use version::normalize_app_version;

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub Uuid);

		impl $name {
			pub fn new() -> Self {
				Self(Uuid::now_v7())
			}
		}

		impl Default for $name {
			fn default() -> Self {
				Self::new()
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
				Ok(Self(Uuid::parse_str(s)?))
			}
		}
	};
}

uuid_id!(
	/// Project the crash and its components belong to.
	ProjectId
);
uuid_id!(
	/// Opaque crash report id assigned at ingestion.
	CrashId
);
uuid_id!(
	/// Tracked component id.
	ComponentId
);
uuid_id!(
	/// Component error record id.
	ComponentErrorId
);

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn crash_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = CrashId(Uuid::from_bytes(uuid_bytes));
			let parsed: CrashId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn component_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = ComponentId(Uuid::from_bytes(uuid_bytes));
			let parsed: ComponentId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}
	}

	#[test]
	fn new_ids_are_time_ordered() {
		let a = CrashId::new();
		let b = CrashId::new();
		assert!(a <= b);
	}
}
