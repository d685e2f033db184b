// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading from environment variables.

use std::path::PathBuf;

use thiserror::Error;

use crate::secret::{Secret, SecretString};

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file {path} (from {var}_FILE): {source}")]
	FileRead {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("both {0} and {0}_FILE are set; use only one")]
	Ambiguous(String),
}

/// Load a secret from `NAME` or from the file named by `NAME_FILE`.
///
/// Returns `Ok(None)` when neither is set or the value is empty. File contents
/// are trimmed of trailing newlines.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let direct = std::env::var(name).ok().filter(|v| !v.is_empty());
	let file_var = format!("{name}_FILE");
	let file = std::env::var(&file_var).ok().filter(|v| !v.is_empty());

	match (direct, file) {
		(Some(_), Some(_)) => Err(SecretEnvError::Ambiguous(name.to_string())),
		(Some(value), None) => Ok(Some(Secret::new(value))),
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let contents = std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
				var: name.to_string(),
				path: path.clone(),
				source,
			})?;
			let trimmed = contents.trim_end_matches(['\r', '\n']).to_string();
			if trimmed.is_empty() {
				Ok(None)
			} else {
				Ok(Some(Secret::new(trimmed)))
			}
		}
		(None, None) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn loads_from_file_variant() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "token-from-file").unwrap();

		let name = "ACTIONGUARD_TEST_SECRET_FILE_ONLY";
		std::env::set_var(format!("{name}_FILE"), file.path());
		let secret = load_secret_env(name).unwrap().unwrap();
		std::env::remove_var(format!("{name}_FILE"));

		assert_eq!(secret.expose(), "token-from-file");
	}

	#[test]
	fn missing_is_none() {
		assert!(load_secret_env("ACTIONGUARD_TEST_SECRET_NEVER_SET")
			.unwrap()
			.is_none());
	}

	#[test]
	fn both_set_is_ambiguous() {
		let name = "ACTIONGUARD_TEST_SECRET_BOTH";
		std::env::set_var(name, "a");
		std::env::set_var(format!("{name}_FILE"), "/nonexistent");
		let result = load_secret_env(name);
		std::env::remove_var(name);
		std::env::remove_var(format!("{name}_FILE"));

		assert!(matches!(result, Err(SecretEnvError::Ambiguous(_))));
	}
}
