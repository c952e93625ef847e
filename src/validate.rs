//! Defense-in-depth input validators, applied by the service layer regardless of upstream
//! validation.

// std
use std::sync::LazyLock;
// crates.io
use regex::Regex;
// self
use crate::{Error, Result, model::Category};

static PLUGIN_ID_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{2,62}$").expect("static regex is valid"));

/// Validates a plugin id against the slug pattern `^[a-z][a-z0-9_-]{2,62}$`.
pub fn validate_plugin_id(id: &str) -> Result<()> {
	if PLUGIN_ID_RE.is_match(id) {
		Ok(())
	} else {
		Err(Error::Validation {
			field: "plugin_id",
			reason: format!("'{id}' must match ^[a-z][a-z0-9_-]{{2,62}}$."),
		})
	}
}

/// Validates that `name` is a non-empty, non-whitespace source name.
pub fn validate_source_name(name: &str) -> Result<()> {
	if name.trim().is_empty() {
		Err(Error::Validation { field: "source", reason: "Source name must not be empty.".into() })
	} else {
		Ok(())
	}
}

/// Validates a category string, returning the resolved [`Category`].
///
/// Unlike [`Category::parse_lenient`]'s permissive fallback to `misc` (used when loading
/// artifacts authored elsewhere), a category supplied directly by a caller as a filter must
/// name a real category or be rejected outright.
pub fn validate_category(raw: &str) -> Result<Category> {
	Category::parse_strict(raw)
		.ok_or_else(|| Error::Validation { field: "category", reason: format!("Unknown category '{raw}'.") })
}

/// Validates a SemVer version string.
pub fn validate_version(raw: &str) -> Result<semver::Version> {
	semver::Version::parse(raw).map_err(Error::from)
}

/// Validates an optional SemVer constraint string (e.g. `min_host_version`).
pub fn validate_version_req(raw: &str) -> Result<semver::VersionReq> {
	semver::VersionReq::parse(raw).map_err(Error::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plugin_id_rejects_short_and_uppercase() {
		assert!(validate_plugin_id("ab").is_err());
		assert!(validate_plugin_id("SSH-weak").is_err());
		assert!(validate_plugin_id("ssh-weak").is_ok());
	}

	#[test]
	fn category_rejects_unknown() {
		assert!(validate_category("ssh").is_ok());
		assert!(validate_category("bogus").is_err());
	}
}
