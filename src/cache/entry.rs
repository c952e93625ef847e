//! [`CacheEntry`]: the on-disk record of a single cached `(id, version)` artifact.

// std
use std::path::PathBuf;
// crates.io
use chrono::{DateTime, Utc};
// self
use crate::verify::Checksum;

/// A resident cached artifact's location and provenance metadata.
///
/// `path` is always `<cache_root>/<id>/<version>/plugin.yaml`.
#[derive(Clone, Debug)]
pub struct CacheEntry {
	/// Plugin slug.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Cached version.
	pub version: semver::Version,
	/// Absolute path to `plugin.yaml` on disk.
	pub path: PathBuf,
	/// Checksum the artifact was verified against at write time.
	pub checksum: Checksum,
	/// URL the artifact bytes were fetched from.
	pub download_url: url::Url,
	/// When this entry was first written to the cache.
	pub cached_at: DateTime<Utc>,
	/// When this entry was last accessed or (re)written.
	pub last_used: DateTime<Utc>,
}
