//! Remote manifest schema served by a [`crate::model::PluginSource`].

use serde::{Deserialize, Serialize};

use crate::{model::Category, verify::Checksum};

/// A single entry in a [`RemoteManifest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteManifestEntry {
	/// Plugin slug.
	pub id: String,
	/// Display name.
	pub name: String,
	/// SemVer version.
	pub version: semver::Version,
	/// Human-readable description.
	#[serde(default)]
	pub description: String,
	/// Author attribution.
	pub author: String,
	/// Categories this plugin belongs to, for bulk category selection.
	#[serde(default)]
	pub categories: Vec<Category>,
	/// URL to fetch the artifact bytes from.
	pub url: url::Url,
	/// Expected checksum of the artifact bytes.
	pub checksum: Checksum,
	/// Expected size in bytes, informational.
	#[serde(default)]
	pub size: u64,
}
impl RemoteManifestEntry {
	/// Whether `category` is one of this entry's declared categories.
	pub fn has_category(&self, category: Category) -> bool {
		self.categories.contains(&category)
	}
}

/// The YAML index served by a source enumerating its available artifacts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteManifest {
	/// Schema version of the manifest document.
	pub version: String,
	/// Available plugin entries.
	#[serde(default)]
	pub plugins: Vec<RemoteManifestEntry>,
}
impl RemoteManifest {
	/// Finds an entry by id, case-insensitively.
	pub fn find(&self, id: &str) -> Option<&RemoteManifestEntry> {
		self.plugins.iter().find(|entry| entry.id.eq_ignore_ascii_case(id))
	}

	/// Finds an entry by id and exact version, case-insensitively on id.
	pub fn find_version(&self, id: &str, version: &semver::Version) -> Option<&RemoteManifestEntry> {
		self.plugins.iter().find(|entry| entry.id.eq_ignore_ascii_case(id) && &entry.version == version)
	}
}
