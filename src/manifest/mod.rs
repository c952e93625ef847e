//! Installed-plugin manifest (`registry.json`): the local JSON record of what is installed.
//!
//! A parsed struct held behind a lock, reloaded by re-parsing the whole file on demand rather
//! than patched incrementally, written back atomically via a temp-file-plus-rename.

pub mod watcher;

// std
use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::RwLock,
};
// crates.io
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// self
use crate::{
	Error, Result,
	model::{Category, PluginType, Severity, YamlPlugin},
	verify::Checksum,
};

const MANIFEST_SCHEMA_VERSION: &str = "1.0";

/// A single installed plugin's record inside `registry.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
	/// Plugin slug.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Installed version.
	pub version: semver::Version,
	/// Plugin kind.
	#[serde(rename = "type")]
	pub plugin_type: PluginType,
	/// Author attribution.
	pub author: String,
	/// Checksum recorded at install time; the durable integrity commitment used by `verify`.
	pub checksum: Checksum,
	/// URL the artifact was downloaded from.
	pub download_url: url::Url,
	/// When this plugin was installed.
	pub installed_at: DateTime<Utc>,
	/// When this plugin was last successfully verified, if ever.
	#[serde(default)]
	pub last_verified: Option<DateTime<Utc>>,
	/// Path to the artifact, relative to the cache root (`<id>/<version>/plugin.yaml`).
	///
	/// Stored relative, resolved against the cache root at read time, never absolute.
	pub path: PathBuf,
	/// Classification tags, including category strings used by uninstall-by-category filtering.
	#[serde(default)]
	pub tags: std::collections::HashSet<String>,
	/// Severity rating.
	pub severity: Severity,
}
impl ManifestEntry {
	/// Constructs a manifest entry from a freshly cached [`YamlPlugin`] and its download
	/// provenance, stamping `installed_at = now`.
	pub fn from_plugin(
		plugin: &YamlPlugin,
		checksum: Checksum,
		download_url: url::Url,
		categories: &[Category],
	) -> Self {
		let mut tags = plugin.tags.clone();

		tags.extend(categories.iter().map(|category| category.as_str().to_string()));

		Self {
			id: plugin.id.clone(),
			name: plugin.name.clone(),
			version: plugin.version.clone(),
			plugin_type: plugin.plugin_type,
			author: plugin.author.clone(),
			checksum,
			download_url,
			installed_at: Utc::now(),
			last_verified: None,
			path: PathBuf::from(&plugin.id).join(plugin.version.to_string()).join("plugin.yaml"),
			tags,
			severity: plugin.severity,
		}
	}

	/// Constructs a manifest entry from a [`crate::cache::CacheEntry`] just written to the cache
	/// and the remote manifest entry it was resolved from. `CacheEntry` carries identity and
	/// download provenance but not a full parsed [`crate::model::YamlPlugin`], so `type` defaults
	/// to [`PluginType::Evaluation`] and `severity` to [`Severity::Medium`]; `tags` is seeded from
	/// `categories` alone. Used by [`super::Service::install`] and [`super::Service::update`],
	/// which resolve a plugin from a source's remote manifest rather than a parsed artifact.
	pub fn from_cache_entry(entry: &crate::cache::CacheEntry, author: &str, categories: &[Category]) -> Self {
		Self {
			id: entry.id.clone(),
			name: entry.name.clone(),
			version: entry.version.clone(),
			plugin_type: PluginType::default(),
			author: author.to_string(),
			checksum: entry.checksum.clone(),
			download_url: entry.download_url.clone(),
			installed_at: Utc::now(),
			last_verified: None,
			path: PathBuf::from(&entry.id).join(entry.version.to_string()).join("plugin.yaml"),
			tags: categories.iter().map(|category| category.as_str().to_string()).collect(),
			severity: Severity::default(),
		}
	}

	/// Whether `category` is one of this entry's tags.
	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.iter().any(|existing| existing.eq_ignore_ascii_case(tag))
	}
}

/// The on-disk schema of `registry.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ManifestDocument {
	version: String,
	last_updated: DateTime<Utc>,
	plugins: HashMap<String, ManifestEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	registry_url: Option<String>,
}
impl Default for ManifestDocument {
	fn default() -> Self {
		Self {
			version: MANIFEST_SCHEMA_VERSION.to_string(),
			last_updated: Utc::now(),
			plugins: HashMap::new(),
			registry_url: None,
		}
	}
}

/// Owns the installed-plugin JSON file at a fixed path, lazily loaded and reloadable after
/// external edits (e.g. from the [`watcher::ManifestWatcher`]).
///
/// Writes are not concurrency-safe across processes; within a process, a single writer is
/// assumed (the service orchestrator).
#[derive(Debug)]
pub struct Manifest {
	path: PathBuf,
	document: RwLock<Option<ManifestDocument>>,
}
impl Manifest {
	/// Creates a manifest manager for the file at `path`, creating its parent directory if
	/// absent. The file itself is not read until first access.
	pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();

		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		Ok(Self { path, document: RwLock::new(None) })
	}

	/// The manifest file path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads the parsed document, synthesizing an empty one if the file does not yet exist.
	/// Subsequent calls return the already-loaded document without re-reading the file.
	pub async fn load(&self) -> Result<()> {
		if self.document.read().expect("manifest lock poisoned").is_some() {
			return Ok(());
		}

		self.reload().await
	}

	/// Forces a re-parse of the file from disk, synthesizing an empty document if absent.
	pub async fn reload(&self) -> Result<()> {
		let document = match tokio::fs::read_to_string(&self.path).await {
			Ok(contents) => serde_json::from_str(&contents)?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => ManifestDocument::default(),
			Err(err) => return Err(Error::from(err)),
		};

		*self.document.write().expect("manifest lock poisoned") = Some(document);

		Ok(())
	}

	/// Stamps `last_updated` and writes the document as pretty-printed JSON.
	///
	/// Writes to a sibling temp file first, then renames it into place, so a concurrent reader
	/// (or the watcher) never observes a partially written file.
	pub async fn save(&self) -> Result<()> {
		self.load().await?;

		let serialized = {
			let mut guard = self.document.write().expect("manifest lock poisoned");
			let document = guard.as_mut().expect("loaded by self.load() above");

			document.last_updated = Utc::now();

			serde_json::to_string_pretty(document)?
		};

		let mut tmp_path = self.path.clone().into_os_string();
		tmp_path.push(".tmp");
		let tmp_path = PathBuf::from(tmp_path);

		tokio::fs::write(&tmp_path, serialized).await?;
		tokio::fs::rename(&tmp_path, &self.path).await?;

		Ok(())
	}

	/// Inserts or replaces the entry for `entry.id`. Does not persist; call [`Manifest::save`].
	pub async fn add(&self, entry: ManifestEntry) -> Result<()> {
		self.load().await?;

		let mut guard = self.document.write().expect("manifest lock poisoned");
		let document = guard.as_mut().expect("loaded by self.load() above");

		document.plugins.insert(entry.id.clone(), entry);

		Ok(())
	}

	/// Removes the entry for `id`. Fails if absent. Does not persist.
	pub async fn remove(&self, id: &str) -> Result<()> {
		self.load().await?;

		let mut guard = self.document.write().expect("manifest lock poisoned");
		let document = guard.as_mut().expect("loaded by self.load() above");

		if document.plugins.remove(id).is_none() {
			return Err(Error::PluginNotFound { id: id.to_string() });
		}

		Ok(())
	}

	/// Replaces the entry for `id` via `mutate`. Fails if absent. Does not persist.
	pub async fn update(&self, id: &str, mutate: impl FnOnce(&mut ManifestEntry)) -> Result<()> {
		self.load().await?;

		let mut guard = self.document.write().expect("manifest lock poisoned");
		let document = guard.as_mut().expect("loaded by self.load() above");
		let entry =
			document.plugins.get_mut(id).ok_or_else(|| Error::PluginNotFound { id: id.to_string() })?;

		mutate(entry);

		Ok(())
	}

	/// Looks up a single installed entry by id.
	pub async fn get(&self, id: &str) -> Result<Option<ManifestEntry>> {
		self.load().await?;

		Ok(self.document.read().expect("manifest lock poisoned").as_ref().expect("loaded above").plugins.get(id).cloned())
	}

	/// Snapshot of every installed entry.
	pub async fn list(&self) -> Result<Vec<ManifestEntry>> {
		self.load().await?;

		Ok(self
			.document
			.read()
			.expect("manifest lock poisoned")
			.as_ref()
			.expect("loaded above")
			.plugins
			.values()
			.cloned()
			.collect())
	}

	/// Removes every installed entry. Does not persist.
	pub async fn clear(&self) -> Result<()> {
		self.load().await?;

		self.document.write().expect("manifest lock poisoned").as_mut().expect("loaded above").plugins.clear();

		Ok(())
	}

	/// Number of installed entries.
	pub async fn count(&self) -> Result<usize> {
		self.load().await?;

		Ok(self.document.read().expect("manifest lock poisoned").as_ref().expect("loaded above").plugins.len())
	}

	/// Sets the registry URL recorded in the manifest. Does not persist.
	pub async fn set_registry_url(&self, url: Option<String>) -> Result<()> {
		self.load().await?;

		self.document.write().expect("manifest lock poisoned").as_mut().expect("loaded above").registry_url = url;

		Ok(())
	}

	/// The currently recorded registry URL, if any.
	pub async fn get_registry_url(&self) -> Result<Option<String>> {
		self.load().await?;

		Ok(self
			.document
			.read()
			.expect("manifest lock poisoned")
			.as_ref()
			.expect("loaded above")
			.registry_url
			.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	fn entry(id: &str) -> ManifestEntry {
		ManifestEntry {
			id: id.into(),
			name: id.into(),
			version: semver::Version::new(1, 0, 0),
			plugin_type: PluginType::Evaluation,
			author: "scanhub".into(),
			checksum: Checksum::from_sha256_hex("a".repeat(64)),
			download_url: url::Url::parse("https://example.test/plugin.yaml").unwrap(),
			installed_at: Utc::now(),
			last_verified: None,
			path: PathBuf::from(id).join("1.0.0").join("plugin.yaml"),
			tags: HashSet::from(["ssh".to_string()]),
			severity: Severity::Medium,
		}
	}

	#[tokio::test]
	async fn missing_file_synthesizes_empty_manifest() {
		let dir = tempfile::tempdir().unwrap();
		let manifest = Manifest::new(dir.path().join("registry.json")).await.unwrap();

		assert_eq!(manifest.count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn add_save_reload_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let manifest = Manifest::new(dir.path().join("registry.json")).await.unwrap();

		manifest.add(entry("ssh-weak")).await.unwrap();
		manifest.save().await.unwrap();

		let reopened = Manifest::new(dir.path().join("registry.json")).await.unwrap();

		assert_eq!(reopened.count().await.unwrap(), 1);
		assert!(reopened.get("ssh-weak").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn remove_fails_when_absent() {
		let dir = tempfile::tempdir().unwrap();
		let manifest = Manifest::new(dir.path().join("registry.json")).await.unwrap();

		assert!(manifest.remove("nope").await.is_err());
	}

	#[tokio::test]
	async fn reload_picks_up_external_edit() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("registry.json");
		let manifest = Manifest::new(&path).await.unwrap();

		manifest.load().await.unwrap();

		let mut other = Manifest::new(&path).await.unwrap();

		other.add(entry("ssh-weak")).await.unwrap();
		other.save().await.unwrap();

		assert_eq!(manifest.count().await.unwrap(), 0);

		manifest.reload().await.unwrap();

		assert_eq!(manifest.count().await.unwrap(), 1);
	}
}
