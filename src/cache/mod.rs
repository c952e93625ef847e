//! Content-addressed on-disk cache, owning the artifact tree and the [`Registry`] mirror.
//!
//! A struct owning durable state plus an in-memory index, exposing async methods over `&self`.
//! There is no TTL/ETag staleness state machine here: artifacts are addressed by `(id, version)`
//! and never go stale, so the on-disk tree and the `Registry` mirror *are* the cache's state.
//! Downloaded bytes are written verbatim and only decoded for validation, never re-encoded.

pub mod entry;

// std
use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::RwLock,
	time::Duration,
};
// crates.io
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;
// self
use crate::{
	Error, Result, cancel,
	model::YamlPlugin,
	registry::Registry,
	verify::Checksum,
};
pub use entry::CacheEntry;

/// Provenance metadata for a cached artifact that the [`Registry`]'s mirrored [`YamlPlugin`]
/// does not itself carry (the registry indexes the parsed artifact; the cache additionally
/// tracks what it was downloaded from and verified against).
#[derive(Clone, Debug)]
struct EntryMeta {
	checksum: Checksum,
	download_url: url::Url,
}

const ARTIFACT_FILE_NAME: &str = "plugin.yaml";

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<()> {
	use std::os::unix::fs::PermissionsExt;

	std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;

	Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<()> {
	Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<()> {
	use std::os::unix::fs::PermissionsExt;

	std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;

	Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<()> {
	Ok(())
}

/// Owns `<cache_root>/<plugin_id>/<version>/plugin.yaml` and the [`Registry`] mirror of what is
/// currently resident on disk.
#[derive(Debug)]
pub struct Cache {
	root: PathBuf,
	registry: Registry,
	entries: RwLock<HashMap<String, EntryMeta>>,
}
impl Cache {
	/// Creates `root` if absent and performs a best-effort initial [`Cache::load_from_disk`].
	pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();

		tokio::fs::create_dir_all(&root).await?;
		set_dir_permissions(&root)?;

		let cache = Self { root, registry: Registry::new(), entries: RwLock::new(HashMap::new()) };
		let token = CancellationToken::new();

		cache.load_from_disk(&token).await?;

		Ok(cache)
	}

	/// The cache root directory.
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn version_dir(&self, id: &str, version: &semver::Version) -> PathBuf {
		self.root.join(id).join(version.to_string())
	}

	fn plugin_dir(&self, id: &str) -> PathBuf {
		self.root.join(id)
	}

	fn artifact_path(&self, id: &str, version: &semver::Version) -> PathBuf {
		self.version_dir(id, version).join(ARTIFACT_FILE_NAME)
	}

	/// Validates `plugin`, writes it to `<id>/<version>/plugin.yaml`, and registers it with the
	/// in-memory [`Registry`], replacing any prior occupant of the same id.
	///
	/// Per the byte-exact checksum preservation invariant: when `raw_bytes` is supplied those
	/// exact bytes are written verbatim. Re-serializing the parsed form is only a best-effort
	/// fallback for callers that never had raw bytes (e.g. artifacts authored directly into the
	/// cache out of band), and is not used on the downloader's hot path.
	pub async fn add(
		&self,
		plugin: YamlPlugin,
		checksum: Checksum,
		download_url: url::Url,
		raw_bytes: Option<&[u8]>,
	) -> Result<CacheEntry> {
		plugin.validate()?;

		let dir = self.version_dir(&plugin.id, &plugin.version);

		tokio::fs::create_dir_all(&dir).await?;
		set_dir_permissions(&dir)?;

		let path = dir.join(ARTIFACT_FILE_NAME);

		match raw_bytes {
			Some(bytes) => tokio::fs::write(&path, bytes).await?,
			None => {
				let serialized = serde_yaml::to_string(&plugin)?;

				tokio::fs::write(&path, serialized).await?;
			},
		}
		set_file_permissions(&path)?;

		let now = Utc::now();
		let entry = CacheEntry {
			id: plugin.id.clone(),
			name: plugin.name.clone(),
			version: plugin.version.clone(),
			path,
			checksum: checksum.clone(),
			download_url: download_url.clone(),
			cached_at: now,
			last_used: now,
		};

		self.entries
			.write()
			.expect("cache entry-metadata lock poisoned")
			.insert(plugin.id.clone(), EntryMeta { checksum, download_url });
		self.registry.register(plugin)?;

		Ok(entry)
	}

	/// Looks up a resident artifact by id.
	pub fn get(&self, id: &str) -> Option<std::sync::Arc<YamlPlugin>> {
		self.registry.get(id)
	}

	/// Looks up a [`CacheEntry`] by id and exact version.
	///
	/// Fails if `id` is absent, if the registered version differs from `version`, or if the
	/// artifact file is missing on disk. Timestamps are derived from the file's mtime.
	pub async fn get_entry(&self, id: &str, version: &semver::Version) -> Result<CacheEntry> {
		let plugin = self.registry.get(id).ok_or_else(|| Error::PluginNotFound { id: id.to_string() })?;

		if &plugin.version != version {
			return Err(Error::PluginNotFound { id: format!("{id}@{version}") });
		}

		let path = self.artifact_path(id, version);
		let metadata = tokio::fs::metadata(&path).await.map_err(|_| Error::PluginNotFound {
			id: format!("{id}@{version}"),
		})?;
		let modified: DateTime<Utc> = metadata.modified()?.into();
		let meta = self.entries.read().expect("cache entry-metadata lock poisoned").get(id).cloned();
		let (checksum, download_url) = match meta {
			Some(meta) => (meta.checksum, meta.download_url),
			// Recovered purely from disk (e.g. after a restart, before any `add`): the
			// checksum is recomputed from the file itself rather than a recorded download-time
			// commitment, so it is only useful for a sanity read, not an integrity check.
			None => (crate::verify::compute(&path).await?, placeholder_url()),
		};

		Ok(CacheEntry {
			id: plugin.id.clone(),
			name: plugin.name.clone(),
			version: plugin.version.clone(),
			path,
			checksum,
			download_url,
			cached_at: modified,
			last_used: modified,
		})
	}

	/// Removes `<id>/<version>/`. Fails if that directory is absent.
	///
	/// If the currently registered version for `id` matches `version`, unregisters it too; then
	/// removes `<id>/` itself if it is now empty.
	pub async fn remove(&self, id: &str, version: &semver::Version) -> Result<()> {
		let dir = self.version_dir(id, version);

		if tokio::fs::metadata(&dir).await.is_err() {
			return Err(Error::PluginNotFound { id: format!("{id}@{version}") });
		}

		tokio::fs::remove_dir_all(&dir).await?;

		if let Some(plugin) = self.registry.get(id)
			&& &plugin.version == version
		{
			self.registry.unregister(id)?;
			self.entries.write().expect("cache entry-metadata lock poisoned").remove(id);
		}

		let plugin_dir = self.plugin_dir(id);

		if directory_is_empty(&plugin_dir).await {
			let _ = tokio::fs::remove_dir(&plugin_dir).await;
		}

		Ok(())
	}

	/// Snapshot of every resident artifact.
	pub fn list(&self) -> Vec<std::sync::Arc<YamlPlugin>> {
		self.registry.list()
	}

	/// Snapshot of every resident [`CacheEntry`], observing `token` between plugins.
	///
	/// On cancellation, returns the partial list accumulated so far together with the
	/// cancellation error.
	pub async fn list_entries(&self, token: &CancellationToken) -> Result<Vec<CacheEntry>> {
		let mut entries = Vec::new();

		for plugin in self.registry.list() {
			cancel::ensure_live(token)?;

			if let Ok(entry) = self.get_entry(&plugin.id, &plugin.version).await {
				entries.push(entry);
			}
		}

		Ok(entries)
	}

	/// Walks the cache tree and sums file sizes, observing `token`.
	pub async fn size(&self, token: &CancellationToken) -> Result<u64> {
		let root = self.root.clone();
		let token = token.clone();

		tokio::task::spawn_blocking(move || -> Result<u64> {
			let mut total = 0u64;

			for entry in WalkDir::new(&root).into_iter().filter_map(|entry| entry.ok()) {
				if token.is_cancelled() {
					return Err(Error::Cancelled);
				}

				if entry.file_type().is_file() {
					total += entry.metadata().map(|meta| meta.len()).unwrap_or(0);
				}
			}

			Ok(total)
		})
		.await
		.map_err(|err| Error::Validation { field: "cache.size", reason: err.to_string() })?
	}

	/// Removes every plugin directory whose mtime is older than `now - older_than`, returning the
	/// count of versions removed.
	pub async fn prune(&self, token: &CancellationToken, older_than: Duration) -> Result<usize> {
		let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero());
		let mut removed = 0usize;

		let mut plugin_dirs = tokio::fs::read_dir(&self.root).await?;
		let mut candidates = Vec::new();

		while let Some(entry) = plugin_dirs.next_entry().await? {
			if entry.file_type().await?.is_dir() {
				candidates.push(entry.path());
			}
		}

		for plugin_dir in candidates {
			cancel::ensure_live(token)?;

			let metadata = tokio::fs::metadata(&plugin_dir).await?;
			let modified: DateTime<Utc> = metadata.modified()?.into();

			if modified >= cutoff {
				continue;
			}

			let id = plugin_dir.file_name().and_then(|name| name.to_str()).unwrap_or_default().to_string();
			let mut version_dirs = tokio::fs::read_dir(&plugin_dir).await?;

			while let Some(version_entry) = version_dirs.next_entry().await? {
				if version_entry.file_type().await?.is_dir() {
					tokio::fs::remove_dir_all(version_entry.path()).await?;
					removed += 1;
				}
			}

			if directory_is_empty(&plugin_dir).await {
				let _ = tokio::fs::remove_dir(&plugin_dir).await;
			}

			let _ = self.registry.unregister(&id);
			self.entries.write().expect("cache entry-metadata lock poisoned").remove(&id);
		}

		Ok(removed)
	}

	/// Removes every top-level plugin directory and clears the [`Registry`].
	pub async fn clear(&self, token: &CancellationToken) -> Result<()> {
		let mut entries = tokio::fs::read_dir(&self.root).await?;

		while let Some(entry) = entries.next_entry().await? {
			cancel::ensure_live(token)?;

			if entry.file_type().await?.is_dir() {
				tokio::fs::remove_dir_all(entry.path()).await?;
			}
		}

		self.registry.clear();
		self.entries.write().expect("cache entry-metadata lock poisoned").clear();

		Ok(())
	}

	/// Recursively loads every artifact under `root` and bulk-registers them, tolerating
	/// individual failures.
	pub async fn load_from_disk(&self, token: &CancellationToken) -> Result<()> {
		cancel::ensure_live(token)?;

		let root = self.root.clone();
		let result = tokio::task::spawn_blocking(move || crate::loader::load_recursive(&root))
			.await
			.map_err(|err| Error::Validation { field: "cache.load_from_disk", reason: err.to_string() })??;

		for error in &result.errors {
			tracing::warn!(path = %error.path.display(), error = %error.error, "failed to load cached artifact");
		}

		let (ok, errors) = self.registry.register_bulk(result.plugins);

		tracing::debug!(loaded = ok, failed = errors.len(), "loaded artifacts from disk");

		Ok(())
	}
}

async fn directory_is_empty(path: &Path) -> bool {
	match tokio::fs::read_dir(path).await {
		Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
		Err(_) => false,
	}
}

fn placeholder_url() -> url::Url {
	url::Url::parse("about:blank").expect("static URL is valid")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::OutputBlock;

	fn plugin(id: &str, version: &str) -> YamlPlugin {
		YamlPlugin {
			id: id.into(),
			name: id.into(),
			version: semver::Version::parse(version).unwrap(),
			plugin_type: Default::default(),
			author: "scanhub".into(),
			min_host_version: None,
			severity: Default::default(),
			tags: Default::default(),
			cve: None,
			triggers: vec![],
			match_block: None,
			output: OutputBlock { message: "m".into(), extra: Default::default() },
			file_path: Default::default(),
			loaded_at: None,
		}
	}

	fn checksum() -> Checksum {
		Checksum::from_sha256_hex("a".repeat(64))
	}

	fn url() -> url::Url {
		url::Url::parse("https://example.test/plugin.yaml").unwrap()
	}

	#[tokio::test]
	async fn add_writes_raw_bytes_verbatim() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Cache::new(dir.path()).await.unwrap();
		let raw = b"id: ssh-weak\nname: SSH weak\nversion: 1.0.0\nauthor: a\noutput:\n  message: m\n";

		let entry =
			cache.add(plugin("ssh-weak", "1.0.0"), checksum(), url(), Some(raw)).await.unwrap();
		let on_disk = tokio::fs::read(&entry.path).await.unwrap();

		assert_eq!(on_disk, raw);
	}

	#[tokio::test]
	async fn remove_unregisters_matching_version_and_prunes_empty_dir() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Cache::new(dir.path()).await.unwrap();

		cache.add(plugin("ssh-weak", "1.0.0"), checksum(), url(), None).await.unwrap();
		cache.remove("ssh-weak", &semver::Version::parse("1.0.0").unwrap()).await.unwrap();

		assert!(cache.get("ssh-weak").is_none());
		assert!(!cache.plugin_dir("ssh-weak").exists());
	}

	#[tokio::test]
	async fn duplicate_add_overwrites_prior_registration() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Cache::new(dir.path()).await.unwrap();

		cache.add(plugin("ssh-weak", "1.0.0"), checksum(), url(), None).await.unwrap();
		cache.add(plugin("ssh-weak", "2.0.0"), checksum(), url(), None).await.unwrap();

		let resident = cache.get("ssh-weak").unwrap();

		assert_eq!(resident.version, semver::Version::parse("2.0.0").unwrap());
	}

	#[tokio::test]
	async fn prune_removes_directories_older_than_cutoff() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Cache::new(dir.path()).await.unwrap();

		cache.add(plugin("ssh-weak", "1.0.0"), checksum(), url(), None).await.unwrap();

		let token = CancellationToken::new();
		let removed = cache.prune(&token, Duration::from_secs(0)).await.unwrap();

		assert_eq!(removed, 1);
		assert!(cache.get("ssh-weak").is_none());
	}
}
