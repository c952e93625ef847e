//! Fetches remote plugin manifests and artifacts into the [`Cache`].
//!
//! A `reqwest::Client` wrapped in a per-attempt timeout, decoding and validating each response
//! on the way in, falling back across sources and mirrors in order before giving up.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use reqwest::Client;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	Error, Result,
	cache::{Cache, CacheEntry},
	cancel,
	model::{Category, PluginSource, RemoteManifest, YamlPlugin},
	retry::{RetryExecutor, RetryPolicy},
	verify,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches remote manifests (with mirror fallback) and downloads verified artifacts into a
/// shared [`Cache`].
#[derive(Debug)]
pub struct Downloader {
	client: Client,
	cache: Arc<Cache>,
	sources: Vec<PluginSource>,
	retry_policy: RetryPolicy,
	timeout: Duration,
}
impl Downloader {
	/// Builds a downloader over `cache` with a default `reqwest` client, 30s attempt timeout,
	/// and the default [`RetryPolicy`].
	pub fn new(cache: Arc<Cache>, sources: Vec<PluginSource>) -> Result<Self> {
		let client = Client::builder()
			.user_agent(concat!("scanhub-plugins/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self::with_parts(cache, sources, client, RetryPolicy::default(), DEFAULT_TIMEOUT))
	}

	/// Builds a downloader with explicit collaborators, primarily for tests.
	pub fn with_parts(
		cache: Arc<Cache>,
		sources: Vec<PluginSource>,
		client: Client,
		retry_policy: RetryPolicy,
		timeout: Duration,
	) -> Self {
		Self { client, cache, sources, retry_policy, timeout }
	}

	/// The configured sources, in the order they were supplied.
	pub fn sources(&self) -> &[PluginSource] {
		&self.sources
	}

	fn enabled_sources_by_priority(&self) -> Vec<&PluginSource> {
		let mut sources: Vec<&PluginSource> = self.sources.iter().filter(|source| source.enabled).collect();

		sources.sort_by_key(|source| source.priority);

		sources
	}

	/// Fetches and decodes `source`'s remote manifest, trying `source.url` then each mirror in
	/// order; each individual attempt is retried per the configured [`RetryPolicy`].
	pub async fn fetch_manifest(
		&self,
		token: &CancellationToken,
		source: &PluginSource,
	) -> Result<RemoteManifest> {
		let mut attempt_errors = Vec::new();

		for url in source.fetch_order() {
			cancel::ensure_live(token)?;

			let mut executor = RetryExecutor::new(&self.retry_policy, token);
			let client = self.client.clone();
			let url = url.clone();
			let timeout = self.timeout;

			match executor.run(|| fetch_manifest_once(client.clone(), url.clone(), timeout)).await {
				Ok(manifest) => return Ok(manifest),
				Err(err) => attempt_errors.push(format!("{url}: {err}")),
			}
		}

		Err(Error::ManifestFetchFailed { source: source.name.clone(), reason: attempt_errors.join("; ") })
	}

	/// Resolves `(id, version)`, short-circuiting to the existing [`CacheEntry`] if already
	/// cached; otherwise iterates sources in priority order, downloads the verified artifact
	/// bytes, and caches them verbatim.
	pub async fn download(
		&self,
		token: &CancellationToken,
		id: &str,
		version: &semver::Version,
	) -> Result<CacheEntry> {
		if let Some(resident) = self.cache.get(id)
			&& &resident.version == version
		{
			return self.cache.get_entry(id, version).await;
		}

		for source in self.enabled_sources_by_priority() {
			cancel::ensure_live(token)?;

			let manifest = match self.fetch_manifest(token, source).await {
				Ok(manifest) => manifest,
				Err(err) => {
					tracing::warn!(source = %source.name, error = %err, "failed to fetch manifest from source");
					continue;
				},
			};

			let Some(remote) = manifest.find_version(id, version) else { continue };

			let mut executor = RetryExecutor::new(&self.retry_policy, token);
			let client = self.client.clone();
			let url = remote.url.clone();
			let timeout = self.timeout;
			let bytes = executor.run(|| fetch_bytes_once(client.clone(), url.clone(), timeout)).await?;
			let checksum = verify::compute_bytes(&bytes);

			if checksum.hex() != remote.checksum.hex() {
				return Err(Error::ChecksumMismatch {
					id: id.to_string(),
					expected: remote.checksum.to_string(),
					computed: checksum.to_string(),
				});
			}

			let artifact: YamlPlugin = serde_yaml::from_slice(&bytes)?;

			artifact.validate()?;

			return self.cache.add(artifact, checksum, remote.url.clone(), Some(&bytes)).await;
		}

		Err(Error::PluginNotFound { id: format!("{id}@{version}") })
	}

	/// Fetches every enabled source's manifest, downloads every entry tagged `category`, and
	/// returns the successfully cached entries. Individual fetch/download failures are logged
	/// and skipped; an empty result is not itself an error.
	pub async fn download_by_category(
		&self,
		token: &CancellationToken,
		category: Category,
	) -> Result<Vec<CacheEntry>> {
		let mut cached = Vec::new();

		for source in self.enabled_sources_by_priority() {
			cancel::ensure_live(token)?;

			let manifest = match self.fetch_manifest(token, source).await {
				Ok(manifest) => manifest,
				Err(err) => {
					tracing::warn!(source = %source.name, error = %err, "failed to fetch manifest from source");
					continue;
				},
			};

			for entry in manifest.plugins.iter().filter(|entry| entry.has_category(category)) {
				cancel::ensure_live(token)?;

				match self.download(token, &entry.id, &entry.version).await {
					Ok(cache_entry) => cached.push(cache_entry),
					Err(err) => {
						tracing::warn!(id = %entry.id, error = %err, "failed to download plugin for category sweep");
					},
				}
			}
		}

		Ok(cached)
	}

	/// For every currently cached plugin, checks enabled sources for a newer version; downloads
	/// and swaps in the new version, removing the stale one. Manifest-fetch failures are logged
	/// and skipped; a download failure aborts the whole call with an error naming the plugin.
	pub async fn update(&self, token: &CancellationToken) -> Result<usize> {
		let cached = self.cache.list();
		let mut updated = 0usize;

		for source in self.enabled_sources_by_priority() {
			cancel::ensure_live(token)?;

			let manifest = match self.fetch_manifest(token, source).await {
				Ok(manifest) => manifest,
				Err(err) => {
					tracing::warn!(source = %source.name, error = %err, "failed to fetch manifest from source");
					continue;
				},
			};

			for plugin in &cached {
				cancel::ensure_live(token)?;

				let Some(remote) = manifest.find(&plugin.id) else { continue };

				if remote.version == plugin.version {
					continue;
				}

				let old_version = plugin.version.clone();

				self.download(token, &remote.id, &remote.version).await.map_err(|err| {
					Error::Validation {
						field: "downloader.update",
						reason: format!("failed to update '{}': {err}", remote.id),
					}
				})?;
				self.cache.remove(&plugin.id, &old_version).await?;

				updated += 1;
			}
		}

		Ok(updated)
	}
}

async fn fetch_manifest_once(client: Client, url: url::Url, timeout: Duration) -> Result<RemoteManifest> {
	let response = client.get(url).timeout(timeout).send().await?;
	let status = response.status();

	if !status.is_success() {
		return Err(Error::UnexpectedStatus(status.as_u16()));
	}

	let bytes = response.bytes().await?;

	Ok(serde_yaml::from_slice(&bytes)?)
}

async fn fetch_bytes_once(client: Client, url: url::Url, timeout: Duration) -> Result<Vec<u8>> {
	let response = client.get(url).timeout(timeout).send().await?;
	let status = response.status();

	if !status.is_success() {
		return Err(Error::UnexpectedStatus(status.as_u16()));
	}

	Ok(response.bytes().await?.to_vec())
}
