//! The lifecycle service orchestrator: install/update/uninstall/list/get_info/clean/verify,
//! composed from [`Cache`], [`Manifest`], and [`Downloader`].
//!
//! A top-level orchestrator composing a manifest store, a cache, and a fetcher behind one
//! facade, built by a constructor that wires up a handful of collaborators with sane defaults
//! and accepts injected overrides. The capability-set traits below ([`CacheOps`],
//! [`ManifestOps`], [`DownloaderOps`]) exist so a test can substitute its own collaborators for
//! [`Cache`]/[`Manifest`]/[`Downloader`], keeping state (`Registry`) and transport
//! (`Downloader`) independently testable.

pub mod config;
pub mod options;
pub mod result;

// std
use std::{future::Future, path::Path, sync::Arc, time::Duration};
#[cfg(feature = "metrics")]
use std::time::Instant;
// crates.io
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;
// self
use crate::{
	Error, Result,
	cache::{Cache, CacheEntry},
	cancel,
	downloader::Downloader,
	manifest::{Manifest, ManifestEntry, watcher::ManifestWatcher},
	model::{Category, PluginSource, RemoteManifest, RemoteManifestEntry},
	validate,
};
pub use config::{ServiceConfig, Timeouts};
pub use options::{CleanOptions, InstallOptions, UninstallOptions, UpdateOptions, VerifyOptions};
pub use result::{
	BulkOutcome, CleanOutcome, InstallOutcome, PluginDetail, PluginError, PluginInfo,
	UninstallOutcome, UpdateOutcome, VerifyEntry, VerifyResult, VerifyStatus,
};

/// The cache capabilities the orchestrator depends on: `{get_entry, size, prune, remove}`.
pub trait CacheOps: Send + Sync {
	/// The cache root directory, used by [`Service::get_info`] to resolve a plugin's on-disk
	/// footprint from its manifest-relative path.
	fn root(&self) -> &Path;
	/// See [`Cache::get_entry`].
	fn get_entry(
		&self,
		id: &str,
		version: &semver::Version,
	) -> impl Future<Output = Result<CacheEntry>> + Send;
	/// See [`Cache::size`].
	fn size(&self, token: &CancellationToken) -> impl Future<Output = Result<u64>> + Send;
	/// See [`Cache::prune`].
	fn prune(
		&self,
		token: &CancellationToken,
		older_than: Duration,
	) -> impl Future<Output = Result<usize>> + Send;
	/// See [`Cache::remove`].
	fn remove(&self, id: &str, version: &semver::Version) -> impl Future<Output = Result<()>> + Send;
}
impl CacheOps for Cache {
	fn root(&self) -> &Path {
		Cache::root(self)
	}

	async fn get_entry(&self, id: &str, version: &semver::Version) -> Result<CacheEntry> {
		Cache::get_entry(self, id, version).await
	}

	async fn size(&self, token: &CancellationToken) -> Result<u64> {
		Cache::size(self, token).await
	}

	async fn prune(&self, token: &CancellationToken, older_than: Duration) -> Result<usize> {
		Cache::prune(self, token, older_than).await
	}

	async fn remove(&self, id: &str, version: &semver::Version) -> Result<()> {
		Cache::remove(self, id, version).await
	}
}

/// The manifest capabilities the orchestrator depends on: `{add, save, list, remove, get}`.
pub trait ManifestOps: Send + Sync {
	/// See [`Manifest::add`].
	fn add(&self, entry: ManifestEntry) -> impl Future<Output = Result<()>> + Send;
	/// See [`Manifest::save`].
	fn save(&self) -> impl Future<Output = Result<()>> + Send;
	/// See [`Manifest::list`].
	fn list(&self) -> impl Future<Output = Result<Vec<ManifestEntry>>> + Send;
	/// See [`Manifest::remove`].
	fn remove(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
	/// See [`Manifest::get`].
	fn get(&self, id: &str) -> impl Future<Output = Result<Option<ManifestEntry>>> + Send;
	/// See [`Manifest::update`].
	fn update(
		&self,
		id: &str,
		mutate: impl FnOnce(&mut ManifestEntry) + Send,
	) -> impl Future<Output = Result<()>> + Send;
}
impl ManifestOps for Manifest {
	async fn add(&self, entry: ManifestEntry) -> Result<()> {
		Manifest::add(self, entry).await
	}

	async fn save(&self) -> Result<()> {
		Manifest::save(self).await
	}

	async fn list(&self) -> Result<Vec<ManifestEntry>> {
		Manifest::list(self).await
	}

	async fn remove(&self, id: &str) -> Result<()> {
		Manifest::remove(self, id).await
	}

	async fn get(&self, id: &str) -> Result<Option<ManifestEntry>> {
		Manifest::get(self, id).await
	}

	async fn update(&self, id: &str, mutate: impl FnOnce(&mut ManifestEntry) + Send) -> Result<()> {
		Manifest::update(self, id, mutate).await
	}
}

/// The downloader capabilities the orchestrator depends on: `{fetch_manifest, download}`,
/// plus a `sources` accessor the orchestrator needs to resolve single-source and
/// priority-ordered fetches.
pub trait DownloaderOps: Send + Sync {
	/// The configured sources, in construction order.
	fn sources(&self) -> &[PluginSource];
	/// See [`Downloader::fetch_manifest`].
	fn fetch_manifest(
		&self,
		token: &CancellationToken,
		source: &PluginSource,
	) -> impl Future<Output = Result<RemoteManifest>> + Send;
	/// See [`Downloader::download`].
	fn download(
		&self,
		token: &CancellationToken,
		id: &str,
		version: &semver::Version,
	) -> impl Future<Output = Result<CacheEntry>> + Send;
}
impl DownloaderOps for Downloader {
	fn sources(&self) -> &[PluginSource] {
		Downloader::sources(self)
	}

	async fn fetch_manifest(&self, token: &CancellationToken, source: &PluginSource) -> Result<RemoteManifest> {
		Downloader::fetch_manifest(self, token, source).await
	}

	async fn download(&self, token: &CancellationToken, id: &str, version: &semver::Version) -> Result<CacheEntry> {
		Downloader::download(self, token, id, version).await
	}
}

/// Plugin lifecycle orchestrator: install/update/uninstall/list/get_info/clean/verify, composed
/// from a cache, a manifest, and a downloader behind the capability-set traits above.
///
/// Generic over its three collaborators so tests can substitute doubles for `C`/`M`/`D`; the
/// default construction path (`Service::new`) fixes them to the concrete [`Cache`], [`Manifest`],
/// and [`Downloader`].
#[derive(Debug)]
pub struct Service<C = Cache, M = Manifest, D = Downloader> {
	cache: Arc<C>,
	manifest: Arc<M>,
	downloader: Arc<D>,
	config: ServiceConfig,
}

impl Service<Cache, Manifest, Downloader> {
	/// Builds a service with concrete collaborators: resolves the cache root (`config.cache_root`
	/// or `<home>/.scanhub/plugins/cache`), creates the on-disk [`Cache`] there, creates the
	/// [`Manifest`] at `<parent(cache_root)>/registry.json`, and wraps the cache in a
	/// [`Downloader`] configured with `config.sources` and `config.retry_policy`.
	pub async fn new(config: ServiceConfig) -> Result<Self> {
		let cache_root = config.resolve_cache_root()?;
		let cache = Arc::new(Cache::new(&cache_root).await?);
		// `cache_root` is always created above, so it always has a parent in practice; the
		// fallback only covers the degenerate root-path edge case.
		let manifest_path =
			cache_root.parent().map_or_else(|| cache_root.join("registry.json"), |parent| parent.join("registry.json"));
		let manifest = Arc::new(Manifest::new(manifest_path).await?);
		let downloader = Arc::new(Downloader::new(cache.clone(), config.sources.clone())?);

		Ok(Self { cache, manifest, downloader, config })
	}

	/// Spawns a [`ManifestWatcher`] that reloads this service's manifest on external edits. The
	/// caller owns the returned handle and controls its lifetime.
	pub fn spawn_manifest_watcher(&self) -> Result<ManifestWatcher> {
		ManifestWatcher::spawn_default(self.manifest.clone())
	}
}

impl<C, M, D> Service<C, M, D>
where
	C: CacheOps,
	M: ManifestOps,
	D: DownloaderOps,
{
	/// Builds a service from already-constructed collaborators, for injection in tests or
	/// alternative deployments (e.g. an in-memory cache double).
	pub fn new_with_parts(cache: Arc<C>, manifest: Arc<M>, downloader: Arc<D>, config: ServiceConfig) -> Self {
		Self { cache, manifest, downloader, config }
	}

	/// The configuration this service was built with.
	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}

	fn select_sources<'a>(&'a self, named: Option<&str>) -> Result<Vec<&'a PluginSource>> {
		let all = self.downloader.sources();

		match named {
			Some(name) => {
				let found = all
					.iter()
					.find(|source| source.name == name)
					.ok_or_else(|| Error::SourceNotAvailable { name: name.to_string() })?;

				Ok(vec![found])
			},
			None => {
				let mut enabled: Vec<&PluginSource> = all.iter().filter(|source| source.enabled).collect();

				enabled.sort_by_key(|source| source.priority);

				Ok(enabled)
			},
		}
	}

	/// Fetches every source's manifest, logging and skipping sources that fail, and returns the
	/// merged entry list in source-priority order.
	async fn fetch_merged(
		&self,
		token: &CancellationToken,
		sources: &[&PluginSource],
	) -> Result<Vec<RemoteManifestEntry>> {
		let mut merged = Vec::new();

		for source in sources {
			cancel::ensure_live(token)?;

			match self.downloader.fetch_manifest(token, source).await {
				Ok(manifest) => merged.extend(manifest.plugins),
				Err(err) => {
					tracing::warn!(source = %source.name, error = %err, "failed to fetch manifest from source");
				},
			}
		}

		Ok(merged)
	}

	/// Installs plugins matching `target` (a category name or a plugin id).
	pub async fn install(
		&self,
		token: &CancellationToken,
		target: &str,
		opts: InstallOptions,
	) -> Result<InstallOutcome> {
		if let Some(source) = &opts.source {
			validate::validate_source_name(source)?;
		}

		let sources = self.select_sources(opts.source.as_deref())?;
		let merged = self.fetch_merged(token, &sources).await?;

		if merged.is_empty() {
			return Err(Error::NoPluginsFound);
		}

		let explicit_category = opts.category.as_deref().map(validate::validate_category).transpose()?;

		let to_install: Vec<RemoteManifestEntry> = if let Some(category) = explicit_category {
			merged.into_iter().filter(|entry| entry.has_category(category)).collect()
		} else if let Some(category) = Category::parse_strict(target) {
			merged.into_iter().filter(|entry| entry.has_category(category)).collect()
		} else {
			validate::validate_plugin_id(target)?;

			match find_case_insensitive(&merged, target) {
				Some(entry) => vec![entry.clone()],
				None => return Err(Error::PluginNotFound { id: target.to_string() }),
			}
		};

		if to_install.is_empty() {
			return Err(Error::NoPluginsFound);
		}

		#[cfg(feature = "metrics")]
		let metrics_source = opts.source.as_deref().unwrap_or("any");
		let mut outcome = InstallOutcome::default();

		for candidate in to_install {
			if token.is_cancelled() {
				return Err(Error::CancelledPartial(Box::new(BulkOutcome::Install(outcome))));
			}

			if !opts.force && self.cache.get_entry(&candidate.id, &candidate.version).await.is_ok() {
				outcome.skipped += 1;

				#[cfg(feature = "metrics")]
				crate::metrics::record_install(metrics_source, "skipped");

				continue;
			}

			if opts.dry_run {
				outcome.installed += 1;
				outcome.plugins.push(dry_run_plugin_info(&candidate));

				#[cfg(feature = "metrics")]
				crate::metrics::record_install(metrics_source, "dry_run");

				continue;
			}

			#[cfg(feature = "metrics")]
			let started = Instant::now();
			let download_result = self.downloader.download(token, &candidate.id, &candidate.version).await;

			#[cfg(feature = "metrics")]
			crate::metrics::record_download(
				metrics_source,
				if download_result.is_ok() { "success" } else { "error" },
				started.elapsed(),
			);

			match download_result {
				Ok(cache_entry) => {
					let entry = ManifestEntry::from_cache_entry(&cache_entry, &candidate.author, &candidate.categories);

					self.manifest.add(entry.clone()).await?;

					if let Err(err) = self.manifest.save().await {
						tracing::warn!(id = %candidate.id, error = %err, "failed to persist manifest after install");
					}

					outcome.installed += 1;
					outcome.plugins.push((&entry).into());

					#[cfg(feature = "metrics")]
					crate::metrics::record_install(metrics_source, "installed");
				},
				Err(err) => {
					outcome.failed += 1;
					outcome.errors.push(PluginError::from_error(candidate.id.clone(), &err));

					#[cfg(feature = "metrics")]
					crate::metrics::record_install(metrics_source, "failed");
				},
			}
		}

		if outcome.failed > 0 {
			return Err(Error::PartialFailure(Box::new(BulkOutcome::Install(outcome))));
		}

		Ok(outcome)
	}

	/// Checks every currently installed plugin (optionally restricted to a category) against
	/// sources for a newer version, downloads and swaps in updates.
	pub async fn update(&self, token: &CancellationToken, opts: UpdateOptions) -> Result<UpdateOutcome> {
		let category = opts.category.as_deref().map(validate::validate_category).transpose()?;

		if let Some(source) = &opts.source {
			validate::validate_source_name(source)?;
		}

		let installed = self.manifest.list().await?;
		let targets: Vec<ManifestEntry> = match category {
			Some(category) => installed.into_iter().filter(|entry| entry.has_tag(category.as_str())).collect(),
			None => installed,
		};

		let sources = self.select_sources(opts.source.as_deref())?;
		let merged = self.fetch_merged(token, &sources).await?;

		#[cfg(feature = "metrics")]
		let metrics_source = opts.source.as_deref().unwrap_or("any");
		let mut outcome = UpdateOutcome::default();

		for installed in &targets {
			if token.is_cancelled() {
				return Err(Error::CancelledPartial(Box::new(BulkOutcome::Update(outcome))));
			}

			let Some(candidate) = find_case_insensitive(&merged, &installed.id) else {
				outcome.skipped += 1;

				#[cfg(feature = "metrics")]
				crate::metrics::record_update(metrics_source, "skipped");

				continue;
			};

			if !opts.force && candidate.version <= installed.version {
				outcome.skipped += 1;

				#[cfg(feature = "metrics")]
				crate::metrics::record_update(metrics_source, "skipped");

				continue;
			}

			if opts.dry_run {
				outcome.updated += 1;
				outcome.plugins.push(dry_run_plugin_info(candidate));

				#[cfg(feature = "metrics")]
				crate::metrics::record_update(metrics_source, "dry_run");

				continue;
			}

			#[cfg(feature = "metrics")]
			let started = Instant::now();
			let download_result = self.downloader.download(token, &candidate.id, &candidate.version).await;

			#[cfg(feature = "metrics")]
			crate::metrics::record_download(
				metrics_source,
				if download_result.is_ok() { "success" } else { "error" },
				started.elapsed(),
			);

			match download_result {
				Ok(cache_entry) => {
					let entry = ManifestEntry::from_cache_entry(&cache_entry, &candidate.author, &candidate.categories);

					self.manifest.add(entry.clone()).await?;

					if let Err(err) = self.cache.remove(&installed.id, &installed.version).await {
						tracing::warn!(id = %installed.id, error = %err, "failed to remove superseded version from cache");
					}
					if let Err(err) = self.manifest.save().await {
						tracing::warn!(id = %candidate.id, error = %err, "failed to persist manifest after update");
					}

					outcome.updated += 1;
					outcome.plugins.push((&entry).into());

					#[cfg(feature = "metrics")]
					crate::metrics::record_update(metrics_source, "updated");
				},
				Err(err) => {
					outcome.failed += 1;
					outcome.errors.push(PluginError::from_error(candidate.id.clone(), &err));

					#[cfg(feature = "metrics")]
					crate::metrics::record_update(metrics_source, "failed");
				},
			}
		}

		if outcome.failed > 0 {
			return Err(Error::PartialFailure(Box::new(BulkOutcome::Update(outcome))));
		}

		Ok(outcome)
	}

	/// Uninstalls plugins selected by exactly one of `target`/`opts.category`/`opts.all`.
	pub async fn uninstall(
		&self,
		token: &CancellationToken,
		target: &str,
		opts: UninstallOptions,
	) -> Result<UninstallOutcome> {
		let modes_selected =
			[!target.is_empty(), opts.category.is_some(), opts.all].iter().filter(|selected| **selected).count();

		if modes_selected != 1 {
			return Err(Error::InvalidInput(
				"exactly one of target, category, or all must be specified".to_string(),
			));
		}

		let installed = self.manifest.list().await?;

		let to_remove: Vec<ManifestEntry> = if opts.all {
			installed
		} else if let Some(category) = &opts.category {
			validate::validate_category(category)?;

			let matched: Vec<ManifestEntry> =
				installed.into_iter().filter(|entry| entry.has_tag(category)).collect();

			if matched.is_empty() {
				return Err(Error::NoPluginsFound);
			}

			matched
		} else {
			validate::validate_plugin_id(target)?;

			match installed.into_iter().find(|entry| entry.id.eq_ignore_ascii_case(target)) {
				Some(entry) => vec![entry],
				None => return Err(Error::PluginNotFound { id: target.to_string() }),
			}
		};

		let mut outcome = UninstallOutcome::default();

		for entry in &to_remove {
			if token.is_cancelled() {
				outcome.remaining = self.manifest.list().await.map(|list| list.len()).unwrap_or_default();

				return Err(Error::CancelledPartial(Box::new(BulkOutcome::Uninstall(outcome))));
			}

			if let Err(err) = self.cache.remove(&entry.id, &entry.version).await {
				tracing::warn!(id = %entry.id, error = %err, "failed to remove plugin from cache");
			}

			match self.manifest.remove(&entry.id).await {
				Ok(()) => {
					outcome.removed += 1;

					#[cfg(feature = "metrics")]
					crate::metrics::record_uninstall("removed");
				},
				Err(err) => {
					outcome.failed += 1;
					outcome.errors.push(PluginError::from_error(entry.id.clone(), &err));

					#[cfg(feature = "metrics")]
					crate::metrics::record_uninstall("failed");
				},
			}
		}

		if outcome.removed > 0
			&& let Err(err) = self.manifest.save().await
		{
			outcome.errors.push(PluginError::from_error("<manifest>", &err));
		}

		outcome.remaining = self.manifest.list().await.map(|list| list.len()).unwrap_or_default();

		if outcome.failed > 0 {
			return Err(Error::PartialFailure(Box::new(BulkOutcome::Uninstall(outcome))));
		}

		Ok(outcome)
	}

	/// Lists every installed plugin. Cache size is deliberately not computed here
	/// for performance; see [`Service::get_info`].
	pub async fn list(&self, token: &CancellationToken) -> Result<Vec<PluginInfo>> {
		let installed = self.manifest.list().await?;
		let mut infos = Vec::with_capacity(installed.len());

		for entry in &installed {
			cancel::ensure_live(token)?;

			infos.push(PluginInfo::from(entry));
		}

		Ok(infos)
	}

	/// Returns detail for a single installed plugin, including its on-disk cache footprint.
	/// Size computation failures downgrade to `0` rather than failing the call.
	pub async fn get_info(&self, token: &CancellationToken, plugin_id: &str) -> Result<PluginDetail> {
		validate::validate_plugin_id(plugin_id)?;

		let entry = self.manifest.get(plugin_id).await?.ok_or_else(|| Error::PluginNotFound {
			id: plugin_id.to_string(),
		})?;

		// `entry.path` is `<id>/<version>/plugin.yaml`, relative to the cache root per the Open
		// Question resolution in DESIGN.md; ascend two levels to the plugin's directory.
		let plugin_dir = self.cache.root().join(&entry.id);
		let cache_size_bytes = plugin_directory_size(&plugin_dir, token).await.unwrap_or(0);

		Ok(PluginDetail { info: PluginInfo::from(&entry), cache_size_bytes })
	}

	/// Prunes cache directories untouched for longer than `opts.older_than`.
	pub async fn clean(&self, token: &CancellationToken, opts: CleanOptions) -> Result<CleanOutcome> {
		let before = self.cache.size(token).await?;

		if opts.dry_run {
			return Ok(CleanOutcome { removed: 0, before, after: before, freed: 0 });
		}

		let removed = self.cache.prune(token, opts.older_than).await?;
		let after = self.cache.size(token).await?;

		#[cfg(feature = "metrics")]
		crate::metrics::record_cache_size(after);

		Ok(CleanOutcome { removed, before, after, freed: before.saturating_sub(after) })
	}

	/// Verifies one or every installed plugin's on-disk checksum against its manifest record.
	pub async fn verify(&self, token: &CancellationToken, opts: VerifyOptions) -> Result<VerifyResult> {
		let targets = match &opts.plugin_id {
			Some(id) => {
				validate::validate_plugin_id(id)?;

				let entry = self.manifest.get(id).await?.ok_or_else(|| Error::PluginNotFound { id: id.clone() })?;

				vec![entry]
			},
			None => self.manifest.list().await?,
		};

		let mut result = VerifyResult { total: targets.len(), ..Default::default() };
		let mut any_verified = false;

		for entry in &targets {
			cancel::ensure_live(token)?;

			let verify_entry = match self.cache.get_entry(&entry.id, &entry.version).await {
				Err(_) => VerifyEntry {
					id: entry.id.clone(),
					version: entry.version.clone(),
					valid: false,
					error: Some("artifact is no longer present in the cache".to_string()),
					error_type: VerifyStatus::Missing,
				},
				Ok(cache_entry) => match crate::verify::verify_file(&cache_entry.path, &entry.checksum).await {
					Ok(true) => {
						any_verified = true;

						if let Err(err) = self
							.manifest
							.update(&entry.id, |record| record.last_verified = Some(chrono::Utc::now()))
							.await
						{
							tracing::warn!(id = %entry.id, error = %err, "failed to record last_verified");
						}

						VerifyEntry {
							id: entry.id.clone(),
							version: entry.version.clone(),
							valid: true,
							error: None,
							error_type: VerifyStatus::Ok,
						}
					},
					Ok(false) => VerifyEntry {
						id: entry.id.clone(),
						version: entry.version.clone(),
						valid: false,
						error: Some("checksum mismatch".to_string()),
						error_type: VerifyStatus::Checksum,
					},
					Err(err) => VerifyEntry {
						id: entry.id.clone(),
						version: entry.version.clone(),
						valid: false,
						error: Some(err.to_string()),
						error_type: VerifyStatus::Error,
					},
				},
			};

			if verify_entry.valid {
				result.success += 1;
			} else {
				result.failed += 1;
			}

			#[cfg(feature = "metrics")]
			crate::metrics::record_verify(if verify_entry.valid { "ok" } else { "failed" });

			result.results.push(verify_entry);
		}

		if any_verified {
			if let Err(err) = self.manifest.save().await {
				tracing::warn!(error = %err, "failed to persist last_verified timestamps");
			}
		}

		Ok(result)
	}
}

// The concrete pass-through for `registry_url`/`set_registry_url`: `ManifestOps` deliberately
// does not carry these (they are outside its minimal capability set), so they are implemented
// directly against the concrete `Manifest` rather than through the trait.
impl Service<Cache, Manifest, Downloader> {
	/// The registry URL recorded in the installed manifest, if any.
	pub async fn get_registry_url(&self) -> Result<Option<String>> {
		self.manifest.get_registry_url().await
	}

	/// Sets the registry URL recorded in the installed manifest.
	pub async fn set_registry_url(&self, url: Option<String>) -> Result<()> {
		self.manifest.set_registry_url(url).await?;
		self.manifest.save().await
	}
}

fn dry_run_plugin_info(candidate: &RemoteManifestEntry) -> PluginInfo {
	PluginInfo {
		id: candidate.id.clone(),
		name: candidate.name.clone(),
		version: candidate.version.clone(),
		plugin_type: crate::model::PluginType::default(),
		author: candidate.author.clone(),
		checksum: candidate.checksum.clone(),
		download_url: candidate.url.clone(),
		installed_at: chrono::Utc::now(),
		last_verified: None,
		tags: candidate.categories.iter().map(|category| category.as_str().to_string()).collect(),
		severity: crate::model::Severity::default(),
	}
}

fn find_case_insensitive<'a>(entries: &'a [RemoteManifestEntry], id: &str) -> Option<&'a RemoteManifestEntry> {
	entries.iter().find(|entry| entry.id.eq_ignore_ascii_case(id))
}

async fn plugin_directory_size(dir: &Path, token: &CancellationToken) -> Result<u64> {
	let dir = dir.to_path_buf();
	let token = token.clone();

	tokio::task::spawn_blocking(move || -> Result<u64> {
		let mut total = 0u64;

		for entry in WalkDir::new(&dir).into_iter().filter_map(|entry| entry.ok()) {
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
	.map_err(|err| Error::Validation { field: "service.get_info", reason: err.to_string() })?
}
