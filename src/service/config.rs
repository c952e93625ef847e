//! [`ServiceConfig`]: per-operation timeouts, retry policy, and source list injected into the
//! orchestrator at construction.
//!
//! A builder that composes a handful of constructed collaborators with sane defaults and
//! accepts injected overrides.

// std
use std::{path::PathBuf, time::Duration};
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::{model::PluginSource, retry::RetryPolicy};

const DEFAULT_SOURCE_URL: &str = "https://plugins.scanhub.dev/registry.yaml";
const DEFAULT_MIRROR_URL: &str = "https://cdn.scanhub.dev/registry.yaml";
const APP_DIR_NAME: &str = "scanhub";

/// Per-operation timeout budget. Applied by the caller around a [`super::Service`]
/// call via `tokio::time::timeout`, not internally, matching the cancellation-token-is-the-
/// context idiom used throughout.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Timeouts {
	/// Timeout for [`super::Service::install`]. Default 60s.
	pub install: Duration,
	/// Timeout for [`super::Service::update`]. Default 60s.
	pub update: Duration,
	/// Timeout for [`super::Service::uninstall`]. Default 30s.
	pub uninstall: Duration,
	/// Timeout for [`super::Service::list`]. Default 10s.
	pub list: Duration,
	/// Timeout for [`super::Service::get_info`]. Default 5s.
	pub get_info: Duration,
	/// Timeout for [`super::Service::clean`]. Default 30s.
	pub clean: Duration,
	/// Timeout for [`super::Service::verify`]. Default 60s.
	pub verify: Duration,
}
impl Default for Timeouts {
	fn default() -> Self {
		Self {
			install: Duration::from_secs(60),
			update: Duration::from_secs(60),
			uninstall: Duration::from_secs(30),
			list: Duration::from_secs(10),
			get_info: Duration::from_secs(5),
			clean: Duration::from_secs(30),
			verify: Duration::from_secs(60),
		}
	}
}

/// Construction-time configuration for [`super::Service`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
	/// Cache root directory. Defaults to `<home>/.scanhub/plugins/cache` when unset.
	pub cache_root: Option<PathBuf>,
	/// Plugin sources to fetch from. Defaults to a single `"official"` source with one mirror.
	pub sources: Vec<PluginSource>,
	/// Retry policy applied to every network attempt.
	pub retry_policy: RetryPolicy,
	/// Per-operation timeout budget.
	pub timeouts: Timeouts,
}
impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			cache_root: None,
			sources: default_sources(),
			retry_policy: RetryPolicy::default(),
			timeouts: Timeouts::default(),
		}
	}
}
impl ServiceConfig {
	/// Starts a [`ServiceConfigBuilder`] seeded with defaults.
	pub fn builder() -> ServiceConfigBuilder {
		ServiceConfigBuilder::default()
	}

	/// Resolves the cache root, falling back to `<home>/.scanhub/plugins/cache`.
	pub fn resolve_cache_root(&self) -> crate::Result<PathBuf> {
		if let Some(root) = &self.cache_root {
			return Ok(root.clone());
		}

		dirs::home_dir().map(|home| home.join(format!(".{APP_DIR_NAME}")).join("plugins").join("cache")).ok_or_else(
			|| crate::Error::Validation {
				field: "cache_root",
				reason: "Could not resolve a home directory; supply cache_root explicitly.".into(),
			},
		)
	}
}

fn default_sources() -> Vec<PluginSource> {
	PluginSource::defaults(
		url::Url::parse(DEFAULT_SOURCE_URL).expect("static URL is valid"),
		url::Url::parse(DEFAULT_MIRROR_URL).expect("static URL is valid"),
	)
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
	config: ServiceConfig,
}
impl ServiceConfigBuilder {
	/// Overrides the cache root directory.
	pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.config.cache_root = Some(root.into());

		self
	}

	/// Replaces the default source list.
	pub fn sources(mut self, sources: Vec<PluginSource>) -> Self {
		self.config.sources = sources;

		self
	}

	/// Overrides the retry policy applied to network attempts.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.config.retry_policy = policy;

		self
	}

	/// Overrides the per-operation timeout budget.
	pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
		self.config.timeouts = timeouts;

		self
	}

	/// Finalizes the configuration.
	pub fn build(self) -> ServiceConfig {
		self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_sources_are_enabled_and_prioritized() {
		let sources = default_sources();

		assert_eq!(sources.len(), 1);
		assert!(sources[0].enabled);
		assert_eq!(sources[0].priority, 1);
		assert_eq!(sources[0].mirrors.len(), 1);
	}

	#[test]
	fn builder_overrides_cache_root() {
		let config = ServiceConfig::builder().cache_root("/tmp/scanhub-test").build();

		assert_eq!(config.resolve_cache_root().unwrap(), PathBuf::from("/tmp/scanhub-test"));
	}
}
