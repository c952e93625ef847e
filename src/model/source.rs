//! Plugin source configuration.

use serde::{Deserialize, Serialize};
use url::Url;

/// A named, prioritized endpoint producing a remote manifest, with optional mirrors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PluginSource {
	/// Source name, used for lookup and error messages.
	pub name: String,
	/// Primary manifest URL.
	pub url: Url,
	/// Whether this source participates in fetches. Disabled sources are skipped.
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	/// Lower values are tried first.
	#[serde(default)]
	pub priority: i32,
	/// Fallback URLs tried, in order, if `url` fails.
	#[serde(default)]
	pub mirrors: Vec<Url>,
}
impl PluginSource {
	/// Builds the default source set: a single `"official"` entry with one mirror.
	pub fn defaults(primary: Url, mirror: Url) -> Vec<Self> {
		vec![Self { name: "official".into(), url: primary, enabled: true, priority: 1, mirrors: vec![mirror] }]
	}

	/// All URLs to attempt, in fetch order: `url` first, then `mirrors` in order.
	pub fn fetch_order(&self) -> impl Iterator<Item = &Url> {
		std::iter::once(&self.url).chain(self.mirrors.iter())
	}
}

fn default_enabled() -> bool {
	true
}
