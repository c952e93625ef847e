//! Public result types returned by [`super::Service`] operations.

// std
use std::collections::HashSet;
// crates.io
use chrono::{DateTime, Utc};
// self
use crate::{
	ErrorCode,
	manifest::ManifestEntry,
	model::{PluginType, Severity},
	verify::Checksum,
};

/// A single per-plugin failure inside a bulk result.
#[derive(Clone, Debug)]
pub struct PluginError {
	/// Id of the plugin this failure is about.
	pub plugin_id: String,
	/// Human-readable failure message.
	pub message: String,
	/// Machine-readable taxonomy code.
	pub code: ErrorCode,
	/// Short actionable hint.
	pub suggestion: &'static str,
}
impl PluginError {
	/// Builds a per-plugin error from a crate [`crate::Error`], deriving `code`/`suggestion` from it.
	pub fn from_error(plugin_id: impl Into<String>, error: &crate::Error) -> Self {
		let code = error.code();

		Self { plugin_id: plugin_id.into(), message: error.to_string(), code, suggestion: code.suggestion() }
	}
}

/// Public projection of an installed plugin, returned by [`super::Service::list`],
/// [`super::Service::install`], and [`super::Service::update`].
#[derive(Clone, Debug)]
pub struct PluginInfo {
	/// Plugin slug.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Installed (or, for dry runs, resolved) version.
	pub version: semver::Version,
	/// Plugin kind.
	pub plugin_type: PluginType,
	/// Author attribution.
	pub author: String,
	/// Checksum recorded at install time.
	pub checksum: Checksum,
	/// URL the artifact was downloaded from.
	pub download_url: url::Url,
	/// When this plugin was installed.
	pub installed_at: DateTime<Utc>,
	/// When this plugin was last successfully verified, if ever.
	pub last_verified: Option<DateTime<Utc>>,
	/// Classification tags.
	pub tags: HashSet<String>,
	/// Severity rating.
	pub severity: Severity,
}
impl From<&ManifestEntry> for PluginInfo {
	fn from(entry: &ManifestEntry) -> Self {
		Self {
			id: entry.id.clone(),
			name: entry.name.clone(),
			version: entry.version.clone(),
			plugin_type: entry.plugin_type,
			author: entry.author.clone(),
			checksum: entry.checksum.clone(),
			download_url: entry.download_url.clone(),
			installed_at: entry.installed_at,
			last_verified: entry.last_verified,
			tags: entry.tags.clone(),
			severity: entry.severity,
		}
	}
}

/// Extended [`PluginInfo`] returned by [`super::Service::get_info`], additionally carrying the
/// resolved on-disk cache footprint.
#[derive(Clone, Debug)]
pub struct PluginDetail {
	/// The plugin's public info projection.
	pub info: PluginInfo,
	/// Total bytes occupied by this plugin's cache directory. Downgrades to `0` on any
	/// filesystem error rather than failing the whole operation.
	pub cache_size_bytes: u64,
}

/// Outcome of [`super::Service::install`].
#[derive(Clone, Debug, Default)]
pub struct InstallOutcome {
	/// Plugins newly downloaded and recorded.
	pub installed: usize,
	/// Plugins already installed at the requested version, left untouched.
	pub skipped: usize,
	/// Plugins that failed to install.
	pub failed: usize,
	/// Info for every successfully (or dry-run) installed plugin.
	pub plugins: Vec<PluginInfo>,
	/// Per-plugin failures.
	pub errors: Vec<PluginError>,
}

/// Outcome of [`super::Service::update`].
#[derive(Clone, Debug, Default)]
pub struct UpdateOutcome {
	/// Plugins upgraded to a newer version.
	pub updated: usize,
	/// Plugins already at the latest version, or left untouched by a dry run.
	pub skipped: usize,
	/// Plugins that failed to update.
	pub failed: usize,
	/// Info for every successfully (or dry-run) updated plugin.
	pub plugins: Vec<PluginInfo>,
	/// Per-plugin failures.
	pub errors: Vec<PluginError>,
}

/// Outcome of [`super::Service::uninstall`].
#[derive(Clone, Debug, Default)]
pub struct UninstallOutcome {
	/// Entries removed from the cache and manifest.
	pub removed: usize,
	/// Entries that failed to remove.
	pub failed: usize,
	/// Entries left installed after this call.
	pub remaining: usize,
	/// Per-plugin failures.
	pub errors: Vec<PluginError>,
}

/// Outcome of [`super::Service::clean`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CleanOutcome {
	/// Cached artifact versions removed.
	pub removed: usize,
	/// Cache size in bytes before pruning.
	pub before: u64,
	/// Cache size in bytes after pruning (equal to `before` on a dry run).
	pub after: u64,
	/// Bytes freed (`before - after`).
	pub freed: u64,
}

/// Classification of a single [`VerifyEntry`]'s outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyStatus {
	/// The artifact is present and matches its recorded checksum.
	Ok,
	/// The artifact is no longer present in the cache.
	Missing,
	/// The artifact is present but its checksum no longer matches.
	Checksum,
	/// Verification could not be completed for another reason.
	Error,
}

/// Per-plugin result from [`super::Service::verify`].
#[derive(Clone, Debug)]
pub struct VerifyEntry {
	/// Plugin slug.
	pub id: String,
	/// Installed version checked.
	pub version: semver::Version,
	/// Whether the artifact matched its recorded checksum.
	pub valid: bool,
	/// Failure detail, present whenever `valid` is `false`.
	pub error: Option<String>,
	/// Classification of this entry's outcome.
	pub error_type: VerifyStatus,
}

/// Aggregate result of [`super::Service::verify`].
#[derive(Clone, Debug, Default)]
pub struct VerifyResult {
	/// Entries checked.
	pub total: usize,
	/// Entries that verified successfully.
	pub success: usize,
	/// Entries that failed verification.
	pub failed: usize,
	/// Per-plugin detail.
	pub results: Vec<VerifyEntry>,
}

/// The concrete outcome carried by [`crate::Error::PartialFailure`] so callers that match on
/// `Err` still get the full accumulated result.
#[derive(Clone, Debug)]
pub enum BulkOutcome {
	/// From [`super::Service::install`].
	Install(InstallOutcome),
	/// From [`super::Service::update`].
	Update(UpdateOutcome),
	/// From [`super::Service::uninstall`].
	Uninstall(UninstallOutcome),
}
