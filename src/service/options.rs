//! Per-operation option structs accepted by [`super::Service`].

use std::time::Duration;

/// Options for [`super::Service::install`].
#[derive(Clone, Debug, Default)]
pub struct InstallOptions {
	/// Restrict the fetch to a single named source; absent source name is an error.
	pub source: Option<String>,
	/// Reinstall even if the requested version is already cached.
	pub force: bool,
	/// Count candidates as installed without downloading anything.
	pub dry_run: bool,
	/// Restrict selection to a category, taking precedence over a category-shaped `target`.
	pub category: Option<String>,
}

/// Options for [`super::Service::update`].
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
	/// Restrict the fetch to a single named source; absent source name is an error.
	pub source: Option<String>,
	/// Restrict selection to a category.
	pub category: Option<String>,
	/// Download even if the cached version is already current.
	pub force: bool,
	/// Count candidates as updated without downloading anything.
	pub dry_run: bool,
}

/// Options for [`super::Service::uninstall`]. Exactly one of `all`, `category`, or a non-empty
/// `target` passed to the call must select entries.
#[derive(Clone, Debug, Default)]
pub struct UninstallOptions {
	/// Remove every installed plugin.
	pub all: bool,
	/// Remove every installed plugin tagged with this category.
	pub category: Option<String>,
}

/// Options for [`super::Service::clean`].
#[derive(Clone, Copy, Debug)]
pub struct CleanOptions {
	/// Prune cached artifact directories untouched for longer than this.
	pub older_than: Duration,
	/// Compute and return the projected result without deleting anything.
	pub dry_run: bool,
}
impl Default for CleanOptions {
	fn default() -> Self {
		Self { older_than: Duration::from_secs(30 * 24 * 60 * 60), dry_run: false }
	}
}

/// Options for [`super::Service::verify`].
#[derive(Clone, Debug, Default)]
pub struct VerifyOptions {
	/// Restrict verification to a single installed plugin; absent means "verify all".
	pub plugin_id: Option<String>,
}
