//! Reads YAML/JSON plugin artifacts from disk into [`YamlPlugin`] domain objects.
//!
//! [`load_recursive`] walks the directory tree with `WalkDir`; both it and [`load_all`] follow
//! a "decode what you can, collect the rest, return both" partial-failure accounting discipline
//! rather than aborting on the first bad file.

// std
use std::path::{Path, PathBuf};
// crates.io
use chrono::Utc;
use walkdir::WalkDir;
// self
use crate::{
	Error, Result,
	model::YamlPlugin,
};

/// One file's worth of failure from a multi-file load.
#[derive(Debug)]
pub struct LoadError {
	/// Path of the file that failed to load.
	pub path: PathBuf,
	/// Why it failed.
	pub error: Error,
}

/// The outcome of a directory load: artifacts that decoded cleanly, plus per-file failures.
#[derive(Debug, Default)]
pub struct LoadResult {
	/// Successfully decoded and validated artifacts.
	pub plugins: Vec<YamlPlugin>,
	/// Per-file failures encountered along the way.
	pub errors: Vec<LoadError>,
}

/// Loads a single plugin artifact from `path`.
///
/// Decodes by extension (`.yaml`/`.yml` via `serde_yaml`, `.json` via `serde_json`), then
/// populates the runtime-only fields (`file_path`, `loaded_at`) and validates against the
/// invariants. Unsupported extensions are rejected.
pub fn load(path: &Path) -> Result<YamlPlugin> {
	let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
	let contents = std::fs::read_to_string(path)?;

	let mut plugin: YamlPlugin = match extension.as_str() {
		"yaml" | "yml" => serde_yaml::from_str(&contents)?,
		"json" => serde_json::from_str(&contents)?,
		other => {
			return Err(Error::Validation {
				field: "file_path",
				reason: format!("Unsupported plugin artifact extension '{other}'."),
			});
		},
	};

	plugin.file_path = path.to_path_buf();
	plugin.loaded_at = Some(Utc::now());
	plugin.validate()?;

	Ok(plugin)
}

/// Loads every plugin artifact directly inside `dir`, ignoring subdirectories and non-plugin
/// files. Per-file failures are collected rather than aborting the whole load.
pub fn load_all(dir: &Path) -> Result<LoadResult> {
	let mut result = LoadResult::default();

	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(err) => return Err(Error::from(err)),
	};

	for entry in entries {
		let entry = entry?;
		let path = entry.path();

		if !path.is_file() || !is_plugin_file(&path) {
			continue;
		}

		match load(&path) {
			Ok(plugin) => result.plugins.push(plugin),
			Err(error) => result.errors.push(LoadError { path, error }),
		}
	}

	Ok(result)
}

/// Loads every plugin artifact under `root`, walking all depths.
pub fn load_recursive(root: &Path) -> Result<LoadResult> {
	let mut result = LoadResult::default();

	for entry in WalkDir::new(root).into_iter().filter_map(|entry| entry.ok()) {
		let path = entry.path();

		if !path.is_file() || !is_plugin_file(path) {
			continue;
		}

		match load(path) {
			Ok(plugin) => result.plugins.push(plugin),
			Err(error) => result.errors.push(LoadError { path: path.to_path_buf(), error }),
		}
	}

	Ok(result)
}

fn is_plugin_file(path: &Path) -> bool {
	matches!(
		path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase()).as_deref(),
		Some("yaml" | "yml" | "json")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write_plugin(dir: &Path, name: &str) {
		let body = format!(
			"id: {name}\nname: Sample\nversion: 1.0.0\nauthor: scanhub\noutput:\n  message: hi\n"
		);

		std::fs::write(dir.join(format!("{name}.yaml")), body).unwrap();
	}

	#[test]
	fn load_all_ignores_subdirectories_and_collects_errors() {
		let dir = tempfile::tempdir().unwrap();

		write_plugin(dir.path(), "ssh-weak-cipher");
		std::fs::write(dir.path().join("bad.yaml"), "not: [valid").unwrap();
		std::fs::create_dir(dir.path().join("nested")).unwrap();
		write_plugin(&dir.path().join("nested"), "ignored-plugin");

		let result = load_all(dir.path()).unwrap();

		assert_eq!(result.plugins.len(), 1);
		assert_eq!(result.errors.len(), 1);
	}

	#[test]
	fn load_recursive_descends_into_subdirectories() {
		let dir = tempfile::tempdir().unwrap();

		std::fs::create_dir(dir.path().join("nested")).unwrap();
		write_plugin(&dir.path().join("nested"), "nested-plugin");

		let result = load_recursive(dir.path()).unwrap();

		assert_eq!(result.plugins.len(), 1);
		assert!(result.errors.is_empty());
	}

	#[test]
	fn load_rejects_unsupported_extension() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("plugin.toml");

		std::fs::write(&path, "id = \"x\"").unwrap();

		assert!(load(&path).is_err());
	}
}
