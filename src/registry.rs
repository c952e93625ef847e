//! In-memory registry: the authoritative index of resident artifacts.
//!
//! An `RwLock`-guarded map with register/unregister/resolve operations, keyed by plugin id,
//! with a category inverted index alongside it for bulk selection.

// std
use std::{
	collections::HashMap,
	sync::{Arc, RwLock},
};
// self
use crate::{
	Error, Result,
	model::{Category, YamlPlugin},
};

/// Thread-safe in-memory index of resident artifacts, keyed by plugin id, with a category
/// inverted index. All operations are atomic under a single reader-writer lock.
#[derive(Debug, Default)]
pub struct Registry {
	state: RwLock<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
	artifacts: HashMap<String, Arc<YamlPlugin>>,
	by_category: HashMap<Category, Vec<String>>,
}

/// One failure from a [`Registry::register_bulk`] call.
#[derive(Debug)]
pub struct RegisterError {
	/// Id of the artifact that failed to register.
	pub id: String,
	/// Why registration failed.
	pub error: Error,
}

impl Registry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Validates and inserts `artifact`, replacing any prior occupant of the same id.
	///
	/// Applies last-writer-wins semantics for duplicate `(id, version)` registration: an existing
	/// entry is unregistered (and its tag-index rows removed) before the new one is inserted.
	pub fn register(&self, artifact: YamlPlugin) -> Result<()> {
		artifact.validate()?;

		if artifact.id.trim().is_empty() {
			return Err(Error::Validation { field: "id", reason: "Must not be empty.".into() });
		}

		let mut state = self.state.write().expect("registry lock poisoned");

		Self::remove_locked(&mut state, &artifact.id);

		let categories: Vec<Category> =
			artifact.tags.iter().filter_map(|tag| Category::parse_strict(tag)).collect();
		let id = artifact.id.clone();

		state.artifacts.insert(id.clone(), Arc::new(artifact));

		for category in categories {
			state.by_category.entry(category).or_default().push(id.clone());
		}

		Ok(())
	}

	/// Registers every artifact in `artifacts`, continuing past individual failures.
	///
	/// Returns the count of successful registrations and the list of per-item errors.
	pub fn register_bulk(&self, artifacts: Vec<YamlPlugin>) -> (usize, Vec<RegisterError>) {
		let mut ok = 0;
		let mut errors = Vec::new();

		for artifact in artifacts {
			let id = artifact.id.clone();

			match self.register(artifact) {
				Ok(()) => ok += 1,
				Err(error) => errors.push(RegisterError { id, error }),
			}
		}

		(ok, errors)
	}

	/// Removes `id` from the registry and every category row it appeared in.
	pub fn unregister(&self, id: &str) -> Result<()> {
		let mut state = self.state.write().expect("registry lock poisoned");

		if !state.artifacts.contains_key(id) {
			return Err(Error::PluginNotFound { id: id.to_string() });
		}

		Self::remove_locked(&mut state, id);

		Ok(())
	}

	fn remove_locked(state: &mut RegistryState, id: &str) {
		if state.artifacts.remove(id).is_none() {
			return;
		}

		state.by_category.retain(|_, ids| {
			ids.retain(|existing| existing != id);
			!ids.is_empty()
		});
	}

	/// Looks up a single artifact by id.
	pub fn get(&self, id: &str) -> Option<Arc<YamlPlugin>> {
		self.state.read().expect("registry lock poisoned").artifacts.get(id).cloned()
	}

	/// Snapshot of every resident artifact.
	pub fn list(&self) -> Vec<Arc<YamlPlugin>> {
		self.state.read().expect("registry lock poisoned").artifacts.values().cloned().collect()
	}

	/// Snapshot of artifacts tagged with `category`.
	pub fn list_by_category(&self, category: Category) -> Vec<Arc<YamlPlugin>> {
		let state = self.state.read().expect("registry lock poisoned");

		state
			.by_category
			.get(&category)
			.into_iter()
			.flatten()
			.filter_map(|id| state.artifacts.get(id).cloned())
			.collect()
	}

	/// Categories currently populated by at least one artifact.
	pub fn categories(&self) -> Vec<Category> {
		self.state.read().expect("registry lock poisoned").by_category.keys().copied().collect()
	}

	/// Number of resident artifacts.
	pub fn count(&self) -> usize {
		self.state.read().expect("registry lock poisoned").artifacts.len()
	}

	/// Removes every artifact and category row.
	pub fn clear(&self) {
		let mut state = self.state.write().expect("registry lock poisoned");

		state.artifacts.clear();
		state.by_category.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::OutputBlock;

	fn plugin(id: &str, tag: &str) -> YamlPlugin {
		YamlPlugin {
			id: id.into(),
			name: id.into(),
			version: semver::Version::new(1, 0, 0),
			plugin_type: Default::default(),
			author: "scanhub".into(),
			min_host_version: None,
			severity: Default::default(),
			tags: std::collections::HashSet::from([tag.to_string()]),
			cve: None,
			triggers: vec![],
			match_block: None,
			output: OutputBlock { message: "m".into(), extra: Default::default() },
			file_path: Default::default(),
			loaded_at: None,
		}
	}

	#[test]
	fn register_then_unregister_clears_category_index() {
		let registry = Registry::new();

		registry.register(plugin("ssh-weak", "ssh")).unwrap();

		assert_eq!(registry.count(), 1);
		assert_eq!(registry.list_by_category(Category::Ssh).len(), 1);

		registry.unregister("ssh-weak").unwrap();

		assert_eq!(registry.count(), 0);
		assert!(registry.categories().is_empty());
	}

	#[test]
	fn register_bulk_continues_past_failures() {
		let registry = Registry::new();
		let mut bad = plugin("bad", "ssh");

		bad.id = "".into();

		let (ok, errors) = registry.register_bulk(vec![plugin("good", "ssh"), bad]);

		assert_eq!(ok, 1);
		assert_eq!(errors.len(), 1);
	}

	#[test]
	fn duplicate_registration_replaces_prior_entry() {
		let registry = Registry::new();

		registry.register(plugin("ssh-weak", "ssh")).unwrap();
		registry.register(plugin("ssh-weak", "network")).unwrap();

		assert_eq!(registry.count(), 1);
		assert!(registry.list_by_category(Category::Ssh).is_empty());
		assert_eq!(registry.list_by_category(Category::Network).len(), 1);
	}
}
