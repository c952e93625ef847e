//! Filesystem watcher that reloads a [`Manifest`] when its backing file changes on disk.
//!
//! A detached background task drives the reload and logs failures rather than propagating them,
//! triggered off `notify` filesystem events rather than a timer.

// std
use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};
// crates.io
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
// self
use crate::{Result, manifest::Manifest};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the directory containing a [`Manifest`]'s file and reloads it on every relevant
/// `Create`/`Write` event, debounced so a burst of writes (e.g. a save-then-rename) triggers a
/// single reload.
///
/// Closing is idempotent: dropping the watcher, or calling [`ManifestWatcher::close`] any number
/// of times, cancels the background task at most once.
#[derive(Debug)]
pub struct ManifestWatcher {
	_watcher: RecommendedWatcher,
	shutdown: CancellationToken,
	task: Option<tokio::task::JoinHandle<()>>,
}
impl ManifestWatcher {
	/// Spawns a watcher for `manifest`, debouncing relevant events by `debounce`.
	pub fn spawn(manifest: Arc<Manifest>, debounce: Duration) -> Result<Self> {
		let watch_path = manifest.path().to_path_buf();
		let parent = watch_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
		let file_name = watch_path.file_name().map(|name| name.to_owned());
		let (tx, rx) = mpsc::unbounded_channel();

		let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
			if let Ok(event) = event {
				let _ = tx.send(event);
			}
		})?;

		watcher.watch(&parent, RecursiveMode::NonRecursive)?;

		let shutdown = CancellationToken::new();
		let task = tokio::spawn(run(manifest, rx, file_name, debounce, shutdown.clone()));

		Ok(Self { _watcher: watcher, shutdown, task: Some(task) })
	}

	/// Spawns a watcher using the default 100ms debounce.
	pub fn spawn_default(manifest: Arc<Manifest>) -> Result<Self> {
		Self::spawn(manifest, DEFAULT_DEBOUNCE)
	}

	/// Stops the background task, waiting for it to finish. Safe to call more than once.
	pub async fn close(&mut self) {
		self.shutdown.cancel();

		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}
impl Drop for ManifestWatcher {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

async fn run(
	manifest: Arc<Manifest>,
	mut events: mpsc::UnboundedReceiver<Event>,
	file_name: Option<std::ffi::OsString>,
	debounce: Duration,
	shutdown: CancellationToken,
) {
	loop {
		let event = tokio::select! {
			_ = shutdown.cancelled() => return,
			event = events.recv() => match event {
				Some(event) => event,
				None => return,
			},
		};

		if !is_relevant(&event, file_name.as_deref()) {
			continue;
		}

		// Drain further relevant events for `debounce`, collapsing a burst into one reload.
		loop {
			tokio::select! {
				_ = shutdown.cancelled() => return,
				_ = tokio::time::sleep(debounce) => break,
				event = events.recv() => match event {
					Some(event) if is_relevant(&event, file_name.as_deref()) => continue,
					Some(_) => continue,
					None => return,
				},
			}
		}

		if let Err(err) = manifest.reload().await {
			tracing::warn!(error = %err, "failed to reload manifest after filesystem change");
		} else {
			tracing::debug!("reloaded manifest after filesystem change");
		}
	}
}

fn is_relevant(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
	let kind_matches =
		matches!(event.kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any));

	if !kind_matches {
		return false;
	}

	match file_name {
		Some(file_name) => event.paths.iter().any(|path| path.file_name() == Some(file_name)),
		None => true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{manifest::ManifestEntry, model::PluginType, model::Severity, verify::Checksum};

	fn sample_entry(id: &str) -> ManifestEntry {
		ManifestEntry {
			id: id.into(),
			name: id.into(),
			version: semver::Version::new(1, 0, 0),
			plugin_type: PluginType::Evaluation,
			author: "scanhub".into(),
			checksum: Checksum::from_sha256_hex("a".repeat(64)),
			download_url: url::Url::parse("https://example.test/plugin.yaml").unwrap(),
			installed_at: chrono::Utc::now(),
			last_verified: None,
			path: PathBuf::from(id).join("1.0.0").join("plugin.yaml"),
			tags: Default::default(),
			severity: Severity::Medium,
		}
	}

	#[tokio::test]
	async fn reloads_after_external_write() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("registry.json");
		let manifest = Arc::new(Manifest::new(&path).await.unwrap());

		manifest.load().await.unwrap();

		let mut watcher = ManifestWatcher::spawn(manifest.clone(), Duration::from_millis(20)).unwrap();

		let writer = Manifest::new(&path).await.unwrap();

		writer.add(sample_entry("ssh-weak")).await.unwrap();
		writer.save().await.unwrap();

		tokio::time::sleep(Duration::from_millis(200)).await;

		assert_eq!(manifest.count().await.unwrap(), 1);

		watcher.close().await;
		watcher.close().await;
	}
}
