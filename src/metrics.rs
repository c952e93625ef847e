//! Metrics helpers for plugin lifecycle events, gated behind the `metrics` feature (and the
//! `prometheus` feature for the exporter itself).
//!
//! A process-wide `OnceLock<PrometheusHandle>` singleton, `SmallVec<[Label; 4]>` label sets, and
//! a debugging-recorder test harness cover install/download/update/verify events per source.

// std
use std::{
	sync::OnceLock,
	time::Duration,
};
// crates.io
use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::{Error, Result};

type LabelSet = SmallVec<[Label; 4]>;

const METRIC_INSTALL_TOTAL: &str = "scanhub_plugins_install_total";
const METRIC_UPDATE_TOTAL: &str = "scanhub_plugins_update_total";
const METRIC_UNINSTALL_TOTAL: &str = "scanhub_plugins_uninstall_total";
const METRIC_DOWNLOAD_TOTAL: &str = "scanhub_plugins_download_total";
const METRIC_DOWNLOAD_DURATION: &str = "scanhub_plugins_download_duration_seconds";
const METRIC_VERIFY_TOTAL: &str = "scanhub_plugins_verify_total";
const METRIC_CACHE_SIZE_BYTES: &str = "scanhub_plugins_cache_size_bytes";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new().install_recorder().map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Accesses the global Prometheus exporter handle, once installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Records one [`crate::service::Service::install`] candidate outcome.
pub fn record_install(source: &str, outcome: &'static str) {
	metrics::counter!(METRIC_INSTALL_TOTAL, status_labels(source, outcome).iter()).increment(1);
}

/// Records one [`crate::service::Service::update`] candidate outcome.
pub fn record_update(source: &str, outcome: &'static str) {
	metrics::counter!(METRIC_UPDATE_TOTAL, status_labels(source, outcome).iter()).increment(1);
}

/// Records one [`crate::service::Service::uninstall`] candidate outcome.
pub fn record_uninstall(outcome: &'static str) {
	metrics::counter!(METRIC_UNINSTALL_TOTAL, [Label::new("outcome", outcome)].iter()).increment(1);
}

/// Records a single artifact download attempt and, on success, its latency.
pub fn record_download(source: &str, outcome: &'static str, duration: Duration) {
	metrics::counter!(METRIC_DOWNLOAD_TOTAL, status_labels(source, outcome).iter()).increment(1);

	if outcome == "success" {
		metrics::histogram!(METRIC_DOWNLOAD_DURATION, base_labels(source).iter()).record(duration.as_secs_f64());
	}
}

/// Records one [`crate::service::Service::verify`] per-plugin outcome.
pub fn record_verify(outcome: &'static str) {
	metrics::counter!(METRIC_VERIFY_TOTAL, [Label::new("outcome", outcome)].iter()).increment(1);
}

/// Records the current on-disk cache footprint, as last measured by
/// [`crate::service::Service::clean`] or [`crate::service::Service::get_info`].
pub fn record_cache_size(bytes: u64) {
	metrics::gauge!(METRIC_CACHE_SIZE_BYTES).set(bytes as f64);
}

fn base_labels(source: &str) -> LabelSet {
	let mut labels = LabelSet::with_capacity(1);

	labels.push(Label::new("source", source.to_owned()));

	labels
}

fn status_labels(source: &str, outcome: &'static str) -> LabelSet {
	let mut labels = base_labels(source);

	labels.push(Label::new("outcome", outcome));

	labels
}

#[cfg(test)]
mod tests {
	// std
	use std::borrow::Borrow;
	// crates.io
	use metrics_util::{
		CompositeKey, MetricKind,
		debugging::{DebugValue, DebuggingRecorder},
	};
	// self
	use super::*;

	fn capture_metrics<F>(f: F) -> Vec<(CompositeKey, DebugValue)>
	where
		F: FnOnce(),
	{
		let recorder = DebuggingRecorder::new();
		let snapshotter = recorder.snapshotter();

		metrics::with_local_recorder(&recorder, f);

		snapshotter.snapshot().into_vec().into_iter().map(|(key, _, _, value)| (key, value)).collect()
	}

	fn counter_value(snapshot: &[(CompositeKey, DebugValue)], name: &str, labels: &[(&str, &str)]) -> u64 {
		snapshot
			.iter()
			.find_map(|(key, value)| {
				(key.kind() == MetricKind::Counter
					&& Borrow::<str>::borrow(key.key().name()) == name
					&& labels_match(key, labels))
				.then(|| match value {
					DebugValue::Counter(value) => *value,
					_ => 0,
				})
			})
			.unwrap_or(0)
	}

	fn last_histogram_value(snapshot: &[(CompositeKey, DebugValue)], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
		snapshot.iter().find_map(|(key, value)| {
			if key.kind() == MetricKind::Histogram
				&& Borrow::<str>::borrow(key.key().name()) == name
				&& labels_match(key, labels)
			{
				if let DebugValue::Histogram(values) = value { values.last().map(|v| v.into_inner()) } else { None }
			} else {
				None
			}
		})
	}

	fn labels_match(key: &CompositeKey, expected: &[(&str, &str)]) -> bool {
		let mut labels: Vec<_> = key.key().labels().map(|label| (label.key(), label.value())).collect();

		labels.sort_unstable();

		let mut expected_sorted: Vec<_> = expected.to_vec();

		expected_sorted.sort_unstable();

		labels.len() == expected_sorted.len()
			&& labels.into_iter().zip(expected_sorted).all(|((lk, lv), (ek, ev))| lk == ek && lv == ev)
	}

	#[test]
	fn records_install_outcomes() {
		let snapshot = capture_metrics(|| {
			record_install("official", "installed");
			record_install("official", "skipped");
			record_install("official", "failed");
		});

		assert_eq!(counter_value(&snapshot, METRIC_INSTALL_TOTAL, &[("source", "official"), ("outcome", "installed")]), 1);
		assert_eq!(counter_value(&snapshot, METRIC_INSTALL_TOTAL, &[("source", "official"), ("outcome", "skipped")]), 1);
		assert_eq!(counter_value(&snapshot, METRIC_INSTALL_TOTAL, &[("source", "official"), ("outcome", "failed")]), 1);
	}

	#[test]
	#[cfg_attr(miri, ignore)]
	fn records_download_duration_on_success_only() {
		let snapshot = capture_metrics(|| {
			record_download("official", "success", Duration::from_millis(50));
			record_download("official", "error", Duration::from_millis(10));
		});
		let base = [("source", "official")];

		let duration =
			last_histogram_value(&snapshot, METRIC_DOWNLOAD_DURATION, &base).expect("download duration recorded");

		assert!((duration - 0.050).abs() < 1e-6, "expected ~50ms histogram, got {duration}");
		assert_eq!(counter_value(&snapshot, METRIC_DOWNLOAD_TOTAL, &[("source", "official"), ("outcome", "error")]), 1);
	}
}
