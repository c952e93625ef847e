//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable error code surfaced to callers, per the external error taxonomy.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	PluginNotFound,
	PluginAlreadyInstalled,
	NoPluginsFound,
	SourceNotAvailable,
	ChecksumMismatch,
	InvalidOption,
	InvalidInput,
	PartialFailure,
}
impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::PluginNotFound => "PLUGIN_NOT_FOUND",
			Self::PluginAlreadyInstalled => "PLUGIN_ALREADY_INSTALLED",
			Self::NoPluginsFound => "NO_PLUGINS_FOUND",
			Self::SourceNotAvailable => "SOURCE_NOT_AVAILABLE",
			Self::ChecksumMismatch => "CHECKSUM_MISMATCH",
			Self::InvalidOption => "INVALID_OPTION",
			Self::InvalidInput => "INVALID_INPUT",
			Self::PartialFailure => "PARTIAL_FAILURE",
		};

		f.write_str(name)
	}
}
impl ErrorCode {
	/// A short actionable hint shown alongside the error.
	pub fn suggestion(self) -> &'static str {
		match self {
			Self::PluginNotFound => "check the plugin id and available sources",
			Self::PluginAlreadyInstalled => "retry with --force to reinstall",
			Self::NoPluginsFound => "check the category or plugin id filter",
			Self::SourceNotAvailable => "check the source name and configuration",
			Self::ChecksumMismatch => "the upstream artifact may be corrupt; retry or report to the source maintainer",
			Self::InvalidOption | Self::InvalidInput => "check the supplied arguments",
			Self::PartialFailure => "inspect the per-plugin errors and retry the failed entries",
		}
	}
}

/// Unified error type for the plugin lifecycle engine.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Yaml(#[from] serde_yaml::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),
	#[error(transparent)]
	Semver(#[from] semver::Error),
	#[error(transparent)]
	Notify(#[from] notify::Error),

	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
	#[error("Plugin '{id}' not found.")]
	PluginNotFound { id: String },
	#[error("Plugin '{id}' is already installed; retry with force to reinstall.")]
	AlreadyInstalled { id: String },
	#[error("No plugins matched the requested selection.")]
	NoPluginsFound,
	#[error("Source '{name}' is not available.")]
	SourceNotAvailable { name: String },
	#[error("Checksum verification failed for '{id}': expected {expected}, computed {computed}.")]
	ChecksumMismatch { id: String, expected: String, computed: String },
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Operation was cancelled.")]
	Cancelled,
	#[error("{attempts} attempts exhausted, last error: {source}")]
	RetriesExhausted { attempts: u32, #[source] source: Box<Error> },
	#[error("Unsupported checksum algorithm '{0}'; only sha256 is supported.")]
	UnsupportedChecksumAlgorithm(String),
	#[error("failed to fetch manifest from {source}: {reason}")]
	ManifestFetchFailed { source: String, reason: String },
	#[error("unexpected status code: {0}")]
	UnexpectedStatus(u16),

	/// A bulk operation completed with at least one per-item failure. Carries the same
	/// accumulated outcome the method also returned via `Ok`-style data, so callers that match
	/// on `Err` still have the full result.
	#[error("operation completed with failures: {0:?}")]
	PartialFailure(Box<crate::service::BulkOutcome>),
	/// A bulk operation was cancelled partway through. Carries the outcome accumulated before
	/// the cancellation was observed, carrying the accumulated counts plus the cancellation cause
	/// contract.
	#[error("operation was cancelled after partial progress: {0:?}")]
	CancelledPartial(Box<crate::service::BulkOutcome>),

	#[cfg(feature = "metrics")]
	#[error("Metrics error: {0}")]
	Metrics(String),
}

impl Error {
	/// Maps this error onto the machine-readable taxonomy, best-effort.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::PluginNotFound { .. } => ErrorCode::PluginNotFound,
			Self::AlreadyInstalled { .. } => ErrorCode::PluginAlreadyInstalled,
			Self::NoPluginsFound => ErrorCode::NoPluginsFound,
			Self::SourceNotAvailable { .. } | Self::ManifestFetchFailed { .. } => ErrorCode::SourceNotAvailable,
			Self::ChecksumMismatch { .. } => ErrorCode::ChecksumMismatch,
			Self::InvalidInput(_) | Self::Validation { .. } => ErrorCode::InvalidInput,
			Self::PartialFailure(_) => ErrorCode::PartialFailure,
			_ => ErrorCode::InvalidOption,
		}
	}
}
