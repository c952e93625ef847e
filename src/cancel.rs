//! Cooperative cancellation helpers threaded through every long-running operation.

// crates.io
use tokio::time;
use tokio_util::sync::CancellationToken;
// self
use crate::{Error, Result};

/// Returns [`Error::Cancelled`] if `token` has already been triggered.
///
/// Every bulk loop and I/O boundary calls this before doing work, per the concurrency model's
/// requirement that cancellation is checked before each iteration.
pub fn ensure_live(token: &CancellationToken) -> Result<()> {
	if token.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
}

/// Sleeps for `duration`, returning early with [`Error::Cancelled`] if `token` fires first.
///
/// The wait itself is a suspension point that must honor cancellation, rather than sleeping
/// unconditionally and only checking afterward.
pub async fn sleep_cancellable(token: &CancellationToken, duration: std::time::Duration) -> Result<()> {
	if duration.is_zero() {
		return ensure_live(token);
	}

	tokio::select! {
		_ = token.cancelled() => Err(Error::Cancelled),
		_ = time::sleep(duration) => ensure_live(token),
	}
}
