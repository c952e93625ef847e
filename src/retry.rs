//! Retry policy: exponential backoff with jitter and classified retryability.

// std
use std::{future::Future, time::Duration};
// crates.io
use rand::Rng;
use tokio_util::sync::CancellationToken;
// self
use crate::{Error, Result, cancel};

/// Jitter strategy applied to the computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
	/// No randomization; use the computed delay as-is.
	None,
	/// Uniform jitter of ±25% around the computed delay.
	#[default]
	Uniform,
}

/// Configuration for [`RetryExecutor`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
	/// Maximum number of attempts. `0` means "attempt once, no retries".
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub initial_wait: Duration,
	/// Upper bound on the backoff delay.
	pub max_wait: Duration,
	/// Multiplier applied to the delay after each failed attempt.
	pub multiplier: f64,
	/// Jitter strategy applied to the computed delay.
	#[serde(default)]
	pub jitter: JitterStrategy,
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			initial_wait: Duration::from_millis(250),
			max_wait: Duration::from_secs(5),
			multiplier: 2.0,
			jitter: JitterStrategy::Uniform,
		}
	}
}
impl RetryPolicy {
	/// Validates the policy's invariants.
	pub fn validate(&self) -> Result<()> {
		if self.multiplier < 1.0 {
			return Err(Error::Validation { field: "retry_policy.multiplier", reason: "Must be >= 1.0.".into() });
		}
		if self.max_attempts > 0 {
			if self.max_wait > Duration::ZERO && self.initial_wait > self.max_wait {
				return Err(Error::Validation {
					field: "retry_policy.initial_wait",
					reason: "Must be <= max_wait when max_wait > 0.".into(),
				});
			}
		}
		Ok(())
	}

	/// Computes the backoff delay before attempt number `attempt` (0-indexed, 0 = first retry).
	pub fn backoff_for(&self, attempt: u32) -> Duration {
		let exponent = attempt.min(32);
		let base = self.initial_wait.mul_f64(self.multiplier.powi(exponent as i32));
		let bounded = if self.max_wait > Duration::ZERO { base.min(self.max_wait) } else { base };

		match self.jitter {
			JitterStrategy::None => bounded,
			JitterStrategy::Uniform => jittered(bounded),
		}
	}
}

fn jittered(delay: Duration) -> Duration {
	if delay.is_zero() {
		return delay;
	}

	let factor = rand::rng().random_range(0.75..=1.25);

	delay.mul_f64(factor)
}

/// Classifies whether `error` should be retried.
///
/// Retryable: connection refused/reset, DNS resolution failure, network unreachable, transport
/// timeouts, and HTTP 502/503/504 responses. Non-retryable: cancellation, checksum/validation
/// failures, and any other HTTP status. Unknown errors default to non-retryable.
pub fn is_retryable(error: &Error) -> bool {
	match error {
		Error::Cancelled => false,
		Error::Reqwest(err) => {
			if err.is_timeout() || err.is_connect() {
				return true;
			}
			if let Some(status) = err.status() {
				return matches!(status.as_u16(), 502 | 503 | 504);
			}
			false
		},
		Error::Io(err) => matches!(
			err.kind(),
			std::io::ErrorKind::ConnectionRefused
				| std::io::ErrorKind::ConnectionReset
				| std::io::ErrorKind::TimedOut
				| std::io::ErrorKind::NotConnected
		),
		Error::UnexpectedStatus(status) => matches!(*status, 502 | 503 | 504),
		_ => false,
	}
}

/// Drives an async fallible operation under a [`RetryPolicy`], respecting cancellation.
#[derive(Debug)]
pub struct RetryExecutor<'a> {
	policy: &'a RetryPolicy,
	token: &'a CancellationToken,
	attempts_used: u32,
}
impl<'a> RetryExecutor<'a> {
	/// Creates a new executor bound to `policy` and `token`.
	pub fn new(policy: &'a RetryPolicy, token: &'a CancellationToken) -> Self {
		Self { policy, token, attempts_used: 0 }
	}

	/// Runs `op` up to `policy.max_attempts + 1` times, sleeping between attempts per the
	/// backoff schedule. Returns the first success, or [`Error::RetriesExhausted`] wrapping the
	/// last error once the budget is spent.
	pub async fn run<T, F, Fut>(&mut self, mut op: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		loop {
			cancel::ensure_live(self.token)?;

			let attempt = self.attempts_used;
			let result = op().await;

			match result {
				Ok(value) => return Ok(value),
				Err(err) if matches!(err, Error::Cancelled) => return Err(err),
				Err(err) => {
					let retryable = is_retryable(&err);

					tracing::debug!(attempt, retryable, error = %err, "attempt failed");

					if !retryable || attempt >= self.policy.max_attempts {
						return Err(Error::RetriesExhausted { attempts: attempt + 1, source: Box::new(err) });
					}

					let delay = self.policy.backoff_for(attempt);

					self.attempts_used += 1;

					cancel::sleep_cancellable(self.token, delay).await?;
				},
			}
		}
	}

	/// Number of attempts already consumed.
	pub fn attempts_used(&self) -> u32 {
		self.attempts_used
	}
}
