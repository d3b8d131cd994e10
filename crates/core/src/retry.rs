//! One declarative retry policy for the few steps allowed to retry.
//!
//! The workflows deliberately do not wrap every step in retries — only
//! the confirmation reload loop and the login two-factor branch are
//! retryable, both bounded by a policy instance from the config.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub backoff_ms: u64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff_ms: 2_000,
		}
	}
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			backoff_ms,
		}
	}

	pub fn backoff(&self) -> Duration {
		Duration::from_millis(self.backoff_ms)
	}

	/// Runs `op` until it succeeds, the predicate declares an error
	/// terminal, or attempts are exhausted. The attempt number (1-based)
	/// is passed to `op`.
	pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> std::result::Result<T, E>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = std::result::Result<T, E>>,
		P: Fn(&E) -> bool,
	{
		let attempts = self.max_attempts.max(1);
		let mut attempt = 0;
		loop {
			attempt += 1;
			match op(attempt).await {
				Ok(value) => return Ok(value),
				Err(err) => {
					if attempt >= attempts || !retryable(&err) {
						return Err(err);
					}
				}
			}
			tokio::time::sleep(self.backoff()).await;
		}
	}

	/// [`run_if`](Self::run_if) with every error retryable.
	pub async fn run<T, E, F, Fut>(&self, op: F) -> std::result::Result<T, E>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = std::result::Result<T, E>>,
	{
		self.run_if(op, |_| true).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn succeeds_on_a_later_attempt() {
		let policy = RetryPolicy::new(4, 0);
		let result: Result<u32, &str> = policy
			.run(|attempt| async move {
				if attempt < 3 { Err("not yet") } else { Ok(attempt) }
			})
			.await;
		assert_eq!(result, Ok(3));
	}

	#[tokio::test]
	async fn exhausts_attempts_and_returns_last_error() {
		let policy = RetryPolicy::new(3, 0);
		let mut calls = 0;
		let result: Result<(), String> = policy
			.run(|attempt| {
				calls += 1;
				async move { Err(format!("attempt {attempt}")) }
			})
			.await;
		assert_eq!(result.unwrap_err(), "attempt 3");
		assert_eq!(calls, 3);
	}

	#[tokio::test]
	async fn terminal_errors_stop_immediately() {
		let policy = RetryPolicy::new(5, 0);
		let mut calls = 0;
		let result: Result<(), &str> = policy
			.run_if(
				|_| {
					calls += 1;
					async { Err("terminal") }
				},
				|err| *err != "terminal",
			)
			.await;
		assert_eq!(result.unwrap_err(), "terminal");
		assert_eq!(calls, 1);
	}

	#[tokio::test]
	async fn zero_attempts_still_runs_once() {
		let policy = RetryPolicy::new(0, 0);
		let result: Result<u32, &str> = policy.run(|attempt| async move { Ok(attempt) }).await;
		assert_eq!(result, Ok(1));
	}
}
