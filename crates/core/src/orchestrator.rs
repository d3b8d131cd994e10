//! Bounded-concurrency fan-out of tasks across profiles.
//!
//! The pool runs `min(profile_count, cap)` workers; results come back in
//! completion order, not submission order. Cancellation is cooperative:
//! workers observe the shared flag at state-machine transitions, so an
//! in-flight network call always runs to completion or its own timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::collab::{SharedPersistence, SharedProfiles};
use crate::config::Config;
use crate::error::{Result, TaskError};
use crate::slots::{GridInfo, SlotAllocator};
use crate::tasks::{TaskJob, TaskResult, TaskRunner};

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub(crate) fn checkpoint(&self) -> Result<()> {
		if self.is_cancelled() {
			Err(TaskError::Cancelled)
		} else {
			Ok(())
		}
	}
}

pub struct Orchestrator {
	runner: Arc<TaskRunner>,
	pool_cap: usize,
	cancel: CancelFlag,
}

impl Orchestrator {
	/// Builds the orchestrator with its own allocator instance; nothing
	/// here is global, so parallel orchestrators (and tests) get
	/// isolated grids.
	pub fn new(config: Arc<Config>, profiles: SharedProfiles, store: SharedPersistence) -> Self {
		let allocator = Arc::new(SlotAllocator::new(config.screen, config.window));
		let cancel = CancelFlag::new();
		let pool_cap = config.pool_cap.max(1);
		let runner = Arc::new(TaskRunner::new(
			config,
			allocator,
			profiles,
			store,
			cancel.clone(),
		));
		Self {
			runner,
			pool_cap,
			cancel,
		}
	}

	/// Handle for requesting a cooperative stop from outside the run.
	pub fn cancel_handle(&self) -> CancelFlag {
		self.cancel.clone()
	}

	pub fn grid_info(&self) -> GridInfo {
		self.runner.allocator.grid_info()
	}

	/// Runs every job, at most `min(jobs, cap)` concurrently, and
	/// collects results in completion order. A single profile's failure
	/// never aborts the run.
	pub async fn run_all(&self, jobs: Vec<TaskJob>) -> Vec<TaskResult> {
		let pool = self.pool_cap.min(jobs.len().max(1));
		info!(target: "drover::orchestrator", jobs = jobs.len(), pool, "run start");

		let semaphore = Arc::new(Semaphore::new(pool));
		let mut workers = JoinSet::new();
		for job in jobs {
			let semaphore = Arc::clone(&semaphore);
			let runner = Arc::clone(&self.runner);
			workers.spawn(async move {
				// Never closed; a closed semaphore would only mean the
				// run is being torn down, so running unthrottled is fine.
				let _permit = semaphore.acquire_owned().await.ok();
				runner.run(job).await
			});
		}

		let mut results = Vec::with_capacity(workers.len());
		while let Some(joined) = workers.join_next().await {
			match joined {
				Ok(result) => results.push(result),
				Err(err) => error!(target: "drover::orchestrator", %err, "worker died"),
			}
		}
		info!(target: "drover::orchestrator", finished = results.len(), "run complete");
		results
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::collab::{MemoryStore, StaticProfiles};
	use crate::tasks::{Outcome, TaskSpec};

	fn orchestrator(profile_count: u16) -> (Orchestrator, Arc<MemoryStore>) {
		let mut config = Config::default();
		config.command_timeout_ms = 300;
		config.pool_cap = 2;
		config.ready.attempts = 1;
		config.ready.interval_ms = 10;
		// Dead ports: everything fails at Connect, quickly.
		let toml: String = (0..profile_count)
			.map(|i| format!("[[profiles]]\nid = \"p-{i}\"\nport = 1\n"))
			.collect();
		let parsed: Config = toml::from_str(&toml).unwrap();
		config.profiles = parsed.profiles;

		let profiles = Arc::new(StaticProfiles::new(&config.profiles));
		let store = Arc::new(MemoryStore::new());
		let config = Arc::new(config);
		(
			Orchestrator::new(config, profiles, store.clone()),
			store,
		)
	}

	fn jobs(count: u16) -> Vec<TaskJob> {
		(0..count)
			.map(|i| TaskJob {
				profile_id: format!("p-{i}"),
				spec: TaskSpec::Scan,
			})
			.collect()
	}

	#[tokio::test]
	async fn one_result_per_job_even_when_everything_fails() {
		let (orchestrator, store) = orchestrator(5);
		let results = orchestrator.run_all(jobs(5)).await;
		assert_eq!(results.len(), 5);
		assert!(results.iter().all(|r| r.outcome == Outcome::Failure));
		// Every profile shows up exactly once.
		let mut ids: Vec<_> = results.iter().map(|r| r.profile_id.clone()).collect();
		ids.sort();
		assert_eq!(ids, vec!["p-0", "p-1", "p-2", "p-3", "p-4"]);
		assert_eq!(store.history().len(), 5);
	}

	#[tokio::test]
	async fn all_slots_return_after_the_run() {
		let (orchestrator, _store) = orchestrator(4);
		orchestrator.run_all(jobs(4)).await;
		assert_eq!(orchestrator.grid_info().in_use, 0);
	}

	#[tokio::test]
	async fn cancelled_run_still_resolves_every_job() {
		let (orchestrator, _store) = orchestrator(3);
		orchestrator.cancel_handle().cancel();
		let results = orchestrator.run_all(jobs(3)).await;
		assert_eq!(results.len(), 3);
		assert!(
			results
				.iter()
				.all(|r| r.error_detail.as_deref() == Some("cancelled"))
		);
	}

	#[tokio::test]
	async fn empty_job_list_completes_immediately() {
		let (orchestrator, _store) = orchestrator(0);
		let results = orchestrator.run_all(Vec::new()).await;
		assert!(results.is_empty());
	}
}
