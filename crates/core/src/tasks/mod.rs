//! Per-profile task workflows and the scaffold they all run on.
//!
//! Every workflow walks the same outer shape:
//!
//! ```text
//! AcquireSlot → OpenBrowser → Connect → Navigate → WaitReady
//!     → Interact(...) → Confirm → {Complete | Failed} → ReleaseSlot
//! ```
//!
//! The scaffold owns the bookends. Slot release is structural — the
//! guard drops on every path, success or failure — and the browser and
//! session are closed best-effort at most once. The cancel flag is
//! checked at transitions only; an in-flight command finishes or hits
//! its own deadline.

pub mod comment;
pub mod confirm;
pub mod login;
pub mod post;
pub mod scan;
pub(crate) mod script;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use drover_runtime::Session;

use crate::collab::{BrowserHandle, SharedPersistence, SharedProfiles};
use crate::config::Config;
use crate::error::{Result, TaskError};
use crate::orchestrator::CancelFlag;
use crate::slots::{SlotAllocator, SlotGuard};
use crate::tasks::login::LoginSignal;

/// Terminal disposition of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	Success,
	SoftFailure,
	Failure,
}

/// What a task produced, when it produced anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
	/// Canonical URL of a created resource. `confirmed` is false when
	/// the confirmation heuristics exhausted their reloads and the URL
	/// is a best guess.
	Resource { url: String, confirmed: bool },
	Entities { count: usize },
	Login { signal: LoginSignal },
	Comment { url: String },
}

/// The terminal record for one profile's task. Always produced: a task
/// resolves as success, soft failure with a fallback artifact, or hard
/// failure with a reason.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
	pub profile_id: String,
	pub task: &'static str,
	pub outcome: Outcome,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub artifact: Option<Artifact>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_detail: Option<String>,
}

impl TaskResult {
	pub fn success(profile_id: &str, task: &'static str, artifact: Artifact) -> Self {
		Self {
			profile_id: profile_id.to_string(),
			task,
			outcome: Outcome::Success,
			artifact: Some(artifact),
			error_detail: None,
		}
	}

	pub fn soft(profile_id: &str, task: &'static str, artifact: Artifact, detail: impl Into<String>) -> Self {
		Self {
			profile_id: profile_id.to_string(),
			task,
			outcome: Outcome::SoftFailure,
			artifact: Some(artifact),
			error_detail: Some(detail.into()),
		}
	}

	pub fn failure(profile_id: &str, task: &'static str, detail: impl Into<String>) -> Self {
		Self {
			profile_id: profile_id.to_string(),
			task,
			outcome: Outcome::Failure,
			artifact: None,
			error_detail: Some(detail.into()),
		}
	}
}

/// One profile's job.
#[derive(Debug, Clone)]
pub struct TaskJob {
	pub profile_id: String,
	pub spec: TaskSpec,
}

#[derive(Debug, Clone)]
pub enum TaskSpec {
	/// Harvest entities from the listing page.
	Scan,
	/// Upload media, caption it, publish, confirm the resulting URL.
	Post { media: String, caption: String },
	/// Authenticate with the profile's stored pending credential.
	Login,
	/// Leave a comment on an existing resource.
	Comment { url: String, text: String },
}

impl TaskSpec {
	pub fn name(&self) -> &'static str {
		match self {
			TaskSpec::Scan => "scan",
			TaskSpec::Post { .. } => "post",
			TaskSpec::Login => "login",
			TaskSpec::Comment { .. } => "comment",
		}
	}
}

/// Everything a workflow's interact phase sees.
pub(crate) struct TaskContext<'a> {
	pub runner: &'a TaskRunner,
	pub session: &'a Session,
	pub handle: &'a BrowserHandle,
	pub profile_id: &'a str,
	/// Whether the readiness signal ever appeared. Its absence is not
	/// fatal, but a completed task is downgraded to a soft failure.
	pub ready: bool,
}

impl TaskContext<'_> {
	pub(crate) fn config(&self) -> &Config {
		&self.runner.config
	}

	pub(crate) fn checkpoint(&self) -> Result<()> {
		self.runner.cancel.checkpoint()
	}

	/// Success unless readiness never showed up.
	pub(crate) fn conclude(&self, task: &'static str, artifact: Artifact) -> TaskResult {
		if self.ready {
			TaskResult::success(self.profile_id, task, artifact)
		} else {
			TaskResult::soft(
				self.profile_id,
				task,
				artifact,
				"page never signalled readiness",
			)
		}
	}
}

/// Runs workflows for single profiles; shared by every worker in the
/// orchestrator's pool.
pub struct TaskRunner {
	pub(crate) config: Arc<Config>,
	pub(crate) allocator: Arc<SlotAllocator>,
	pub(crate) profiles: SharedProfiles,
	pub(crate) store: SharedPersistence,
	pub(crate) cancel: CancelFlag,
}

impl TaskRunner {
	pub fn new(
		config: Arc<Config>,
		allocator: Arc<SlotAllocator>,
		profiles: SharedProfiles,
		store: SharedPersistence,
		cancel: CancelFlag,
	) -> Self {
		Self {
			config,
			allocator,
			profiles,
			store,
			cancel,
		}
	}

	/// Runs one job to its terminal result. Never errors and never
	/// panics: every failure is folded into the result.
	pub async fn run(&self, job: TaskJob) -> TaskResult {
		let task = job.spec.name();
		let result = match self.drive(&job).await {
			Ok(result) => result,
			Err(err) => resolve_error(&job.profile_id, task, err),
		};
		info!(
			target: "drover::tasks",
			profile = %result.profile_id,
			task,
			outcome = ?result.outcome,
			"task finished"
		);
		if let Err(err) = self.store.store_task_history(&result).await {
			warn!(target: "drover::tasks", %err, "task history not stored");
		}
		result
	}

	async fn drive(&self, job: &TaskJob) -> Result<TaskResult> {
		self.cancel.checkpoint()?;
		let slot = self.allocator.acquire();
		info!(
			target: "drover::tasks",
			profile = %job.profile_id,
			task = job.spec.name(),
			slot = slot.id(),
			"task start"
		);
		// The guard releases the slot on every path out of here.
		self.drive_with_slot(job, &slot).await
	}

	async fn drive_with_slot(&self, job: &TaskJob, slot: &SlotGuard) -> Result<TaskResult> {
		self.cancel.checkpoint()?;
		let handle = self
			.profiles
			.open(&job.profile_id)
			.await
			.map_err(|err| TaskError::ProfileOpen(err.to_string()))?;

		let result = self.drive_with_browser(job, slot, &handle).await;

		if let Err(err) = self.profiles.close(&job.profile_id).await {
			warn!(target: "drover::tasks", profile = %job.profile_id, %err, "browser close failed");
		}
		result
	}

	async fn drive_with_browser(
		&self,
		job: &TaskJob,
		slot: &SlotGuard,
		handle: &BrowserHandle,
	) -> Result<TaskResult> {
		self.cancel.checkpoint()?;
		let session = Session::connect(
			job.profile_id.clone(),
			handle.endpoint.clone(),
			self.config.command_timeout(),
		)
		.await?;

		let result = self.interact(job, slot, handle, &session).await;

		session.close().await;
		result
	}

	async fn interact(
		&self,
		job: &TaskJob,
		slot: &SlotGuard,
		handle: &BrowserHandle,
		session: &Session,
	) -> Result<TaskResult> {
		let bounds = slot.bounds();
		// Placement is cosmetic for the page; a refusal only costs the
		// tiling, not the task.
		if let Err(err) = session
			.set_window_bounds(bounds.x, bounds.y, bounds.width, bounds.height)
			.await
		{
			warn!(target: "drover::tasks", profile = %job.profile_id, %err, "window placement failed");
		}
		self.cancel.checkpoint()?;

		let start_url = match &job.spec {
			TaskSpec::Scan => self.config.sites.listing_url.clone(),
			TaskSpec::Post { .. } => self.config.sites.composer_url.clone(),
			TaskSpec::Login => self.config.sites.login_url.clone(),
			TaskSpec::Comment { url, .. } => url.clone(),
		};
		// Login wipes site data before touching the login form.
		if matches!(job.spec, TaskSpec::Login) {
			session
				.clear_site_data(&self.config.sites.clear_domains, &self.config.sites.clear_origins)
				.await?;
		}
		session.navigate(&start_url).await?;
		let ready = session
			.wait_ready(self.config.ready.attempts, self.config.ready.interval())
			.await;
		if !ready {
			warn!(target: "drover::tasks", profile = %job.profile_id, "readiness never signalled, proceeding");
		}
		self.cancel.checkpoint()?;

		let ctx = TaskContext {
			runner: self,
			session,
			handle,
			profile_id: &job.profile_id,
			ready,
		};
		match &job.spec {
			TaskSpec::Scan => scan::run(&ctx).await,
			TaskSpec::Post { media, caption } => post::run(&ctx, media, caption).await,
			TaskSpec::Login => login::run(&ctx).await,
			TaskSpec::Comment { url, text } => comment::run(&ctx, url, text).await,
		}
	}
}

fn resolve_error(profile_id: &str, task: &'static str, err: TaskError) -> TaskResult {
	match err {
		TaskError::Authentication(signal) => TaskResult {
			profile_id: profile_id.to_string(),
			task,
			outcome: signal.outcome(),
			artifact: Some(Artifact::Login { signal }),
			error_detail: Some(signal.to_string()),
		},
		other => TaskResult::failure(profile_id, task, other.to_string()),
	}
}
