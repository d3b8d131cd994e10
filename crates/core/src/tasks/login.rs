//! Login workflow: wipe prior state, submit credentials, classify the
//! resulting page, and walk the bounded two-factor branch.
//!
//! Classification maps the page into one of six terminal signals via the
//! configured phrase table. "Unknown" is a first-class outcome: it is
//! retried briefly (UI transitions settle slowly) and then reported for
//! review, never coerced into a guess.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::PhraseTable;
use crate::error::{Result, TaskError};
use crate::humanize;
use crate::tasks::script;
use crate::tasks::{Artifact, Outcome, TaskContext, TaskResult};

/// The six terminal signals a login attempt resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginSignal {
	AlreadyAuthenticated,
	WrongCredentials,
	Locked,
	TwoFactorRequired,
	Disabled,
	Unknown,
}

impl LoginSignal {
	pub fn outcome(self) -> Outcome {
		match self {
			LoginSignal::AlreadyAuthenticated => Outcome::Success,
			LoginSignal::Unknown => Outcome::SoftFailure,
			_ => Outcome::Failure,
		}
	}
}

impl fmt::Display for LoginSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let text = match self {
			LoginSignal::AlreadyAuthenticated => "already-authenticated",
			LoginSignal::WrongCredentials => "wrong-credentials",
			LoginSignal::Locked => "checkpoint-locked",
			LoginSignal::TwoFactorRequired => "two-factor-required",
			LoginSignal::Disabled => "disabled",
			LoginSignal::Unknown => "unknown",
		};
		f.write_str(text)
	}
}

/// Raw observations classification runs on. `text` must already be
/// lowercased.
#[derive(Debug, Clone)]
pub struct PageSignals {
	pub url: String,
	pub text: String,
	pub has_two_factor_input: bool,
	pub has_authenticated_marker: bool,
}

/// Deterministic mapping from page observations to a signal.
///
/// Precedence follows the source behavior: a checkpoint URL wins over
/// everything, then the two-factor gate, then error copy, then evidence
/// of an authenticated shell.
pub fn classify(signals: &PageSignals, table: &PhraseTable) -> LoginSignal {
	let url = signals.url.to_lowercase();
	let contains_any = |haystack: &str, phrases: &[String]| {
		phrases.iter().any(|p| haystack.contains(&p.to_lowercase()))
	};

	if contains_any(&url, &table.locked_url_fragments) {
		return LoginSignal::Locked;
	}
	if signals.has_two_factor_input || contains_any(&url, &table.two_factor_url_fragments) {
		return LoginSignal::TwoFactorRequired;
	}
	if contains_any(&signals.text, &table.wrong_password) {
		return LoginSignal::WrongCredentials;
	}
	if contains_any(&signals.text, &table.disabled) {
		return LoginSignal::Disabled;
	}
	if signals.has_authenticated_marker || contains_any(&url, &table.authenticated_url_fragments) {
		return LoginSignal::AlreadyAuthenticated;
	}
	LoginSignal::Unknown
}

enum ClassifyAttempt {
	StillUnknown,
	Failed(TaskError),
}

pub(crate) async fn run(ctx: &TaskContext<'_>) -> Result<TaskResult> {
	let sites = &ctx.config().sites;

	let credential = ctx
		.runner
		.store
		.read_pending_login(ctx.profile_id)
		.await
		.map_err(|err| TaskError::Store(err.to_string()))?;
	let Some(credential) = credential else {
		return Ok(TaskResult::failure(
			ctx.profile_id,
			"login",
			"no pending credential for profile",
		));
	};

	if !script::element_exists(ctx.session, &sites.identity_input).await?
		|| !script::element_exists(ctx.session, &sites.password_input).await?
	{
		return Err(TaskError::ElementNotFound("login form".into()));
	}

	script::focus_and_clear_input(ctx.session, &sites.identity_input).await?;
	humanize::type_text(ctx.session, &credential.id).await?;
	tokio::time::sleep(ctx.config().step_settle() / 4).await;

	script::focus_and_clear_input(ctx.session, &sites.password_input).await?;
	humanize::type_text(ctx.session, &credential.secret).await?;
	tokio::time::sleep(ctx.config().step_settle() / 4).await;

	if script::click_selector(ctx.session, &sites.login_submit_selectors)
		.await?
		.is_none()
	{
		return Err(TaskError::ElementNotFound("login submit".into()));
	}
	tokio::time::sleep(ctx.config().step_settle()).await;
	ctx.session
		.wait_ready(ctx.config().ready.attempts, ctx.config().ready.interval())
		.await;
	ctx.checkpoint()?;

	let mut signal = classify_settled(ctx).await?;
	info!(target: "drover::tasks", profile = %ctx.profile_id, %signal, "login classified");

	if signal == LoginSignal::TwoFactorRequired {
		if let Some(seed) = credential.totp_seed.as_deref() {
			ctx.checkpoint()?;
			signal = submit_two_factor(ctx, seed).await?;
			info!(target: "drover::tasks", profile = %ctx.profile_id, %signal, "post-2fa classification");
		}
	}

	Ok(conclude(ctx, signal))
}

fn conclude(ctx: &TaskContext<'_>, signal: LoginSignal) -> TaskResult {
	let artifact = Artifact::Login { signal };
	match signal.outcome() {
		Outcome::Success => ctx.conclude("login", artifact),
		outcome => TaskResult {
			profile_id: ctx.profile_id.to_string(),
			task: "login",
			outcome,
			artifact: Some(artifact),
			error_detail: Some(signal.to_string()),
		},
	}
}

/// One classification pass over the live page.
async fn classify_now(ctx: &TaskContext<'_>) -> Result<LoginSignal> {
	let table = &ctx.config().phrases;
	let sites = &ctx.config().sites;

	let url = ctx.session.current_url().await?;
	let text = script::body_text_lower(ctx.session).await?;
	let has_two_factor_input = script::first_present(ctx.session, &sites.two_factor_input_selectors)
		.await?
		.is_some();
	let has_authenticated_marker = script::first_present(ctx.session, &table.authenticated_markers)
		.await?
		.is_some();

	Ok(classify(
		&PageSignals {
			url,
			text,
			has_two_factor_input,
			has_authenticated_marker,
		},
		table,
	))
}

/// Classification with the bounded settle-retry: "unknown" right after
/// submit usually means the page is still transitioning.
async fn classify_settled(ctx: &TaskContext<'_>) -> Result<LoginSignal> {
	let policy = ctx.config().retry.classify.0;
	let attempt_outcome = policy
		.run_if(
			|_| async move {
				match classify_now(ctx).await {
					Ok(LoginSignal::Unknown) => Err(ClassifyAttempt::StillUnknown),
					Ok(signal) => Ok(signal),
					Err(err) => Err(ClassifyAttempt::Failed(err)),
				}
			},
			|err| matches!(err, ClassifyAttempt::StillUnknown),
		)
		.await;
	match attempt_outcome {
		Ok(signal) => Ok(signal),
		Err(ClassifyAttempt::StillUnknown) => Ok(LoginSignal::Unknown),
		Err(ClassifyAttempt::Failed(err)) => Err(err),
	}
}

/// Bounded two-factor branch: compute a fresh code, submit it, classify
/// once more. No nested retry.
async fn submit_two_factor(ctx: &TaskContext<'_>, seed: &str) -> Result<LoginSignal> {
	let sites = &ctx.config().sites;
	let code = humanize::totp(seed, SystemTime::now())
		.map_err(|_| TaskError::Authentication(LoginSignal::TwoFactorRequired))?;
	debug!(target: "drover::tasks", profile = %ctx.profile_id, "two-factor code computed");

	let mut input = script::first_present(ctx.session, &sites.two_factor_input_selectors).await?;
	if input.is_none() {
		// Some flows land on a method chooser first.
		script::click_by_phrase(ctx.session, &sites.two_factor_switch_phrases).await?;
		tokio::time::sleep(ctx.config().step_settle()).await;
		script::click_by_phrase(ctx.session, &sites.two_factor_continue_phrases).await?;
		tokio::time::sleep(ctx.config().step_settle()).await;
		input = script::first_present(ctx.session, &sites.two_factor_input_selectors).await?;
	}
	let Some(input) = input else {
		return Err(TaskError::ElementNotFound("two-factor input".into()));
	};

	script::focus_and_clear_input(ctx.session, &input).await?;
	humanize::type_text(ctx.session, &code).await?;
	tokio::time::sleep(ctx.config().step_settle() / 2).await;

	if !script::click_by_phrase(ctx.session, &sites.two_factor_continue_phrases).await? {
		ctx.session.key_tap("Enter", "Enter").await?;
	}
	tokio::time::sleep(ctx.config().step_settle()).await;
	ctx.session
		.wait_ready(ctx.config().ready.attempts, ctx.config().ready.interval())
		.await;

	// Exactly one re-classification; a second challenge is terminal.
	classify_now(ctx).await
}
