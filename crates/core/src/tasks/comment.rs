//! Comment workflow: find the editor, type like a person, submit.

use tracing::info;

use crate::error::{Result, TaskError};
use crate::humanize;
use crate::tasks::script;
use crate::tasks::{Artifact, TaskContext, TaskResult};

pub(crate) async fn run(ctx: &TaskContext<'_>, url: &str, text: &str) -> Result<TaskResult> {
	let sites = &ctx.config().sites;

	if script::focus_editor(ctx.session, &sites.comment_editor_selectors)
		.await?
		.is_none()
	{
		return Err(TaskError::ElementNotFound("comment editor".into()));
	}
	tokio::time::sleep(ctx.config().step_settle() / 2).await;

	humanize::type_text(ctx.session, text).await?;
	tokio::time::sleep(ctx.config().step_settle() / 2).await;
	ctx.checkpoint()?;

	// A dedicated submit control when the site has one, Enter otherwise.
	if !script::click_by_phrase(ctx.session, &sites.comment_submit_phrases).await? {
		ctx.session.key_tap("Enter", "Enter").await?;
	}
	tokio::time::sleep(ctx.config().step_settle()).await;

	info!(target: "drover::tasks", profile = %ctx.profile_id, %url, "comment submitted");
	Ok(ctx.conclude("comment", Artifact::Comment { url: url.to_string() }))
}
