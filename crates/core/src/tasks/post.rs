//! Post workflow: inject media into the composer, caption it with human
//! typing, publish through the staged next/submit controls, then resolve
//! the canonical URL of what was created.

use tracing::{info, warn};

use crate::error::{Result, TaskError};
use crate::humanize;
use crate::tasks::confirm;
use crate::tasks::script;
use crate::tasks::{Artifact, TaskContext, TaskResult};

pub(crate) async fn run(ctx: &TaskContext<'_>, media: &str, caption: &str) -> Result<TaskResult> {
	let sites = &ctx.config().sites;

	let report = ctx
		.session
		.set_file_input(
			&sites.upload_input_selectors,
			&[media.to_string()],
			&sites.preview_selectors,
		)
		.await
		.map_err(|err| match err {
			drover_runtime::Error::NoFileInput(detail) => TaskError::UploadFailed(detail),
			other => TaskError::Session(other),
		})?;
	if !report.preview_confirmed {
		warn!(
			target: "drover::tasks",
			profile = %ctx.profile_id,
			"upload not visually confirmed, proceeding"
		);
	}

	// Server-side processing (transcode, checks) gates the next control.
	tokio::time::sleep(ctx.config().post_processing_wait()).await;
	ctx.checkpoint()?;

	// The composer walks through up to two staged screens before the
	// caption is editable.
	for _ in 0..2 {
		if script::click_by_phrase(ctx.session, &sites.post_next_phrases).await? {
			tokio::time::sleep(ctx.config().step_settle()).await;
		}
	}

	if !caption.is_empty() {
		if script::focus_editor(ctx.session, &sites.caption_editor_selectors)
			.await?
			.is_none()
		{
			return Err(TaskError::ElementNotFound("caption editor".into()));
		}
		humanize::type_text(ctx.session, caption).await?;
		tokio::time::sleep(ctx.config().step_settle()).await;
	}
	ctx.checkpoint()?;

	if !script::click_by_phrase(ctx.session, &sites.post_submit_phrases).await? {
		return Err(TaskError::ElementNotFound("post submit control".into()));
	}
	tokio::time::sleep(ctx.config().post_processing_wait()).await;
	ctx.checkpoint()?;

	let resource = confirm::resolve(ctx).await?;
	info!(
		target: "drover::tasks",
		profile = %ctx.profile_id,
		url = %resource.url,
		confirmed = resource.confirmed,
		"post resolved"
	);
	Ok(ctx.conclude(
		"post",
		Artifact::Resource {
			url: resource.url,
			confirmed: resource.confirmed,
		},
	))
}
