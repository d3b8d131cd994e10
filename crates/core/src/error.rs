use thiserror::Error;

use crate::tasks::login::LoginSignal;

pub type Result<T> = std::result::Result<T, TaskError>;

/// Everything that can sink a task step.
///
/// All of these are recovered at the state-machine boundary into a
/// terminal [`TaskResult`](crate::TaskResult); none propagate past the
/// orchestrator.
#[derive(Debug, Error)]
pub enum TaskError {
	#[error(transparent)]
	Session(#[from] drover_runtime::Error),

	#[error("browser open failed: {0}")]
	ProfileOpen(String),

	#[error("element not found: {0}")]
	ElementNotFound(String),

	#[error("upload failed: {0}")]
	UploadFailed(String),

	#[error("authentication failed: {0}")]
	Authentication(LoginSignal),

	#[error("could not confirm resulting resource: {0}")]
	ConfirmationUnavailable(String),

	#[error("persistence failed: {0}")]
	Store(String),

	#[error("invalid pattern in site config: {0}")]
	Pattern(String),

	#[error("cancelled")]
	Cancelled,
}
