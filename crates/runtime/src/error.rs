use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("connection failed: {0}")]
	Connection(String),

	#[error("websocket handshake rejected on every variant: {0}")]
	Handshake(String),

	#[error("no attachable page target at {0}")]
	NoTarget(String),

	#[error("timeout after {ms}ms waiting for reply to {method}")]
	Timeout { method: String, ms: u64 },

	#[error("remote error for {method}: {message}")]
	Protocol {
		method: String,
		code: Option<i64>,
		message: String,
	},

	#[error("page exception: {0}")]
	Eval(String),

	#[error("no file input accepted the payload: {0}")]
	NoFileInput(String),

	#[error("connection closed")]
	Closed,

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}
}
