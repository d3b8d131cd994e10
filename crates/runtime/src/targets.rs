//! Debug-endpoint addressing and target discovery.

use std::fmt;
use std::time::Duration;

use drover_protocol::TargetInfo;

use crate::error::{Error, Result};

/// Address of one browser's remote-debugging listener.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Endpoint {
	pub host: String,
	pub port: u16,
}

impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
		}
	}

	/// Loopback endpoint, the common case for locally launched profiles.
	pub fn local(port: u16) -> Self {
		Self::new("127.0.0.1", port)
	}

	pub fn http_base(&self) -> String {
		format!("http://{}:{}", self.host, self.port)
	}

	pub fn origin(&self) -> String {
		self.http_base()
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.host, self.port)
	}
}

/// Fetches the endpoint's list of debuggable targets.
pub async fn list_targets(endpoint: &Endpoint, deadline: Duration) -> Result<Vec<TargetInfo>> {
	let client = reqwest::Client::builder()
		.timeout(deadline)
		.build()
		.map_err(|err| Error::Connection(err.to_string()))?;
	let targets = client
		.get(format!("{}/json", endpoint.http_base()))
		.send()
		.await
		.map_err(|err| Error::Connection(format!("target listing at {endpoint}: {err}")))?
		.json::<Vec<TargetInfo>>()
		.await
		.map_err(|err| Error::Connection(format!("target listing decode: {err}")))?;
	Ok(targets)
}
