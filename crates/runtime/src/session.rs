//! One live control session against one browser instance.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use drover_protocol::{DocumentReply, EvalReply, NodeReply, WindowBounds, WindowReply, pick_page_target};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::targets::{Endpoint, list_targets};
use crate::transport::WsTransport;

/// Outcome of a file-input injection.
#[derive(Debug, Clone, Copy)]
pub struct UploadReport {
	/// DOM node that accepted the files.
	pub node_id: i64,
	/// Whether a preview element appeared afterwards.
	pub preview_confirmed: bool,
}

/// A connected remote-debugging session for one profile's browser.
///
/// Message ids are monotonic and unique per connection; every command
/// round trip is bounded by the session's command deadline.
pub struct Session {
	profile_id: String,
	endpoint: Endpoint,
	connection: std::sync::Arc<Connection>,
	command_deadline: Duration,
}

impl Session {
	/// Discovers the endpoint's first page target and opens a connection
	/// to it.
	pub async fn connect(
		profile_id: impl Into<String>,
		endpoint: Endpoint,
		command_deadline: Duration,
	) -> Result<Self> {
		let profile_id = profile_id.into();
		let targets = list_targets(&endpoint, command_deadline).await?;
		let target = pick_page_target(&targets).ok_or_else(|| Error::NoTarget(endpoint.to_string()))?;
		let ws_url = target
			.web_socket_debugger_url
			.clone()
			.ok_or_else(|| Error::NoTarget(format!("{endpoint} (target has no socket url)")))?;

		let (transport, frames_rx) = WsTransport::connect(&ws_url, &endpoint).await?;
		let connection = Connection::spawn(transport, frames_rx);
		info!(
			target: "drover::session",
			profile = %profile_id,
			%endpoint,
			url = %target.url,
			"session open"
		);
		Ok(Self {
			profile_id,
			endpoint,
			connection,
			command_deadline,
		})
	}

	pub fn profile_id(&self) -> &str {
		&self.profile_id
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	/// Sends a raw command and returns the reply's `result` object.
	pub async fn send(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
		self.connection.send(method, params, self.command_deadline).await
	}

	/// Evaluates an expression in the page, returning its by-value result
	/// (`None` for `undefined`).
	pub async fn evaluate(&self, expression: &str) -> Result<Option<serde_json::Value>> {
		let raw = self
			.send(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
				}),
			)
			.await?;
		let reply: EvalReply = serde_json::from_value(raw)?;
		reply.into_value().map_err(Error::Eval)
	}

	/// Evaluates an expression expected to produce a string.
	pub async fn evaluate_string(&self, expression: &str) -> Result<Option<String>> {
		let value = self.evaluate(expression).await?;
		Ok(value.and_then(|v| v.as_str().map(str::to_string)))
	}

	pub async fn navigate(&self, url: &str) -> Result<()> {
		debug!(target: "drover::session", profile = %self.profile_id, %url, "navigate");
		self.send("Page.navigate", json!({ "url": url })).await.map(drop)
	}

	pub async fn reload(&self) -> Result<()> {
		self.send("Page.reload", json!({})).await.map(drop)
	}

	pub async fn current_url(&self) -> Result<String> {
		self.evaluate_string("window.location.href")
			.await?
			.ok_or_else(|| Error::Eval("location has no href".into()))
	}

	pub async fn document_html(&self) -> Result<String> {
		self.evaluate_string("document.documentElement.outerHTML")
			.await?
			.ok_or_else(|| Error::Eval("document has no root element".into()))
	}

	/// Polls the readiness signal up to `attempts` times. Absence of
	/// readiness is reported, never fatal: evaluation errors during the
	/// poll are swallowed and counted as "not ready yet".
	pub async fn wait_ready(&self, attempts: u32, interval: Duration) -> bool {
		for attempt in 0..attempts {
			match self.evaluate_string("document.readyState").await {
				Ok(Some(state)) if state == "complete" => return true,
				Ok(_) => {}
				Err(err) => {
					debug!(target: "drover::session", profile = %self.profile_id, %err, attempt, "readiness probe failed")
				}
			}
			tokio::time::sleep(interval).await;
		}
		false
	}

	/// Repositions the window onto its slot. The window's content size is
	/// governed by a launch-time display-scale flag, not runtime resize,
	/// so this only places the frame.
	pub async fn set_window_bounds(&self, left: i32, top: i32, width: u32, height: u32) -> Result<()> {
		let raw = self.send("Browser.getWindowForTarget", json!({})).await?;
		let window: WindowReply = serde_json::from_value(raw)?;
		self.send(
			"Browser.setWindowBounds",
			json!({
				"windowId": window.window_id,
				"bounds": WindowBounds::normal(left, top, width, height),
			}),
		)
		.await
		.map(drop)
	}

	/// Injects local file paths into the first file input that accepts
	/// them, walking the candidate selectors in order and confirming via
	/// the preview heuristic. Returns the last accepting node unconfirmed
	/// if no preview ever appears; errors only when no node accepts.
	pub async fn set_file_input(
		&self,
		candidates: &[String],
		files: &[String],
		preview_selectors: &[String],
	) -> Result<UploadReport> {
		let raw = self.send("DOM.getDocument", json!({})).await?;
		let document: DocumentReply = serde_json::from_value(raw)?;

		let mut accepted: Option<i64> = None;
		for selector in candidates {
			let raw = self
				.send(
					"DOM.querySelectorAll",
					json!({ "nodeId": document.root.node_id, "selector": selector }),
				)
				.await?;
			let nodes: NodeReply = serde_json::from_value(raw)?;

			for node_id in nodes.node_ids {
				let set = self
					.send(
						"DOM.setFileInputFiles",
						json!({ "nodeId": node_id, "files": files }),
					)
					.await;
				if let Err(err) = set {
					debug!(target: "drover::session", profile = %self.profile_id, node_id, %err, "input rejected files");
					continue;
				}
				accepted = Some(node_id);
				self.fire_change_event(selector).await;
				if self.upload_visible(preview_selectors).await {
					return Ok(UploadReport {
						node_id,
						preview_confirmed: true,
					});
				}
			}
		}

		match accepted {
			Some(node_id) => {
				warn!(
					target: "drover::session",
					profile = %self.profile_id,
					node_id,
					"files set but no preview appeared"
				);
				Ok(UploadReport {
					node_id,
					preview_confirmed: false,
				})
			}
			None => Err(Error::NoFileInput(candidates.join(", "))),
		}
	}

	async fn fire_change_event(&self, selector: &str) {
		let script = format!(
			"(function() {{\n\
			\tlet input = document.querySelector({sel});\n\
			\tif (!input) return false;\n\
			\tinput.dispatchEvent(new Event('change', {{bubbles: true}}));\n\
			\treturn true;\n\
			}})()",
			sel = js_quote(selector)
		);
		if let Err(err) = self.evaluate(&script).await {
			debug!(target: "drover::session", profile = %self.profile_id, %err, "change event not fired");
		}
	}

	async fn upload_visible(&self, preview_selectors: &[String]) -> bool {
		for _ in 0..6 {
			for selector in preview_selectors {
				let script = format!(
					"(function() {{\n\
					\tlet el = document.querySelector({sel});\n\
					\tif (!el) return false;\n\
					\tlet rect = el.getBoundingClientRect();\n\
					\treturn rect.width > 0 && rect.height > 0;\n\
					}})()",
					sel = js_quote(selector)
				);
				if let Ok(Some(serde_json::Value::Bool(true))) = self.evaluate(&script).await {
					return true;
				}
			}
			tokio::time::sleep(Duration::from_millis(500)).await;
		}
		false
	}

	/// Removes prior cookies and storage for the given domains/origins.
	/// Remote refusals are tolerated (not every browser exposes every
	/// storage domain); transport failures still propagate.
	pub async fn clear_site_data(&self, domains: &[String], origins: &[String]) -> Result<()> {
		for domain in domains {
			match self.send("Network.deleteCookies", json!({ "domain": domain })).await {
				Ok(_) => {}
				Err(Error::Protocol { message, .. }) => {
					debug!(target: "drover::session", %domain, %message, "cookie clear refused")
				}
				Err(err) => return Err(err),
			}
		}
		for origin in origins {
			match self
				.send(
					"Storage.clearDataForOrigin",
					json!({ "origin": origin, "storageTypes": "all" }),
				)
				.await
			{
				Ok(_) => {}
				Err(Error::Protocol { message, .. }) => {
					debug!(target: "drover::session", %origin, %message, "storage clear refused")
				}
				Err(err) => return Err(err),
			}
		}
		Ok(())
	}

	pub async fn mouse_move(&self, x: f64, y: f64) -> Result<()> {
		self.send(
			"Input.dispatchMouseEvent",
			json!({ "type": "mouseMoved", "x": x, "y": y }),
		)
		.await
		.map(drop)
	}

	pub async fn mouse_press(&self, x: f64, y: f64) -> Result<()> {
		self.send(
			"Input.dispatchMouseEvent",
			json!({ "type": "mousePressed", "x": x, "y": y, "button": "left", "clickCount": 1 }),
		)
		.await
		.map(drop)
	}

	pub async fn mouse_release(&self, x: f64, y: f64) -> Result<()> {
		self.send(
			"Input.dispatchMouseEvent",
			json!({ "type": "mouseReleased", "x": x, "y": y, "button": "left", "clickCount": 1 }),
		)
		.await
		.map(drop)
	}

	pub async fn insert_text(&self, text: &str) -> Result<()> {
		self.send("Input.insertText", json!({ "text": text })).await.map(drop)
	}

	/// Synthesizes a full key press (down then up).
	pub async fn key_tap(&self, key: &str, code: &str) -> Result<()> {
		self.send(
			"Input.dispatchKeyEvent",
			json!({ "type": "keyDown", "key": key, "code": code }),
		)
		.await?;
		self.send(
			"Input.dispatchKeyEvent",
			json!({ "type": "keyUp", "key": key, "code": code }),
		)
		.await
		.map(drop)
	}

	/// Best-effort close; never raises.
	pub async fn close(&self) {
		debug!(target: "drover::session", profile = %self.profile_id, "session close");
		self.connection.close().await;
	}
}

/// Quotes a string as a JavaScript string literal.
pub fn js_quote(s: &str) -> String {
	let mut quoted = String::with_capacity(s.len() + 2);
	quoted.push('"');
	for ch in s.chars() {
		match ch {
			'"' => quoted.push_str("\\\""),
			'\\' => quoted.push_str("\\\\"),
			'\n' => quoted.push_str("\\n"),
			'\r' => quoted.push_str("\\r"),
			'\t' => quoted.push_str("\\t"),
			_ => quoted.push(ch),
		}
	}
	quoted.push('"');
	quoted
}
