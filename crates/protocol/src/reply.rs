//! Per-command-family reply types.
//!
//! Replies are decoded into these once, at the session-client boundary,
//! instead of every call site digging through dynamic JSON.

use serde::{Deserialize, Serialize};

/// Reply to `Runtime.evaluate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalReply {
	#[serde(default)]
	pub result: RemoteValue,
	#[serde(default)]
	pub exception_details: Option<ExceptionDetails>,
}

impl EvalReply {
	/// Returns the by-value result, `None` for `undefined`, or the
	/// page-side exception text.
	pub fn into_value(self) -> Result<Option<serde_json::Value>, String> {
		if let Some(exception) = self.exception_details {
			return Err(exception.describe());
		}
		if self.result.kind == "undefined" {
			return Ok(None);
		}
		Ok(self.result.value)
	}
}

/// A value mirrored out of the page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteValue {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub value: Option<serde_json::Value>,
	#[serde(default)]
	pub description: Option<String>,
}

/// Exception details attached to a failed evaluation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub exception: Option<RemoteValue>,
}

impl ExceptionDetails {
	fn describe(&self) -> String {
		self.exception
			.as_ref()
			.and_then(|e| e.description.clone())
			.unwrap_or_else(|| self.text.clone())
	}
}

/// Reply to `Browser.getWindowForTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowReply {
	pub window_id: i64,
}

/// Bounds payload for `Browser.setWindowBounds`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
	pub left: i32,
	pub top: i32,
	pub width: u32,
	pub height: u32,
	pub window_state: String,
}

impl WindowBounds {
	/// Bounds with the `"normal"` window state, the only state under
	/// which the browser honors an explicit position.
	pub fn normal(left: i32, top: i32, width: u32, height: u32) -> Self {
		Self {
			left,
			top,
			width,
			height,
			window_state: "normal".into(),
		}
	}
}

/// Reply to `DOM.querySelectorAll`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReply {
	#[serde(default)]
	pub node_ids: Vec<i64>,
}

/// Reply to `DOM.getDocument`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentReply {
	pub root: DocumentNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
	pub node_id: i64,
}
