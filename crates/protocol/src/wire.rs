//! Request/response/event envelopes.

use serde::{Deserialize, Serialize};

/// A numbered command sent to the browser.
///
/// `params` is always serialized, defaulting to an empty object, because
/// some endpoints reject commands with the field missing entirely.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
	pub id: u64,
	pub method: String,
	pub params: serde_json::Value,
}

impl Request {
	pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
		let params = if params.is_null() {
			serde_json::json!({})
		} else {
			params
		};
		Self {
			id,
			method: method.into(),
			params,
		}
	}
}

/// A reply correlated to a [`Request`] by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
	pub id: u64,
	#[serde(default)]
	pub result: Option<serde_json::Value>,
	#[serde(default)]
	pub error: Option<ErrorPayload>,
}

/// Error object carried in a failed reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
	#[serde(default)]
	pub code: Option<i64>,
	pub message: String,
	#[serde(default)]
	pub data: Option<String>,
}

/// An unsolicited notification from the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

/// Any inbound frame: a correlated reply or an event.
///
/// Replies always carry `id`; events never do, so untagged deserialization
/// is unambiguous.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Event(Event),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_serializes_with_empty_params_object() {
		let request = Request::new(1, "Page.navigate", serde_json::Value::Null);
		let json = serde_json::to_string(&request).unwrap();
		assert!(json.contains(r#""id":1"#));
		assert!(json.contains(r#""method":"Page.navigate""#));
		assert!(json.contains(r#""params":{}"#));
	}

	#[test]
	fn reply_with_result_deserializes_as_response() {
		let json = r#"{"id": 42, "result": {"value": true}}"#;
		let message: Message = serde_json::from_str(json).unwrap();
		match message {
			Message::Response(response) => {
				assert_eq!(response.id, 42);
				assert!(response.result.is_some());
				assert!(response.error.is_none());
			}
			Message::Event(_) => panic!("expected response"),
		}
	}

	#[test]
	fn reply_with_error_deserializes_as_response() {
		let json = r#"{"id": 7, "error": {"code": -32000, "message": "no such node"}}"#;
		let message: Message = serde_json::from_str(json).unwrap();
		match message {
			Message::Response(response) => {
				let error = response.error.unwrap();
				assert_eq!(error.code, Some(-32000));
				assert_eq!(error.message, "no such node");
			}
			Message::Event(_) => panic!("expected response"),
		}
	}

	#[test]
	fn frame_without_id_deserializes_as_event() {
		let json = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.5}}"#;
		let message: Message = serde_json::from_str(json).unwrap();
		match message {
			Message::Event(event) => {
				assert_eq!(event.method, "Page.loadEventFired");
				assert_eq!(event.params["timestamp"], 1.5);
			}
			Message::Response(_) => panic!("expected event"),
		}
	}
}
