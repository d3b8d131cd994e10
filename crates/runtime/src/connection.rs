//! Correlated command/reply plumbing over one transport.
//!
//! Each command takes the next monotonic id, parks a oneshot sender in
//! the pending map, and waits for the matching reply or its deadline.
//! Replies are matched strictly by id, so out-of-order delivery is fine;
//! replies nobody is waiting for and event notifications are logged and
//! dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use drover_protocol::{Message, Request, Response};

use crate::error::{Error, Result};
use crate::transport::WsTransport;

pub(crate) enum Outbound {
	Command(Request),
	Shutdown,
}

struct PendingCommand {
	method: String,
	reply_tx: oneshot::Sender<Result<serde_json::Value>>,
}

pub(crate) struct Connection {
	outbound: mpsc::Sender<Outbound>,
	last_id: AtomicU64,
	pending: DashMap<u64, PendingCommand>,
}

impl Connection {
	/// Wires a transport into a live connection: one task drains the
	/// outbound queue into the sink, another pumps inbound frames into
	/// [`Connection::dispatch`].
	pub(crate) fn spawn(transport: WsTransport, frames_rx: mpsc::Receiver<Message>) -> Arc<Self> {
		let (outbound_tx, outbound_rx) = mpsc::channel(32);
		let connection = Arc::new(Self::with_outbound(outbound_tx));
		tokio::spawn(write_loop(transport, outbound_rx));
		tokio::spawn(read_pump(Arc::downgrade(&connection), frames_rx));
		connection
	}

	fn with_outbound(outbound: mpsc::Sender<Outbound>) -> Self {
		Self {
			outbound,
			last_id: AtomicU64::new(0),
			pending: DashMap::new(),
		}
	}

	/// Sends a command and waits for its correlated reply.
	pub(crate) async fn send(
		&self,
		method: &str,
		params: serde_json::Value,
		deadline: Duration,
	) -> Result<serde_json::Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
		let (reply_tx, reply_rx) = oneshot::channel();
		self.pending.insert(
			id,
			PendingCommand {
				method: method.to_string(),
				reply_tx,
			},
		);

		let request = Request::new(id, method, params);
		if self.outbound.send(Outbound::Command(request)).await.is_err() {
			self.pending.remove(&id);
			return Err(Error::Closed);
		}

		match tokio::time::timeout(deadline, reply_rx).await {
			Ok(Ok(reply)) => reply,
			Ok(Err(_)) => Err(Error::Closed),
			Err(_) => {
				// A late reply will find no pending entry and be dropped.
				self.pending.remove(&id);
				Err(Error::Timeout {
					method: method.to_string(),
					ms: deadline.as_millis() as u64,
				})
			}
		}
	}

	pub(crate) fn dispatch(&self, message: Message) {
		match message {
			Message::Response(response) => {
				let id = response.id;
				match self.pending.remove(&id) {
					Some((_, pending)) => {
						let resolved = resolve(&pending.method, response);
						let _ = pending.reply_tx.send(resolved);
					}
					None => trace!(target: "drover::wire", id, "reply with no pending command"),
				}
			}
			Message::Event(event) => {
				trace!(target: "drover::wire", method = %event.method, "event")
			}
		}
	}

	/// Fails every in-flight command; called when the reader loop ends.
	pub(crate) fn fail_pending(&self) {
		self.pending.retain(|_, _| false);
	}

	/// Asks the writer task to send a close frame. Best-effort.
	pub(crate) async fn close(&self) {
		let _ = self.outbound.send(Outbound::Shutdown).await;
	}
}

fn resolve(method: &str, response: Response) -> Result<serde_json::Value> {
	if let Some(error) = response.error {
		return Err(Error::Protocol {
			method: method.to_string(),
			code: error.code,
			message: error.message,
		});
	}
	Ok(response.result.unwrap_or(serde_json::Value::Null))
}

async fn write_loop(mut transport: WsTransport, mut outbound_rx: mpsc::Receiver<Outbound>) {
	while let Some(outbound) = outbound_rx.recv().await {
		match outbound {
			Outbound::Command(request) => {
				if transport.send(&request).await.is_err() {
					break;
				}
			}
			Outbound::Shutdown => break,
		}
	}
	transport.close().await;
}

async fn read_pump(connection: std::sync::Weak<Connection>, mut frames_rx: mpsc::Receiver<Message>) {
	while let Some(message) = frames_rx.recv().await {
		match connection.upgrade() {
			Some(connection) => connection.dispatch(message),
			None => return,
		}
	}
	// Reader loop ended: every waiter gets Error::Closed via drop.
	if let Some(connection) = connection.upgrade() {
		connection.fail_pending();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use drover_protocol::{ErrorPayload, Event};

	fn test_connection() -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
		let (outbound_tx, outbound_rx) = mpsc::channel(32);
		(Arc::new(Connection::with_outbound(outbound_tx)), outbound_rx)
	}

	fn response(id: u64, result: serde_json::Value) -> Message {
		Message::Response(Response {
			id,
			result: Some(result),
			error: None,
		})
	}

	async fn sent_request(outbound_rx: &mut mpsc::Receiver<Outbound>) -> Request {
		match outbound_rx.recv().await.unwrap() {
			Outbound::Command(request) => request,
			Outbound::Shutdown => panic!("expected command"),
		}
	}

	#[tokio::test]
	async fn ids_are_monotonic_per_connection() {
		let (connection, mut outbound_rx) = test_connection();

		let conn = connection.clone();
		let driver = tokio::spawn(async move {
			let mut seen = Vec::new();
			for _ in 0..3 {
				let request = sent_request(&mut outbound_rx).await;
				seen.push(request.id);
				conn.dispatch(response(request.id, serde_json::json!(null)));
			}
			seen
		});

		for _ in 0..3 {
			connection
				.send("Runtime.evaluate", serde_json::json!({}), Duration::from_secs(1))
				.await
				.unwrap();
		}
		assert_eq!(driver.await.unwrap(), vec![1, 2, 3]);
	}

	#[tokio::test]
	async fn replies_correlate_by_id_under_out_of_order_delivery() {
		let (connection, mut outbound_rx) = test_connection();

		// Answer both in-flight commands in reverse arrival order, each
		// reply tagged with its own request's method.
		let conn = connection.clone();
		let driver = tokio::spawn(async move {
			let first = sent_request(&mut outbound_rx).await;
			let second = sent_request(&mut outbound_rx).await;
			conn.dispatch(response(second.id, serde_json::json!(second.method)));
			conn.dispatch(response(first.id, serde_json::json!(first.method)));
		});

		let conn = connection.clone();
		let a = tokio::spawn(async move {
			conn.send("method.a", serde_json::json!({}), Duration::from_secs(1)).await
		});
		let b = connection
			.send("method.b", serde_json::json!({}), Duration::from_secs(1))
			.await
			.unwrap();

		assert_eq!(a.await.unwrap().unwrap(), serde_json::json!("method.a"));
		assert_eq!(b, serde_json::json!("method.b"));
		driver.await.unwrap();
	}

	#[tokio::test]
	async fn remote_error_resolves_as_protocol_error() {
		let (connection, mut outbound_rx) = test_connection();

		let conn = connection.clone();
		tokio::spawn(async move {
			let request = sent_request(&mut outbound_rx).await;
			conn.dispatch(Message::Response(Response {
				id: request.id,
				result: None,
				error: Some(ErrorPayload {
					code: Some(-32000),
					message: "no node for id".into(),
					data: None,
				}),
			}));
		});

		let err = connection
			.send("DOM.setFileInputFiles", serde_json::json!({}), Duration::from_secs(1))
			.await
			.unwrap_err();
		match err {
			Error::Protocol { method, message, .. } => {
				assert_eq!(method, "DOM.setFileInputFiles");
				assert_eq!(message, "no node for id");
			}
			other => panic!("expected protocol error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn unanswered_command_times_out_and_late_reply_is_dropped() {
		let (connection, mut outbound_rx) = test_connection();

		let err = connection
			.send("Page.navigate", serde_json::json!({}), Duration::from_millis(20))
			.await
			.unwrap_err();
		assert!(err.is_timeout());

		// The late reply finds no pending command and is ignored.
		let request = sent_request(&mut outbound_rx).await;
		connection.dispatch(response(request.id, serde_json::json!("late")));
		assert!(connection.pending.is_empty());
	}

	#[tokio::test]
	async fn events_are_dropped_without_disturbing_pending_commands() {
		let (connection, mut outbound_rx) = test_connection();

		let conn = connection.clone();
		let driver = tokio::spawn(async move {
			let request = sent_request(&mut outbound_rx).await;
			conn.dispatch(Message::Event(Event {
				method: "Page.loadEventFired".into(),
				params: serde_json::json!({}),
			}));
			conn.dispatch(response(request.id, serde_json::json!(true)));
		});

		let value = connection
			.send("Page.navigate", serde_json::json!({}), Duration::from_secs(1))
			.await
			.unwrap();
		assert_eq!(value, serde_json::json!(true));
		driver.await.unwrap();
	}

	#[tokio::test]
	async fn failing_pending_wakes_waiters_with_closed() {
		let (connection, _outbound_rx) = test_connection();

		let conn = connection.clone();
		let waiter = tokio::spawn(async move {
			conn.send("Page.navigate", serde_json::json!({}), Duration::from_secs(5)).await
		});
		tokio::task::yield_now().await;

		connection.fail_pending();
		let err = waiter.await.unwrap().unwrap_err();
		assert!(matches!(err, Error::Closed));
	}
}
