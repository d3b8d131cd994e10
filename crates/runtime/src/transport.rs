//! WebSocket transport: handshake variant ladder, outbound sink, and the
//! reader task that feeds decoded frames into a channel.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as WsRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use drover_protocol::{Message, Request};

use crate::error::{Error, Result};
use crate::targets::Endpoint;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake variants tried in order until the endpoint accepts one.
///
/// Browsers reject debugger WebSocket upgrades whose Origin they dislike,
/// and which Origin they tolerate varies by vendor and launch flags: some
/// demand none at all, some accept the endpoint's own HTTP origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeVariant {
	NoOrigin,
	EndpointOrigin,
	WsOrigin,
}

impl HandshakeVariant {
	const LADDER: [HandshakeVariant; 3] = [
		HandshakeVariant::NoOrigin,
		HandshakeVariant::EndpointOrigin,
		HandshakeVariant::WsOrigin,
	];

	fn request(self, ws_url: &str, endpoint: &Endpoint) -> Result<WsRequest> {
		let mut request = ws_url
			.into_client_request()
			.map_err(|err| Error::Connection(format!("bad websocket url {ws_url}: {err}")))?;
		let origin = match self {
			HandshakeVariant::NoOrigin => None,
			HandshakeVariant::EndpointOrigin => Some(endpoint.origin()),
			HandshakeVariant::WsOrigin => request
				.uri()
				.authority()
				.map(|authority| format!("http://{authority}")),
		};
		if let Some(origin) = origin {
			let value = HeaderValue::from_str(&origin)
				.map_err(|err| Error::Connection(format!("bad origin {origin}: {err}")))?;
			request.headers_mut().insert("Origin", value);
		}
		Ok(request)
	}
}

/// Write half of the connection; the read half lives in a spawned task.
pub(crate) struct WsTransport {
	sink: SplitSink<WsStream, WsMessage>,
}

impl WsTransport {
	/// Opens the WebSocket, walking the handshake variant ladder, and
	/// spawns the reader task. Decoded frames arrive on the returned
	/// channel; the channel closing means the connection is gone.
	pub(crate) async fn connect(
		ws_url: &str,
		endpoint: &Endpoint,
	) -> Result<(Self, mpsc::Receiver<Message>)> {
		let stream = Self::handshake(ws_url, endpoint).await?;
		let (sink, source) = stream.split();
		let (frames_tx, frames_rx) = mpsc::channel(64);
		tokio::spawn(read_loop(source, frames_tx));
		Ok((Self { sink }, frames_rx))
	}

	async fn handshake(ws_url: &str, endpoint: &Endpoint) -> Result<WsStream> {
		let mut last_rejection = String::new();
		for variant in HandshakeVariant::LADDER {
			let request = variant.request(ws_url, endpoint)?;
			match connect_async(request).await {
				Ok((stream, _)) => {
					debug!(target: "drover::wire", ?variant, %ws_url, "websocket open");
					return Ok(stream);
				}
				Err(err) => {
					debug!(target: "drover::wire", ?variant, %err, "handshake rejected");
					last_rejection = err.to_string();
				}
			}
		}
		Err(Error::Handshake(last_rejection))
	}

	pub(crate) async fn send(&mut self, request: &Request) -> Result<()> {
		let text = serde_json::to_string(request)?;
		self.sink
			.send(WsMessage::Text(text))
			.await
			.map_err(|err| Error::Connection(err.to_string()))
	}

	/// Best-effort close frame; errors here mean the peer is already gone.
	pub(crate) async fn close(&mut self) {
		let _ = self.sink.send(WsMessage::Close(None)).await;
	}
}

async fn read_loop(mut source: futures_util::stream::SplitStream<WsStream>, frames_tx: mpsc::Sender<Message>) {
	while let Some(frame) = source.next().await {
		match frame {
			Ok(WsMessage::Text(text)) => match serde_json::from_str::<Message>(&text) {
				Ok(message) => {
					if frames_tx.send(message).await.is_err() {
						break;
					}
				}
				Err(err) => trace!(target: "drover::wire", %err, "undecodable frame"),
			},
			Ok(WsMessage::Close(_)) | Err(_) => break,
			Ok(_) => {}
		}
	}
	debug!(target: "drover::wire", "reader loop ended");
}

#[cfg(test)]
mod tests {
	use super::*;

	fn endpoint() -> Endpoint {
		Endpoint::new("127.0.0.1", 9222)
	}

	#[test]
	fn bare_variant_sends_no_origin() {
		let request = HandshakeVariant::NoOrigin
			.request("ws://127.0.0.1:9222/devtools/page/A", &endpoint())
			.unwrap();
		assert!(!request.headers().contains_key("Origin"));
	}

	#[test]
	fn endpoint_variant_sends_http_origin() {
		let request = HandshakeVariant::EndpointOrigin
			.request("ws://127.0.0.1:9222/devtools/page/A", &endpoint())
			.unwrap();
		assert_eq!(
			request.headers().get("Origin").unwrap(),
			"http://127.0.0.1:9222"
		);
	}

	#[test]
	fn ws_variant_derives_origin_from_url_authority() {
		let request = HandshakeVariant::WsOrigin
			.request("ws://10.0.0.5:9301/devtools/page/B", &endpoint())
			.unwrap();
		assert_eq!(request.headers().get("Origin").unwrap(), "http://10.0.0.5:9301");
	}

	#[test]
	fn malformed_url_is_a_connection_error() {
		let result = HandshakeVariant::NoOrigin.request("not a url", &endpoint());
		assert!(matches!(result, Err(Error::Connection(_))));
	}
}
