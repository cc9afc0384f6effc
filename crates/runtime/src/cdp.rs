//! Minimal Chrome DevTools Protocol session over a page websocket.
//!
//! Commands are sent with increasing ids and matched to their responses.
//! Events that arrive while a command is pending are buffered so a later
//! [`CdpSession::wait_for_event`] can still observe them.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::trace;

use crate::error::{Result, RuntimeError};

const MAX_BUFFERED_EVENTS: usize = 256;

pub struct CdpSession {
	ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
	next_id: u64,
	events: VecDeque<Value>,
}

impl CdpSession {
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let (ws, _) = tokio_tungstenite::connect_async(ws_url)
			.await
			.map_err(|e| RuntimeError::WebSocket(format!("Failed to connect to {}: {}", ws_url, e)))?;
		Ok(Self {
			ws,
			next_id: 1,
			events: VecDeque::new(),
		})
	}

	/// Sends `method` and waits for its response, returning the `result` object.
	pub async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id;
		self.next_id += 1;

		let payload = json!({ "id": id, "method": method, "params": params });
		trace!(target = "seatwatch.browser", id, method, "cdp send");
		self.ws
			.send(Message::Text(payload.to_string().into()))
			.await
			.map_err(|e| RuntimeError::WebSocket(e.to_string()))?;

		loop {
			let message = self.next_message().await?;
			if message.get("id").and_then(Value::as_u64) == Some(id) {
				if let Some(error) = message.get("error") {
					let text = error.get("message").and_then(Value::as_str).unwrap_or("unknown error");
					return Err(RuntimeError::Protocol(format!("{} failed: {}", method, text)));
				}
				return Ok(message.get("result").cloned().unwrap_or(Value::Null));
			}
			if message.get("method").is_some() {
				self.buffer_event(message);
			}
		}
	}

	/// Waits for an event named `method`, consuming buffered events first.
	pub async fn wait_for_event(&mut self, method: &str, timeout: Duration) -> Result<Value> {
		if let Some(pos) = self.events.iter().position(|e| event_name(e) == Some(method)) {
			if let Some(event) = self.events.remove(pos) {
				return Ok(event.get("params").cloned().unwrap_or(Value::Null));
			}
		}

		let waited = tokio::time::timeout(timeout, async {
			loop {
				let message = self.next_message().await?;
				if event_name(&message) == Some(method) {
					return Ok::<_, RuntimeError>(message.get("params").cloned().unwrap_or(Value::Null));
				}
				if message.get("method").is_some() {
					self.buffer_event(message);
				}
			}
		})
		.await;

		match waited {
			Ok(result) => result,
			Err(_) => Err(RuntimeError::Timeout(format!("waiting for {} after {:?}", method, timeout))),
		}
	}

	pub async fn close(mut self) -> Result<()> {
		self.ws.close(None).await.map_err(|e| RuntimeError::WebSocket(e.to_string()))
	}

	async fn next_message(&mut self) -> Result<Value> {
		loop {
			let frame = self
				.ws
				.next()
				.await
				.ok_or_else(|| RuntimeError::WebSocket("connection closed".into()))?
				.map_err(|e| RuntimeError::WebSocket(e.to_string()))?;

			match frame {
				Message::Text(text) => return Ok(serde_json::from_str(&text)?),
				Message::Binary(bytes) => return Ok(serde_json::from_slice(&bytes)?),
				Message::Close(_) => return Err(RuntimeError::WebSocket("connection closed".into())),
				_ => continue,
			}
		}
	}

	fn buffer_event(&mut self, event: Value) {
		if self.events.len() >= MAX_BUFFERED_EVENTS {
			self.events.pop_front();
		}
		self.events.push_back(event);
	}
}

fn event_name(message: &Value) -> Option<&str> {
	message.get("method").and_then(Value::as_str)
}
