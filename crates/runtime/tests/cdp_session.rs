//! CDP session correlation tests against an in-process websocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use seatwatch_runtime::{CdpSession, RuntimeError};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server<F>(script: F) -> (String, tokio::task::JoinHandle<()>)
where
	F: FnOnce(Vec<Value>) -> Vec<Value> + Send + 'static,
{
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();

	let handle = tokio::spawn(async move {
		let (stream, _) = listener.accept().await.unwrap();
		let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
		let (mut tx, mut rx) = ws.split();

		let incoming = rx.next().await.unwrap().unwrap();
		let request: Value = match incoming {
			Message::Text(text) => serde_json::from_str(&text).unwrap(),
			other => panic!("unexpected frame: {other:?}"),
		};

		for reply in script(vec![request]) {
			tx.send(Message::Text(reply.to_string().into())).await.unwrap();
		}
		// Keep the socket open until the client hangs up.
		while let Some(Ok(_)) = rx.next().await {}
	});

	(format!("ws://{}", addr), handle)
}

#[tokio::test]
async fn call_skips_events_and_matches_response_id() {
	let (url, server) = spawn_server(|requests| {
		let id = requests[0]["id"].as_u64().unwrap();
		vec![
			json!({ "method": "Page.loadEventFired", "params": { "timestamp": 1.5 } }),
			json!({ "id": id + 100, "result": { "ignored": true } }),
			json!({ "id": id, "result": { "frameId": "F1" } }),
		]
	})
	.await;

	let mut session = CdpSession::connect(&url).await.unwrap();
	let result = session.call("Page.navigate", json!({ "url": "https://example.com" })).await.unwrap();
	assert_eq!(result["frameId"], "F1");

	// The event delivered before the response is still observable.
	let event = session.wait_for_event("Page.loadEventFired", Duration::from_millis(100)).await.unwrap();
	assert_eq!(event["timestamp"], 1.5);

	session.close().await.unwrap();
	server.await.unwrap();
}

#[tokio::test]
async fn protocol_errors_surface_method_name() {
	let (url, server) = spawn_server(|requests| {
		let id = requests[0]["id"].as_u64().unwrap();
		vec![json!({ "id": id, "error": { "code": -32000, "message": "Cannot navigate to invalid URL" } })]
	})
	.await;

	let mut session = CdpSession::connect(&url).await.unwrap();
	let err = session.call("Page.navigate", json!({ "url": "nope" })).await.unwrap_err();
	match err {
		RuntimeError::Protocol(msg) => {
			assert!(msg.contains("Page.navigate"));
			assert!(msg.contains("invalid URL"));
		}
		other => panic!("unexpected error: {other}"),
	}

	session.close().await.unwrap();
	server.await.unwrap();
}

#[tokio::test]
async fn waiting_for_missing_event_times_out() {
	let (url, server) = spawn_server(|requests| {
		let id = requests[0]["id"].as_u64().unwrap();
		vec![json!({ "id": id, "result": {} })]
	})
	.await;

	let mut session = CdpSession::connect(&url).await.unwrap();
	session.call("Page.enable", json!({})).await.unwrap();
	let err = session.wait_for_event("Page.loadEventFired", Duration::from_millis(50)).await.unwrap_err();
	assert!(matches!(err, RuntimeError::Timeout(_)));

	session.close().await.unwrap();
	server.await.unwrap();
}
