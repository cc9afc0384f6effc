//! CDP HTTP endpoint probing and target management.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RuntimeError};

/// `/json/version` response subset from Chrome DevTools Protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// Page target created through `/json/new`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpTarget {
	pub id: String,
	#[serde(default)]
	pub url: String,
	pub web_socket_debugger_url: String,
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
	reqwest::Client::builder()
		.timeout(timeout)
		.build()
		.map_err(|e| RuntimeError::Endpoint(format!("Failed to create HTTP client: {}", e)))
}

/// Resolves CDP version metadata from `/json/version` on `port`.
pub async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
	let client = http_client(Duration::from_millis(400))?;
	let mut last_error = "no response".to_string();

	for url in [
		format!("http://127.0.0.1:{}/json/version", port),
		format!("http://localhost:{}/json/version", port),
	] {
		let response = match client.get(&url).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		let info: CdpVersionInfo = response
			.json()
			.await
			.map_err(|e| RuntimeError::Endpoint(format!("Failed to parse CDP response: {}", e)))?;
		return Ok(info);
	}

	Err(RuntimeError::Endpoint(format!("Failed to connect to port {}: {}", port, last_error)))
}

/// Opens a blank page target. Navigation happens over the target's websocket.
pub async fn open_target(port: u16) -> Result<CdpTarget> {
	let client = http_client(Duration::from_secs(5))?;
	let url = format!("http://127.0.0.1:{}/json/new?about:blank", port);
	// Recent Chromium rejects GET on /json/new.
	let response = client
		.put(&url)
		.send()
		.await
		.map_err(|e| RuntimeError::Endpoint(format!("Failed to open page target: {}", e)))?;

	if !response.status().is_success() {
		return Err(RuntimeError::Endpoint(format!("Opening page target returned status {}", response.status())));
	}

	response
		.json()
		.await
		.map_err(|e| RuntimeError::Endpoint(format!("Failed to parse target response: {}", e)))
}

/// Closes a page target by id.
pub async fn close_target(port: u16, target_id: &str) -> Result<()> {
	let client = http_client(Duration::from_secs(2))?;
	let url = format!("http://127.0.0.1:{}/json/close/{}", port, target_id);
	client
		.get(&url)
		.send()
		.await
		.map_err(|e| RuntimeError::Endpoint(format!("Failed to close target {}: {}", target_id, e)))?;
	Ok(())
}
