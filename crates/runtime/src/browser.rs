//! Browser process ownership and page rendering.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::cdp::CdpSession;
use crate::cdp_probe::{CdpVersionInfo, close_target, fetch_cdp_endpoint, open_target};
use crate::error::{Result, RuntimeError};
use crate::finder::find_chromium_executable;
use crate::process::{pick_debug_port, pid_is_alive};

const OUTER_HTML_JS: &str = "document.documentElement ? document.documentElement.outerHTML : ''";

/// Options for launching a private browser instance.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub debug_port: Option<u16>,
	pub navigation_timeout: Duration,
	/// Extra wait after the load event so client-side rendering can finish.
	pub settle: Duration,
	pub extra_args: Vec<String>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			debug_port: None,
			navigation_timeout: Duration::from_secs(30),
			settle: Duration::from_millis(750),
			extra_args: Vec::new(),
		}
	}
}

/// Rendered DOM of a loaded page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
	pub url: String,
	pub html: String,
}

/// A launched browser process listening for CDP on a local port.
///
/// The child is spawned with `kill_on_drop`, so dropping the handle on any
/// exit path terminates the process; [`Browser::close`] does the same
/// explicitly and reports failures.
pub struct Browser {
	child: Child,
	port: u16,
	info: CdpVersionInfo,
	options: LaunchOptions,
	_profile: TempDir,
}

impl Browser {
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = find_chromium_executable(options.executable.as_deref()).ok_or_else(|| {
			RuntimeError::ExecutableNotFound(
				"Could not find a Chrome/Chromium executable. \
				 Install one or set SEATWATCH_CHROME / browser.executable."
					.into(),
			)
		})?;
		let port = pick_debug_port(options.debug_port)?;
		let profile = tempfile::Builder::new().prefix("seatwatch-profile-").tempdir()?;

		let mut args = vec![
			format!("--remote-debugging-port={}", port),
			format!("--user-data-dir={}", profile.path().display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--disable-gpu".to_string(),
			"--disable-dev-shm-usage".to_string(),
		];
		if options.headless {
			args.push("--headless=new".to_string());
		}
		args.extend(options.extra_args.iter().cloned());

		let mut cmd = Command::new(&executable);
		cmd.args(&args)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		#[cfg(unix)]
		cmd.process_group(0);

		let mut child = cmd
			.spawn()
			.map_err(|e| RuntimeError::Launch(format!("Failed to launch {}: {}", executable.display(), e)))?;

		debug!(target = "seatwatch.browser", executable = %executable.display(), port, pid = ?child.id(), "browser spawned");

		let max_attempts = 25;
		let mut last_error = "endpoint not reachable".to_string();
		for _ in 0..max_attempts {
			tokio::time::sleep(Duration::from_millis(200)).await;

			if let Ok(Some(status)) = child.try_wait() {
				return Err(RuntimeError::Launch(format!(
					"Browser exited before debugging endpoint became available (status: {})",
					status
				)));
			}

			match fetch_cdp_endpoint(port).await {
				Ok(info) => {
					debug!(target = "seatwatch.browser", browser = ?info.browser, port, "debugging endpoint ready");
					return Ok(Self {
						child,
						port,
						info,
						options: options.clone(),
						_profile: profile,
					});
				}
				Err(e) => last_error = e.to_string(),
			}
		}

		let _ = child.kill().await;
		Err(RuntimeError::Launch(format!(
			"Browser launched but debugging endpoint not available on port {}: {}",
			port, last_error
		)))
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn version(&self) -> Option<&str> {
		self.info.browser.as_deref()
	}

	/// Navigates a fresh page to `url` and returns its rendered DOM.
	pub async fn render(&self, url: &str) -> Result<RenderedPage> {
		let target = open_target(self.port).await?;
		let result = self.render_in_target(&target.web_socket_debugger_url, url).await;
		if let Err(e) = close_target(self.port, &target.id).await {
			debug!(target = "seatwatch.browser", error = %e, "failed to close page target");
		}
		result
	}

	async fn render_in_target(&self, ws_url: &str, url: &str) -> Result<RenderedPage> {
		let mut session = CdpSession::connect(ws_url).await?;
		session.call("Page.enable", json!({})).await?;

		let navigation = session.call("Page.navigate", json!({ "url": url })).await?;
		if let Some(error) = navigation.get("errorText").and_then(Value::as_str) {
			return Err(RuntimeError::Protocol(format!("navigation to {} failed: {}", url, error)));
		}

		session.wait_for_event("Page.loadEventFired", self.options.navigation_timeout).await?;
		tokio::time::sleep(self.options.settle).await;

		let evaluated = session
			.call(
				"Runtime.evaluate",
				json!({ "expression": OUTER_HTML_JS, "returnByValue": true }),
			)
			.await?;
		let html = evaluated
			.pointer("/result/value")
			.and_then(Value::as_str)
			.ok_or_else(|| RuntimeError::Protocol("Runtime.evaluate returned no DOM".into()))?
			.to_string();

		let location = session
			.call(
				"Runtime.evaluate",
				json!({ "expression": "location.href", "returnByValue": true }),
			)
			.await
			.ok()
			.and_then(|v| v.pointer("/result/value").and_then(Value::as_str).map(str::to_string))
			.unwrap_or_else(|| url.to_string());

		let _ = session.close().await;
		Ok(RenderedPage { url: location, html })
	}

	/// Terminates the browser process and verifies it is gone.
	pub async fn close(mut self) -> Result<()> {
		let pid = self.child.id();
		if let Err(e) = self.child.kill().await {
			if self.child.try_wait()?.is_none() {
				return Err(RuntimeError::Io(e));
			}
		}

		if let Some(pid) = pid {
			if pid_is_alive(pid) {
				warn!(target = "seatwatch.browser", pid, "browser process still alive after kill");
				return Err(RuntimeError::Launch(format!("browser process {} did not exit", pid)));
			}
		}
		debug!(target = "seatwatch.browser", port = self.port, "browser closed");
		Ok(())
	}
}
