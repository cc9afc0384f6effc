//! Settings file: site profile, credentials, payer, matches and runtime knobs.
//!
//! Loaded from JSON (`~/.config/seatwatch/config.json` unless a path is
//! given), then overridden from the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use seatwatch_protocol::MatchConfig;
use seatwatch_runtime::LaunchOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::audit::AuditLog;
use crate::checkout::Payer;
use crate::error::{Result, SeatwatchError};
use crate::pipeline::Pipeline;
use crate::probe::BrowserRenderer;
use crate::retry::RetryPolicy;
use crate::session::{Credentials, HttpTransport};
use crate::site::{Site, SiteProfile};
use crate::target::TargetMatch;

const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".into(),
			port: 3000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
	/// Enables the rendered-browser probe strategy.
	pub enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub executable: Option<PathBuf>,
	pub headless: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub debug_port: Option<u16>,
	pub navigation_timeout_secs: u64,
}

impl Default for BrowserSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			executable: None,
			headless: true,
			debug_port: None,
			navigation_timeout_secs: 30,
		}
	}
}

impl BrowserSettings {
	pub fn launch_options(&self) -> LaunchOptions {
		LaunchOptions {
			executable: self.executable.clone(),
			headless: self.headless,
			debug_port: self.debug_port,
			navigation_timeout: Duration::from_secs(self.navigation_timeout_secs.max(1)),
			..LaunchOptions::default()
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
	pub attempts: u32,
	pub backoff_step_ms: u64,
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self {
			attempts: 3,
			backoff_step_ms: 1000,
		}
	}
}

impl RetrySettings {
	pub fn policy(&self) -> RetryPolicy {
		RetryPolicy::linear(self.attempts.max(1), Duration::from_millis(self.backoff_step_ms))
	}
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialSettings {
	pub email: String,
	pub password: String,
}

impl std::fmt::Debug for CredentialSettings {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CredentialSettings")
			.field("email", &self.email)
			.field("password", &redacted(&self.password))
			.finish()
	}
}

fn redacted(secret: &str) -> &'static str {
	if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

/// On-disk settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
	pub schema: u32,
	pub site: SiteProfile,
	pub credentials: CredentialSettings,
	pub payer: Payer,
	pub matches: Vec<MatchConfig>,
	pub poll_interval_secs: u64,
	pub server: ServerSettings,
	pub browser: BrowserSettings,
	pub retry: RetrySettings,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub audit_log: Option<PathBuf>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			schema: SETTINGS_SCHEMA_VERSION,
			site: SiteProfile::default(),
			credentials: CredentialSettings::default(),
			payer: Payer::default(),
			matches: Vec::new(),
			poll_interval_secs: 30,
			server: ServerSettings::default(),
			browser: BrowserSettings::default(),
			retry: RetrySettings::default(),
			audit_log: None,
		}
	}
}

/// `$XDG_CONFIG_HOME/seatwatch/config.json` or the platform equivalent.
pub fn default_settings_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("seatwatch").join("config.json"))
}

impl Settings {
	/// Reads `path`, or the default path. A missing default file yields defaults;
	/// a missing explicit file is an error.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let (path, explicit) = match path {
			Some(path) => (path.to_path_buf(), true),
			None => match default_settings_path() {
				Some(path) => (path, false),
				None => return Ok(Self::default()),
			},
		};
		if !path.exists() {
			if explicit {
				return Err(SeatwatchError::Config(format!("settings file {} does not exist", path.display())));
			}
			debug!(target = "seatwatch.settings", path = %path.display(), "no settings file; using defaults");
			return Ok(Self::default());
		}
		let content = fs::read_to_string(&path)?;
		serde_json::from_str(&content).map_err(|e| SeatwatchError::Config(format!("{}: {}", path.display(), e)))
	}

	/// [`Settings::load`] followed by process-environment overrides.
	pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
		let mut settings = Self::load(path)?;
		settings.apply_env(|key| std::env::var(key).ok());
		Ok(settings)
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}
		let json = serde_json::to_string_pretty(self)?;
		fs::write(path, json)?;
		Ok(())
	}

	/// Applies `LOGIN_EMAIL`, `LOGIN_PASSWORD`, `WEBSITE_URL`, `CHECK_INTERVAL`,
	/// `HEADLESS`, `HOST`, `PORT` and the payer variables. Unparseable numbers
	/// are ignored.
	pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
		let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		if let Some(email) = var("LOGIN_EMAIL") {
			self.credentials.email = email;
		}
		if let Some(password) = var("LOGIN_PASSWORD") {
			self.credentials.password = password;
		}
		if let Some(base) = var("WEBSITE_URL") {
			self.site.base_url = base;
		}
		if let Some(secs) = var("CHECK_INTERVAL").and_then(|v| v.parse().ok()) {
			self.poll_interval_secs = secs;
		}
		if let Some(headless) = var("HEADLESS") {
			self.browser.headless = !matches!(headless.to_ascii_lowercase().as_str(), "false" | "0" | "no");
		}
		if let Some(host) = var("HOST") {
			self.server.host = host;
		}
		if let Some(port) = var("PORT").and_then(|v| v.parse().ok()) {
			self.server.port = port;
		}
		if let Some(first) = var("FIRST_NAME") {
			self.payer.first_name = first;
		}
		if let Some(last) = var("LAST_NAME") {
			self.payer.last_name = last;
		}
		if let Some(email) = var("EMAIL") {
			self.payer.email = email;
		}
		if let Some(phone) = var("PHONE") {
			self.payer.phone = phone;
		}
	}

	/// Every problem found, or `Ok` when the settings can drive a run.
	pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
		let mut problems = Vec::new();
		if self.poll_interval_secs == 0 {
			problems.push("pollIntervalSecs must be greater than zero".to_string());
		}
		if Url::parse(&self.site.base_url).is_err() {
			problems.push(format!("site.baseUrl {:?} is not a valid URL", self.site.base_url));
		}
		if let Err(e) = Site::new(self.site.clone()) {
			problems.push(e.to_string());
		}
		for (index, config) in self.matches.iter().enumerate() {
			if let Err(e) = TargetMatch::from_config(config) {
				problems.push(format!("matches[{}]: {}", index, e));
			}
			if config.interval_secs == Some(0) {
				problems.push(format!("matches[{}]: intervalSecs must be greater than zero", index));
			}
		}
		if problems.is_empty() { Ok(()) } else { Err(problems) }
	}

	pub fn credentials(&self) -> Credentials {
		Credentials::new(self.credentials.email.as_str(), self.credentials.password.as_str())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	/// Live pipeline over HTTP, with the browser renderer when enabled.
	pub fn pipeline(&self) -> Result<Pipeline> {
		let site = Arc::new(Site::new(self.site.clone())?);
		let transport = HttpTransport::new(&self.site.user_agent, Duration::from_secs(self.site.request_timeout_secs.max(1)))?;
		let mut pipeline = Pipeline::new(Arc::new(transport), site)
			.with_credentials(self.credentials())
			.with_payer(self.payer.clone())
			.with_retry(self.retry.policy())
			.with_audit(Arc::new(AuditLog::new(self.audit_log.clone())));
		if self.browser.enabled {
			pipeline = pipeline.with_renderer(Arc::new(BrowserRenderer::new(self.browser.launch_options())));
		}
		Ok(pipeline)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	#[test]
	fn partial_file_fills_defaults() {
		let settings: Settings = serde_json::from_str(
			r#"{"credentials":{"email":"fan@example.com"},"matches":[{"name":"Derby","searchTerm":"derby"}],"server":{"port":8080}}"#,
		)
		.unwrap();
		assert_eq!(settings.poll_interval_secs, 30);
		assert_eq!(settings.server.host, "127.0.0.1");
		assert_eq!(settings.server.port, 8080);
		assert_eq!(settings.retry.attempts, 3);
		assert_eq!(settings.site.base_url, "https://webook.com");
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn env_overrides_file_values() {
		let env: HashMap<&str, &str> = HashMap::from([
			("LOGIN_EMAIL", "env@example.com"),
			("LOGIN_PASSWORD", "hunter2"),
			("CHECK_INTERVAL", "12"),
			("HEADLESS", "false"),
			("PORT", "not-a-port"),
			("FIRST_NAME", "Sara"),
		]);
		let mut settings = Settings::default();
		settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

		assert_eq!(settings.credentials.email, "env@example.com");
		assert_eq!(settings.poll_interval_secs, 12);
		assert!(!settings.browser.headless);
		assert_eq!(settings.server.port, 3000);
		assert_eq!(settings.payer.first_name, "Sara");
	}

	#[test]
	fn validate_collects_every_problem() {
		let mut settings = Settings::default();
		settings.poll_interval_secs = 0;
		settings.site.base_url = "not a url".into();
		settings.matches.push(serde_json::from_str(r#"{"name":"Nowhere","quantity":0,"url":"https://webook.com/en/events/x-1"}"#).unwrap());
		let problems = settings.validate().unwrap_err();
		assert!(problems.iter().any(|p| p.contains("pollIntervalSecs")));
		assert!(problems.iter().any(|p| p.contains("baseUrl")));
		assert!(problems.iter().any(|p| p.starts_with("matches[0]")));
	}

	#[test]
	fn debug_output_hides_password() {
		let mut settings = Settings::default();
		settings.credentials.password = "hunter2".into();
		let debug = format!("{:?}", settings);
		assert!(!debug.contains("hunter2"));
		assert!(debug.contains("<redacted>"));
	}

	#[test]
	fn save_then_load_round_trips_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.json");
		let mut settings = Settings::default();
		settings.audit_log = Some(dir.path().join("audit.jsonl"));
		settings.save(&path).unwrap();
		assert_eq!(Settings::load(Some(&path)).unwrap(), settings);
		assert!(Settings::load(Some(&dir.path().join("missing.json"))).is_err());
	}
}
