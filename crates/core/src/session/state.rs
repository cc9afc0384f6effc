use std::collections::BTreeMap;

use super::transport::RawResponse;

/// Authentication context of one session client.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
	/// Account identifier the session was opened for; never the secret.
	pub credential_ref: Option<String>,
	cookies: BTreeMap<String, String>,
	pub logged_in_at: Option<u64>,
	/// False when login succeeded without an explicit positive signal.
	pub verified: bool,
}

impl SessionState {
	pub fn is_authenticated(&self) -> bool {
		self.logged_in_at.is_some()
	}

	pub fn mark_logged_in(&mut self, credential_ref: &str, at: u64, verified: bool) {
		self.credential_ref = Some(credential_ref.to_string());
		self.logged_in_at = Some(at);
		self.verified = verified;
	}

	/// Drops cookies and login marks, e.g. after the site logged us out.
	pub fn clear(&mut self) {
		self.cookies.clear();
		self.logged_in_at = None;
		self.verified = false;
	}

	/// Applies the `Set-Cookie` headers of `response`.
	pub fn absorb(&mut self, response: &RawResponse) {
		for header in response.set_cookies() {
			self.apply_set_cookie(header);
		}
	}

	fn apply_set_cookie(&mut self, header: &str) {
		let mut parts = header.split(';');
		let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
			return;
		};
		let name = name.trim();
		if name.is_empty() {
			return;
		}
		let value = value.trim().trim_matches('"');

		let expired = parts.any(|attr| {
			let attr = attr.trim().to_ascii_lowercase();
			attr == "max-age=0" || attr.starts_with("max-age=-") || attr.contains("expires=thu, 01 jan 1970")
		});
		if expired || value.is_empty() || value == "deleted" {
			self.cookies.remove(name);
		} else {
			self.cookies.insert(name.to_string(), value.to_string());
		}
	}

	pub fn set_cookie(&mut self, name: &str, value: &str) {
		self.cookies.insert(name.to_string(), value.to_string());
	}

	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.get(name).map(String::as_str)
	}

	pub fn has_cookies(&self) -> bool {
		!self.cookies.is_empty()
	}

	/// `Cookie` request header value, if any cookie is held.
	pub fn cookie_header(&self) -> Option<String> {
		if self.cookies.is_empty() {
			return None;
		}
		Some(self.cookies.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("; "))
	}
}
