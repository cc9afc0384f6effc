//! Authenticated access to the target site.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::state::SessionState;
use super::transport::{Method, RawRequest, RawResponse, RequestBody, Transport};
use crate::clock::now_ms;
use crate::error::{Result, SeatwatchError};
use crate::html::{Document, Form, meta_content, snippet};
use crate::site::Site;

const MAX_REDIRECTS: usize = 5;
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Account used to log in. The password never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl Credentials {
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			password: password.into(),
		}
	}

	pub fn is_complete(&self) -> bool {
		!self.email.trim().is_empty() && !self.password.is_empty()
	}
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials").field("email", &self.email).field("password", &"<redacted>").finish()
	}
}

/// Holds one [`SessionState`] and performs requests on its behalf.
///
/// Methods take `&self`; the state lock is never held across a request, and
/// callers are expected to drive one purchase flow per client at a time.
pub struct SessionClient {
	transport: Arc<dyn Transport>,
	site: Arc<Site>,
	credentials: Credentials,
	state: Mutex<SessionState>,
}

impl SessionClient {
	pub fn new(transport: Arc<dyn Transport>, site: Arc<Site>, credentials: Credentials) -> Self {
		Self {
			transport,
			site,
			credentials,
			state: Mutex::new(SessionState::default()),
		}
	}

	pub fn site(&self) -> &Arc<Site> {
		&self.site
	}

	/// Snapshot of the current session state.
	pub fn state(&self) -> SessionState {
		self.state.lock().clone()
	}

	pub fn is_authenticated(&self) -> bool {
		self.state.lock().is_authenticated()
	}

	/// Forgets the current session.
	pub fn reset(&self) {
		self.state.lock().clear();
	}

	/// Logs in with the configured credentials.
	///
	/// Fails with [`SeatwatchError::LoginFailed`] only on an explicit negative
	/// signal. A response with no signal either way is accepted and the state
	/// is marked unverified.
	pub async fn login(&self) -> Result<SessionState> {
		if !self.credentials.is_complete() {
			return Err(SeatwatchError::LoginFailed("no credentials configured".into()));
		}
		let login_url = self.site.login_url()?;
		info!(target = "seatwatch.session", url = %login_url, "logging in");

		let page = self.exchange(RawRequest::get(&login_url).header("Accept", HTML_ACCEPT), true, false).await?;
		if page.status >= 400 {
			return Err(SeatwatchError::LoginFailed(format!("login page returned status {}", page.status)));
		}

		let cookies_before = self.state.lock().cookie_header();
		let doc = Document::parse(page.body.as_str());
		let form_el = self.site.selectors.login_form.first_match(&doc).and_then(|(_, found)| found.into_iter().next());
		let mut form = form_el.as_ref().map(Form::from_element).unwrap_or_default();

		let token = form
			.field("_token")
			.map(str::to_string)
			.or_else(|| meta_content(&doc, "csrf-token"))
			.or_else(|| self.state.lock().cookie("XSRF-TOKEN").map(str::to_string));
		if let Some(token) = &token {
			form.set("_token", token.as_str());
		}

		let (email_field, password_field) = match &form_el {
			Some(el) => credential_field_names(el),
			None => ("email".to_string(), "password".to_string()),
		};
		form.set(&email_field, self.credentials.email.as_str());
		form.set(&password_field, self.credentials.password.as_str());

		let action = match form.action.as_deref() {
			Some(action) => self.site.resolve(&page.url, action)?,
			None => login_url.clone(),
		};

		let response = self
			.exchange(
				RawRequest::post_form(&action, form.fields.clone())
					.header("Accept", HTML_ACCEPT)
					.header("Referer", login_url.as_str()),
				true,
				false,
			)
			.await?;

		let verified = self.classify_login(&response, cookies_before)?;
		let mut state = self.state.lock();
		state.mark_logged_in(&self.credentials.email, now_ms(), verified);
		if verified {
			info!(target = "seatwatch.session", "login succeeded");
		} else {
			warn!(target = "seatwatch.session", status = response.status, "login response was ambiguous; continuing unverified");
		}
		Ok(state.clone())
	}

	fn classify_login(&self, response: &RawResponse, cookies_before: Option<String>) -> Result<bool> {
		if let Some(location) = response.location() {
			if self.site.is_login_url(location) {
				return Err(SeatwatchError::LoginFailed("redirected back to the login page".into()));
			}
			return Ok(true);
		}

		let doc = Document::parse(response.body.as_str());
		if let Some((_, errors)) = self.site.selectors.login_error.first_match(&doc) {
			let message = errors.iter().map(|e| e.text()).find(|t| !t.is_empty()).unwrap_or_else(|| "login rejected".into());
			return Err(SeatwatchError::LoginFailed(snippet(&message, 200)));
		}
		if response.status >= 400 {
			return Err(SeatwatchError::LoginFailed(format!("login returned status {}", response.status)));
		}

		if self.site.selectors.logged_in.matches_any(&doc) {
			return Ok(true);
		}
		let cookies_changed = self.state.lock().cookie_header() != cookies_before;
		let form_gone = !self.site.selectors.login_form.matches_any(&doc);
		Ok(cookies_changed && form_gone)
	}

	/// Performs one request without following redirects.
	///
	/// With `uses_session`, the session cookies are attached and a response
	/// that shows the session is gone clears the state and yields
	/// [`SeatwatchError::SessionExpired`]. No retry happens here.
	pub async fn request(&self, method: Method, url: &str, body: Option<RequestBody>, uses_session: bool) -> Result<RawResponse> {
		let request = RawRequest {
			method,
			url: url.to_string(),
			headers: vec![("Accept".to_string(), HTML_ACCEPT.to_string())],
			body,
		};
		self.send(request, uses_session).await
	}

	/// GET that follows redirects, checking each hop for session loss.
	pub async fn navigate(&self, url: &str, uses_session: bool) -> Result<RawResponse> {
		let mut current = url.to_string();
		for _ in 0..=MAX_REDIRECTS {
			let response = self.request(Method::Get, &current, None, uses_session).await?;
			match response.location() {
				Some(location) => current = self.site.resolve(&current, location)?,
				None => return Ok(response),
			}
		}
		Err(SeatwatchError::Http(format!("too many redirects starting at {}", url)))
	}

	/// JSON GET for API endpoints, without session cookies.
	pub async fn get_json(&self, url: &str) -> Result<RawResponse> {
		self.send(RawRequest::get(url).header("Accept", "application/json"), false).await
	}

	pub async fn send(&self, request: RawRequest, uses_session: bool) -> Result<RawResponse> {
		self.exchange(request, uses_session, uses_session).await
	}

	async fn exchange(&self, mut request: RawRequest, attach_cookies: bool, detect_loss: bool) -> Result<RawResponse> {
		if attach_cookies {
			if let Some(cookies) = self.state.lock().cookie_header() {
				request.headers.push(("Cookie".to_string(), cookies));
			}
		}

		let method = request.method;
		let url = request.url.clone();
		debug!(target = "seatwatch.session", %method, url = %url, with_session = attach_cookies, "request");
		let response = self.transport.send(request).await?;
		self.state.lock().absorb(&response);

		if response.status >= 500 {
			return Err(SeatwatchError::Transient(format!("{} {} returned status {}", method, url, response.status)));
		}

		if detect_loss && self.shows_session_loss(&response) {
			warn!(target = "seatwatch.session", url = %url, status = response.status, "session expired");
			self.state.lock().clear();
			return Err(SeatwatchError::SessionExpired);
		}
		Ok(response)
	}

	fn shows_session_loss(&self, response: &RawResponse) -> bool {
		if let Some(location) = response.location() {
			return self.site.is_login_url(location);
		}
		if response.status == 401 {
			return true;
		}
		if !response.is_success() || self.site.is_login_url(&response.url) {
			return false;
		}
		let doc = Document::parse(response.body.as_str());
		self.site.selectors.login_form.matches_any(&doc)
	}
}

fn credential_field_names(form: &crate::html::Element<'_>) -> (String, String) {
	let email = form
		.find_first("input[type=email][name]")
		.or_else(|| form.find_first("input[name*=email]"))
		.or_else(|| form.find_first("input[name*=user]"))
		.and_then(|input| input.attr("name"))
		.unwrap_or_else(|| "email".to_string());
	let password = form
		.find_first("input[type=password][name]")
		.and_then(|input| input.attr("name"))
		.unwrap_or_else(|| "password".to_string());
	(email, password)
}
