//! Raw HTTP exchange used by the session client.
//!
//! The [`Transport`] trait is the seam between the pipeline and the network:
//! [`HttpTransport`] talks to the real site through reqwest, while
//! [`super::FakeTransport`] serves scripted responses in tests. Redirects are
//! never followed by a transport; the session client decides what to do with
//! them.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, SeatwatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

impl std::fmt::Display for Method {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Method::Get => write!(f, "GET"),
			Method::Post => write!(f, "POST"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
	Form(Vec<(String, String)>),
	Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
	pub method: Method,
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: Option<RequestBody>,
}

impl RawRequest {
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: Method::Get,
			url: url.into(),
			headers: Vec::new(),
			body: None,
		}
	}

	pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
		Self {
			method: Method::Post,
			url: url.into(),
			headers: Vec::new(),
			body: Some(RequestBody::Form(fields)),
		}
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}

	/// Value of a submitted form field.
	pub fn form_value(&self, name: &str) -> Option<&str> {
		match &self.body {
			Some(RequestBody::Form(fields)) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
			_ => None,
		}
	}

	/// Every value submitted under `name`, for repeated fields like `seats[]`.
	pub fn form_values(&self, name: &str) -> Vec<&str> {
		match &self.body {
			Some(RequestBody::Form(fields)) => fields.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect(),
			_ => Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
	pub status: u16,
	/// URL the response was served for.
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub body: String,
}

impl RawResponse {
	pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
		Self {
			status,
			url: url.into(),
			headers: Vec::new(),
			body: body.into(),
		}
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}

	pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
		self.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie")).map(|(_, v)| v.as_str())
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	pub fn is_redirect(&self) -> bool {
		(300..400).contains(&self.status) && self.header("location").is_some()
	}

	pub fn location(&self) -> Option<&str> {
		if self.is_redirect() { self.header("location") } else { None }
	}

	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_json::from_str(&self.body)?)
	}
}

#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: RawRequest) -> Result<RawResponse>;
}

/// reqwest-backed transport. Cookies are carried by the session state, not
/// by a client-side jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent(user_agent)
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(|e| SeatwatchError::Http(format!("Failed to create HTTP client: {}", e)))?;
		Ok(Self { client })
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: RawRequest) -> Result<RawResponse> {
		let mut builder = match request.method {
			Method::Get => self.client.get(&request.url),
			Method::Post => self.client.post(&request.url),
		};
		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		builder = match &request.body {
			Some(RequestBody::Form(fields)) => builder.form(fields),
			Some(RequestBody::Json(value)) => builder.json(value),
			None => builder,
		};

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let url = response.url().to_string();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
			.collect();
		let body = response.text().await?;

		Ok(RawResponse {
			status,
			url,
			headers,
			body,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn redirect_requires_location() {
		let bare = RawResponse::new(302, "https://x/a", "");
		assert!(!bare.is_redirect());
		let redirect = bare.with_header("Location", "/en/login");
		assert_eq!(redirect.location(), Some("/en/login"));
	}

	#[test]
	fn collects_every_set_cookie_header() {
		let response = RawResponse::new(200, "https://x/", "")
			.with_header("Set-Cookie", "a=1; Path=/")
			.with_header("content-type", "text/html")
			.with_header("set-cookie", "b=2; HttpOnly");
		assert_eq!(response.set_cookies().count(), 2);
	}

	#[test]
	fn form_values_are_readable() {
		let request = RawRequest::post_form("https://x/book", vec![("quantity".into(), "2".into())]);
		assert_eq!(request.form_value("quantity"), Some("2"));
		assert_eq!(request.form_value("team"), None);
	}
}
