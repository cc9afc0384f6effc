//! Scripted in-memory transport for exercising the pipeline without a network.
//!
//! # Example
//!
//! ```ignore
//! let fake = FakeTransport::new();
//! fake.on_get("https://site/en/events/derby-1", 200, "<div class='sold-out'></div>");
//! fake.on_post("https://site/en/events/derby-1/book", 302, "").location("/checkout/9");
//!
//! let client = SessionClient::new(Arc::new(fake.clone()), site, credentials);
//! // ... drive the client ...
//! assert_eq!(fake.count(Method::Post, "/book"), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::transport::{Method, RawRequest, RawResponse, Transport};
use crate::error::{Result, SeatwatchError};

#[derive(Debug, Clone)]
enum Reply {
	Response {
		status: u16,
		headers: Vec<(String, String)>,
		body: String,
		delay: Duration,
	},
	Transient(String),
}

#[derive(Debug)]
struct Route {
	method: Method,
	url: String,
	replies: VecDeque<Reply>,
}

#[derive(Debug, Default)]
struct FakeState {
	routes: Vec<Route>,
	requests: Vec<RawRequest>,
}

/// Route table of queued replies plus a log of every request sent.
///
/// Each route answers with its queued replies in order and keeps repeating
/// the last one. Unrouted requests get a 404. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
	state: Arc<Mutex<FakeState>>,
}

/// Handle for adjusting the reply that was just queued.
pub struct ReplyHandle<'a> {
	fake: &'a FakeTransport,
	method: Method,
	url: String,
}

impl ReplyHandle<'_> {
	fn edit(self, apply: impl FnOnce(&mut Vec<(String, String)>, &mut Duration)) -> Self {
		{
			let mut state = self.fake.state.lock();
			if let Some(Reply::Response { headers, delay, .. }) = state
				.routes
				.iter_mut()
				.find(|r| r.method == self.method && r.url == self.url)
				.and_then(|r| r.replies.back_mut())
			{
				apply(headers, delay);
			}
		}
		self
	}

	/// Adds a header to the queued reply.
	pub fn header(self, name: &str, value: &str) -> Self {
		self.edit(|headers, _| headers.push((name.to_string(), value.to_string())))
	}

	/// Holds the queued reply back for `delay`, like a slow server.
	pub fn delay(self, delay: Duration) -> Self {
		self.edit(|_, slot| *slot = delay)
	}

	pub fn location(self, location: &str) -> Self {
		self.header("Location", location)
	}

	pub fn cookie(self, cookie: &str) -> Self {
		self.header("Set-Cookie", cookie)
	}
}

impl FakeTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on(&self, method: Method, url: &str, status: u16, body: &str) -> ReplyHandle<'_> {
		self.push(
			method,
			url,
			Reply::Response {
				status,
				headers: Vec::new(),
				body: body.to_string(),
				delay: Duration::ZERO,
			},
		);
		ReplyHandle {
			fake: self,
			method,
			url: url.to_string(),
		}
	}

	pub fn on_get(&self, url: &str, status: u16, body: &str) -> ReplyHandle<'_> {
		self.on(Method::Get, url, status, body)
	}

	pub fn on_post(&self, url: &str, status: u16, body: &str) -> ReplyHandle<'_> {
		self.on(Method::Post, url, status, body)
	}

	/// Queues a transport-level failure (timeout, reset).
	pub fn fail(&self, method: Method, url: &str, message: &str) {
		self.push(method, url, Reply::Transient(message.to_string()));
	}

	fn push(&self, method: Method, url: &str, reply: Reply) {
		let mut state = self.state.lock();
		match state.routes.iter_mut().find(|r| r.method == method && r.url == url) {
			Some(route) => route.replies.push_back(reply),
			None => state.routes.push(Route {
				method,
				url: url.to_string(),
				replies: VecDeque::from([reply]),
			}),
		}
	}

	/// Every request sent so far, in order.
	pub fn requests(&self) -> Vec<RawRequest> {
		self.state.lock().requests.clone()
	}

	/// Number of requests with `method` whose URL contains `fragment`.
	pub fn count(&self, method: Method, fragment: &str) -> usize {
		self.state.lock().requests.iter().filter(|r| r.method == method && r.url.contains(fragment)).count()
	}

	pub fn last_request(&self, method: Method, fragment: &str) -> Option<RawRequest> {
		self.state.lock().requests.iter().rev().find(|r| r.method == method && r.url.contains(fragment)).cloned()
	}
}

fn strip_query(url: &str) -> &str {
	url.split(['?', '#']).next().unwrap_or(url)
}

#[async_trait]
impl Transport for FakeTransport {
	async fn send(&self, request: RawRequest) -> Result<RawResponse> {
		let reply = {
			let mut state = self.state.lock();
			state.requests.push(request.clone());
			let index = state
				.routes
				.iter()
				.position(|r| r.method == request.method && r.url == request.url)
				.or_else(|| {
					state
						.routes
						.iter()
						.position(|r| r.method == request.method && strip_query(&r.url) == strip_query(&request.url))
				});
			index.and_then(|i| {
				let replies = &mut state.routes[i].replies;
				if replies.len() > 1 { replies.pop_front() } else { replies.front().cloned() }
			})
		};

		match reply {
			Some(Reply::Response { status, headers, body, delay }) => {
				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}
				Ok(RawResponse {
					status,
					url: request.url,
					headers,
					body,
				})
			}
			Some(Reply::Transient(message)) => Err(SeatwatchError::Transient(message)),
			None => Ok(RawResponse::new(404, request.url, "Not Found")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn replays_queue_then_repeats_last_reply() {
		let fake = FakeTransport::new();
		fake.fail(Method::Get, "https://x/a", "timeout");
		fake.on_get("https://x/a", 200, "ok");

		assert!(fake.send(RawRequest::get("https://x/a")).await.unwrap_err().is_transient());
		assert_eq!(fake.send(RawRequest::get("https://x/a")).await.unwrap().body, "ok");
		assert_eq!(fake.send(RawRequest::get("https://x/a")).await.unwrap().body, "ok");
		assert_eq!(fake.count(Method::Get, "/a"), 3);
	}

	#[tokio::test]
	async fn unrouted_requests_get_404_and_query_is_ignored_as_fallback() {
		let fake = FakeTransport::new();
		fake.on_get("https://x/search", 200, "results").header("Content-Type", "text/html");

		let hit = fake.send(RawRequest::get("https://x/search?q=derby")).await.unwrap();
		assert_eq!(hit.body, "results");
		assert_eq!(hit.header("content-type"), Some("text/html"));
		assert_eq!(fake.send(RawRequest::get("https://x/other")).await.unwrap().status, 404);
	}

	#[tokio::test]
	async fn clones_share_routes_and_log() {
		let fake = FakeTransport::new();
		let clone = fake.clone();
		fake.on_post("https://x/login", 302, "").location("/home").cookie("sid=1");
		let response = clone.send(RawRequest::post_form("https://x/login", Vec::new())).await.unwrap();
		assert_eq!(response.location(), Some("/home"));
		assert_eq!(fake.requests().len(), 1);
	}
}
