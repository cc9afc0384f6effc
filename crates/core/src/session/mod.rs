//! Session client: cookies, login and raw requests against the target site.

mod client;
mod fake_transport;
mod state;
mod transport;

pub use client::{Credentials, SessionClient};
pub use fake_transport::{FakeTransport, ReplyHandle};
pub use state::SessionState;
pub use transport::{HttpTransport, Method, RawRequest, RawResponse, RequestBody, Transport};
