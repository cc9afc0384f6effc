//! Control-plane HTTP surface.
//!
//! A thin adapter over [`Scheduler`]: every route maps to one scheduler call
//! and failures are rendered as `{"success": false, "message": ...}`.

mod error;
mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use seatwatch::Scheduler;
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;

pub fn router(scheduler: Arc<Scheduler>) -> Router {
	Router::new()
		.route("/api/status", get(handlers::status))
		.route("/api/tasks", post(handlers::start_task))
		.route("/api/tasks/{id}", delete(handlers::stop_task))
		.route("/api/tasks/{id}/config", patch(handlers::update_task))
		.route("/api/tasks/{id}/check", post(handlers::check_task))
		.route("/api/search", post(handlers::search))
		.with_state(scheduler)
}

/// Serves the control plane on `listener` until `shutdown` resolves.
pub async fn serve(listener: TcpListener, scheduler: Arc<Scheduler>, shutdown: impl Future<Output = ()> + Send + 'static) -> std::io::Result<()> {
	let addr: SocketAddr = listener.local_addr()?;
	info!(target = "seatwatch.server", %addr, "control plane listening");
	axum::serve(listener, router(scheduler)).with_graceful_shutdown(shutdown).await
}
