use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("Browser executable not found: {0}")]
	ExecutableNotFound(String),

	#[error("Browser launch failed: {0}")]
	Launch(String),

	#[error("CDP endpoint error: {0}")]
	Endpoint(String),

	#[error("CDP protocol error: {0}")]
	Protocol(String),

	#[error("WebSocket error: {0}")]
	WebSocket(String),

	#[error("Timed out: {0}")]
	Timeout(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
