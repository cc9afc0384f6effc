//! Liveness and port checks used around the browser child process.

use std::net::TcpListener;

/// Whether the browser child with `pid` still runs. Zombies count as exited.
#[cfg(target_os = "linux")]
pub fn pid_is_alive(pid: u32) -> bool {
	if pid == 0 {
		return false;
	}
	match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
		// Field 3, after the parenthesised command name, is the state letter.
		Ok(stat) => stat.rsplit_once(") ").is_some_and(|(_, rest)| !rest.starts_with('Z')),
		Err(_) => false,
	}
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn pid_is_alive(pid: u32) -> bool {
	pid != 0
		&& std::process::Command::new("kill")
			.args(["-0", &pid.to_string()])
			.status()
			.is_ok_and(|status| status.success())
}

/// Without a cheap liveness probe the kill result is trusted.
#[cfg(not(unix))]
pub fn pid_is_alive(pid: u32) -> bool {
	pid == std::process::id()
}

/// `preferred` when it can be bound on loopback, otherwise an ephemeral port.
pub fn pick_debug_port(preferred: Option<u16>) -> std::io::Result<u16> {
	if let Some(port) = preferred.filter(|p| TcpListener::bind(("127.0.0.1", *p)).is_ok()) {
		return Ok(port);
	}
	TcpListener::bind(("127.0.0.1", 0))?.local_addr().map(|addr| addr.port())
}
