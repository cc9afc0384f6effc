use std::sync::Arc;

use anyhow::{Context, Result, bail};
use seatwatch::Scheduler;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::context::CommandContext;
use crate::server;

pub async fn execute(ctx: &CommandContext, no_server: bool) -> Result<()> {
	let settings = ctx.load_settings()?;
	if let Err(problems) = settings.validate() {
		for problem in &problems {
			error!(target = "seatwatch.cli", problem = %problem, "invalid settings");
		}
		bail!("settings have {} problem(s); run `seatwatch config check`", problems.len());
	}
	if settings.matches.is_empty() && no_server {
		bail!("no matches configured and the control plane is disabled; nothing to do");
	}
	if settings.credentials.email.is_empty() {
		warn!(target = "seatwatch.cli", "no login email configured; purchases will fail at login");
	}

	let scheduler = Arc::new(Scheduler::new(settings.pipeline()?, settings.poll_interval()));
	for config in &settings.matches {
		let task_id = scheduler.start(config, None)?;
		info!(target = "seatwatch.cli", task_id = %task_id, match_name = %config.name, "monitoring");
	}

	let (stop_server, server_stopped) = oneshot::channel::<()>();
	let server = if no_server {
		None
	} else {
		let addr = (settings.server.host.as_str(), settings.server.port);
		let listener = TcpListener::bind(addr)
			.await
			.with_context(|| format!("failed to bind {}:{}", settings.server.host, settings.server.port))?;
		let shutdown = async move {
			let _ = server_stopped.await;
		};
		Some(tokio::spawn(server::serve(listener, Arc::clone(&scheduler), shutdown)))
	};

	tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
	info!(target = "seatwatch.cli", "interrupt received; waiting for in-flight ticks");

	let _ = stop_server.send(());
	scheduler.shutdown().await;
	if let Some(server) = server {
		server.await.context("control plane task panicked")??;
	}
	info!(target = "seatwatch.cli", "stopped");
	Ok(())
}
