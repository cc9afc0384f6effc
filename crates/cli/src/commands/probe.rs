use anyhow::{Result, bail};
use seatwatch::parse_event_url;
use tracing::{debug, info};

use crate::context::CommandContext;
use crate::output;

pub async fn execute(ctx: &CommandContext, url: &str, no_browser: bool) -> Result<()> {
	let Some(event) = parse_event_url(url) else {
		bail!("{url} does not look like an event page URL");
	};
	debug!(target = "seatwatch.cli", slug = %event.slug, event_id = %event.id, "probing event");

	let mut settings = ctx.load_settings()?;
	if no_browser {
		settings.browser.enabled = false;
	}
	let pipeline = settings.pipeline()?;
	let snapshot = pipeline.prober(pipeline.session()).probe(url).await;
	info!(target = "seatwatch.cli", available = snapshot.available, reason = %snapshot.reason, strategy = %snapshot.strategy, "probe finished");

	output::print_snapshot(ctx.format, url, &snapshot)
}
