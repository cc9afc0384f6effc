use anyhow::Result;

use crate::context::CommandContext;
use crate::output;

pub async fn execute(ctx: &CommandContext, term: &str) -> Result<()> {
	let settings = ctx.load_settings()?;
	let pipeline = settings.pipeline()?;
	let listings = pipeline.finder(pipeline.session()).find(term).await?;
	output::print_listings(ctx.format, term, &listings)
}
