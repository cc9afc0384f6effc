mod config;
mod probe;
mod run;
mod search;

use anyhow::Result;

use crate::cli::{Commands, ConfigAction};
use crate::context::CommandContext;

pub async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<()> {
	match command {
		Commands::Run { no_server } => run::execute(ctx, no_server).await,
		Commands::Probe { url, no_browser } => probe::execute(ctx, &url, no_browser).await,
		Commands::Search { term } => search::execute(ctx, &term).await,
		Commands::Config { action } => match action {
			ConfigAction::Init { path, force } => config::init(ctx, path, force),
			ConfigAction::Check => config::check(ctx),
		},
	}
}
