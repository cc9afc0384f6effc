use clap::Parser;
use seatwatch_cli::cli::Cli;
use seatwatch_cli::context::CommandContext;
use seatwatch_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let ctx = CommandContext::new(cli.config, cli.format);
	if let Err(err) = commands::dispatch(cli.command, &ctx).await {
		error!(target = "seatwatch.cli", error = %err, "command failed");
		std::process::exit(1);
	}
}
