use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON output
	Json,
}

#[derive(Parser, Debug)]
#[command(name = "seatwatch")]
#[command(about = "Watch events for ticket availability and buy when tickets appear")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Settings file (defaults to ~/.config/seatwatch/config.json)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Monitor every configured match and serve the control plane until ctrl-c
	Run {
		/// Do not start the HTTP control plane
		#[arg(long)]
		no_server: bool,
	},

	/// Check availability of one event page once
	Probe {
		url: String,
		/// Skip the rendered-browser strategy
		#[arg(long)]
		no_browser: bool,
	},

	/// Search the site for events
	Search { term: String },

	/// Settings file management
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Write a settings file with defaults and one example match
	Init {
		/// Target path (defaults to the --config path or the default location)
		#[arg(long, value_name = "FILE")]
		path: Option<PathBuf>,
		/// Overwrite an existing file
		#[arg(long)]
		force: bool,
	},

	/// Load and validate the settings, printing them with secrets redacted
	Check,
}
