use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Dependencies stay at `warn`; `seatwatch*` targets and module paths follow `-v`.
fn default_directives(verbosity: u8) -> String {
	let level = match verbosity {
		0 | 1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let deps = if verbosity >= 3 { "debug" } else { "warn" };
	format!("{deps},seatwatch={level}")
}
