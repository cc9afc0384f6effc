use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use seatwatch::Settings;
use seatwatch::protocol::{MatchConfig, SectionPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::OutputFormat;
use crate::context::CommandContext;
use crate::output;

pub fn init(ctx: &CommandContext, path: Option<PathBuf>, force: bool) -> Result<()> {
	let path = path
		.or_else(|| ctx.resolved_config_path())
		.ok_or_else(|| anyhow!("no config directory on this platform; pass --path"))?;
	if path.exists() && !force {
		bail!("{} already exists (use --force to overwrite)", path.display());
	}

	let settings = Settings {
		matches: vec![example_match()],
		..Settings::default()
	};
	settings.save(&path).with_context(|| format!("failed to write {}", path.display()))?;
	info!(target = "seatwatch.cli", path = %path.display(), "settings file written");

	match ctx.format {
		OutputFormat::Json => output::print_json(&serde_json::json!({ "path": path })),
		OutputFormat::Text => {
			println!("Wrote {}", path.display().to_string().bold());
			println!("Fill in credentials and payer details, then run `seatwatch config check`.");
			Ok(())
		}
	}
}

fn example_match() -> MatchConfig {
	MatchConfig {
		name: "Example derby".into(),
		url: None,
		search_term: Some("al nassr vs al hilal".into()),
		quantity: 2,
		ticket_category: Some("gold".into()),
		team: None,
		preferred_seats: Some(SectionPolicy {
			section: "North".into(),
			quantity: None,
			adjacent: true,
		}),
		alternative: None,
		interval_secs: None,
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
	path: Option<PathBuf>,
	valid: bool,
	problems: Vec<String>,
	matches: Vec<String>,
	base_url: String,
	credentials_set: bool,
	browser_enabled: bool,
}

pub fn check(ctx: &CommandContext) -> Result<()> {
	let settings = ctx.load_settings()?;
	let problems = settings.validate().err().unwrap_or_default();
	let report = CheckReport {
		path: ctx.resolved_config_path(),
		valid: problems.is_empty(),
		problems,
		matches: settings.matches.iter().map(|m| m.name.clone()).collect(),
		base_url: settings.site.base_url.clone(),
		credentials_set: !settings.credentials.email.is_empty() && !settings.credentials.password.is_empty(),
		browser_enabled: settings.browser.enabled,
	};

	match ctx.format {
		OutputFormat::Json => output::print_json(&report)?,
		OutputFormat::Text => print_check(&report),
	}
	if !report.valid {
		bail!("settings have {} problem(s)", report.problems.len());
	}
	Ok(())
}

fn print_check(report: &CheckReport) {
	if let Some(path) = &report.path {
		println!("settings: {}", path.display());
	}
	println!("site:     {}", report.base_url);
	println!("login:    {}", if report.credentials_set { "configured".green() } else { "missing".yellow() });
	println!("browser:  {}", if report.browser_enabled { "enabled" } else { "disabled" });
	println!("matches:  {}", report.matches.len());
	for name in &report.matches {
		println!("  - {name}");
	}
	if report.valid {
		println!("{}", "OK".green().bold());
	} else {
		for problem in &report.problems {
			println!("{} {}", "error:".red().bold(), problem);
		}
	}
}
