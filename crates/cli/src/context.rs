use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use seatwatch::Settings;
use seatwatch::settings::default_settings_path;

use crate::cli::OutputFormat;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
	config: Option<PathBuf>,
	pub format: OutputFormat,
}

impl CommandContext {
	pub fn new(config: Option<PathBuf>, format: OutputFormat) -> Self {
		Self { config, format }
	}

	pub fn config_path(&self) -> Option<&Path> {
		self.config.as_deref()
	}

	/// The explicit `--config` path, else the platform default.
	pub fn resolved_config_path(&self) -> Option<PathBuf> {
		self.config.clone().or_else(default_settings_path)
	}

	/// Settings file plus environment overrides.
	pub fn load_settings(&self) -> Result<Settings> {
		Settings::load_with_env(self.config_path()).context("failed to load settings")
	}
}
