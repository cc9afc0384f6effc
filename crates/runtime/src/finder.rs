//! Browser executable discovery.

use std::path::{Path, PathBuf};

/// Environment variable that overrides executable discovery.
pub const CHROME_PATH_ENV: &str = "SEATWATCH_CHROME";

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
	"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
	"/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(windows)]
const INSTALL_PATHS: &[&str] = &[
	r"C:\Program Files\Google\Chrome\Application\chrome.exe",
	r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
	r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", windows)))]
const INSTALL_PATHS: &[&str] = &["/usr/bin/chromium", "/usr/bin/google-chrome", "/snap/bin/chromium"];

/// Names looked up on `PATH`, in preference order.
const COMMANDS: &[&str] = &["google-chrome-stable", "google-chrome", "chromium", "chromium-browser", "chrome", "msedge"];

/// Resolves a Chromium-family executable: `explicit`, then `SEATWATCH_CHROME`,
/// then `PATH`, then well-known install locations.
pub fn find_chromium_executable(explicit: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = explicit {
		return path.exists().then(|| path.to_path_buf());
	}
	let from_env = std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from);
	from_env
		.filter(|path| path.exists())
		.or_else(|| COMMANDS.iter().find_map(|name| which::which(name).ok()))
		.or_else(|| INSTALL_PATHS.iter().map(PathBuf::from).find(|path| path.exists()))
}
