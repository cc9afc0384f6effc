use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn seatwatch_bin() -> PathBuf {
	let mut path = std::env::current_exe().unwrap();
	path.pop();
	path.pop();
	path.push("seatwatch");
	path
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
	Command::new(seatwatch_bin())
		.current_dir(dir.path())
		.env("RUST_LOG", "off")
		.env_remove("WEBSITE_URL")
		.env_remove("CHECK_INTERVAL")
		.args(args)
		.output()
		.expect("failed to run seatwatch")
}

#[test]
fn config_init_writes_a_valid_settings_file() {
	let dir = TempDir::new().unwrap();
	let output = run(&dir, &["config", "init", "--path", "seatwatch.json"]);
	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

	let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("seatwatch.json")).unwrap()).unwrap();
	assert_eq!(written["schema"], 1);
	assert_eq!(written["pollIntervalSecs"], 30);
	assert_eq!(written["matches"][0]["searchTerm"], "al nassr vs al hilal");

	let check = run(&dir, &["--config", "seatwatch.json", "config", "check", "-f", "json"]);
	assert!(check.status.success(), "stdout: {}", String::from_utf8_lossy(&check.stdout));
	let report: serde_json::Value = serde_json::from_slice(&check.stdout).unwrap();
	assert_eq!(report["valid"], true);
	assert_eq!(report["matches"][0], "Example derby");
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("seatwatch.json"), "{}").unwrap();

	let refused = run(&dir, &["config", "init", "--path", "seatwatch.json"]);
	assert!(!refused.status.success());
	assert_eq!(std::fs::read_to_string(dir.path().join("seatwatch.json")).unwrap(), "{}");

	let forced = run(&dir, &["config", "init", "--path", "seatwatch.json", "--force"]);
	assert!(forced.status.success());
	assert!(std::fs::read_to_string(dir.path().join("seatwatch.json")).unwrap().contains("matches"));
}

#[test]
fn config_check_reports_problems_and_fails() {
	let dir = TempDir::new().unwrap();
	std::fs::write(
		dir.path().join("bad.json"),
		r#"{"pollIntervalSecs":0,"matches":[{"name":"Nowhere"}]}"#,
	)
	.unwrap();

	let output = run(&dir, &["--config", "bad.json", "config", "check", "--format", "json"]);
	assert!(!output.status.success());
	let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
	assert_eq!(report["valid"], false);
	let problems = report["problems"].as_array().unwrap();
	assert!(problems.iter().any(|p| p.as_str().unwrap().contains("pollIntervalSecs")));
	assert!(problems.iter().any(|p| p.as_str().unwrap().starts_with("matches[0]")));
}

#[test]
fn missing_explicit_config_is_an_error() {
	let dir = TempDir::new().unwrap();
	let output = run(&dir, &["--config", "absent.json", "config", "check"]);
	assert!(!output.status.success());
}
