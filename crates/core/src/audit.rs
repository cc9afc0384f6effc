//! Operator-visible record of checkout outcomes that may have moved money.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
	pub task_id: String,
	#[serde(rename = "match")]
	pub match_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	pub url: String,
	/// Page text that was read as (or checked for) confirmation.
	pub snippet: String,
	pub confirmed: bool,
	pub at: u64,
}

/// Logs every record at `seatwatch.audit` and optionally appends it as JSONL.
#[derive(Debug, Default)]
pub struct AuditLog {
	path: Option<PathBuf>,
	lock: Mutex<()>,
}

impl AuditLog {
	pub fn new(path: Option<PathBuf>) -> Self {
		Self {
			path,
			lock: Mutex::new(()),
		}
	}

	/// Log-only sink.
	pub fn disabled() -> Self {
		Self::default()
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Records one outcome. File errors are logged, never propagated.
	pub fn record(&self, record: &AuditRecord) {
		info!(
			target = "seatwatch.audit",
			task_id = %record.task_id,
			match_name = %record.match_name,
			order_id = ?record.order_id,
			confirmed = record.confirmed,
			url = %record.url,
			snippet = %record.snippet,
			"checkout outcome"
		);
		if let Err(e) = self.append(record) {
			warn!(target = "seatwatch.audit", error = %e, "failed to append audit record");
		}
	}

	fn append(&self, record: &AuditRecord) -> Result<()> {
		let Some(path) = &self.path else {
			return Ok(());
		};
		let _guard = self.lock.lock();
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		}
		let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
		let mut line = serde_json::to_string(record)?;
		line.push('\n');
		file.write_all(line.as_bytes())?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(confirmed: bool) -> AuditRecord {
		AuditRecord {
			task_id: "task-1".into(),
			match_name: "Derby".into(),
			order_id: confirmed.then(|| "WB-1".to_string()),
			url: "https://webook.com/en/checkout/1".into(),
			snippet: "Thank you".into(),
			confirmed,
			at: 5,
		}
	}

	#[test]
	fn appends_one_json_line_per_record() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("audit").join("purchases.jsonl");
		let log = AuditLog::new(Some(path.clone()));
		log.record(&record(true));
		log.record(&record(false));

		let contents = std::fs::read_to_string(&path).unwrap();
		let lines: Vec<AuditRecord> = contents.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
		assert_eq!(lines, vec![record(true), record(false)]);
		assert!(contents.contains(r#""match":"Derby""#));
	}

	#[test]
	fn disabled_log_writes_nothing() {
		let log = AuditLog::disabled();
		log.record(&record(true));
		assert!(log.path().is_none());
	}
}
