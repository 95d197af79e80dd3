//! Session export/import persistence.

use std::path::{Path, PathBuf};

use chrono::Local;

use super::record::{SessionExport, SessionHistory};
use crate::error::{BridgeError, Result};

/// Resolves export/import filenames and reads or writes the JSON document.
#[derive(Debug, Clone, Default)]
pub struct SessionRepository {
	base: Option<PathBuf>,
}

impl SessionRepository {
	/// Relative filenames resolve against `base`, or the working directory when `None`.
	pub fn new(base: Option<PathBuf>) -> Self {
		Self { base }
	}

	pub fn base(&self) -> Option<&Path> {
		self.base.as_deref()
	}

	pub fn resolve(&self, filename: &str) -> PathBuf {
		let path = Path::new(filename);
		match &self.base {
			Some(base) if path.is_relative() => base.join(path),
			_ => path.to_path_buf(),
		}
	}

	/// `chimerax_session_<YYYYmmdd_HHMMSS>.json`
	pub fn default_filename() -> String {
		format!("chimerax_session_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
	}

	pub fn save(&self, export: &SessionExport, filename: Option<&str>) -> Result<PathBuf> {
		let filename = match filename.map(str::trim).filter(|name| !name.is_empty()) {
			Some(name) => name.to_string(),
			None => Self::default_filename(),
		};
		let path = self.resolve(&filename);
		let json = serde_json::to_string_pretty(export)?;
		std::fs::write(&path, json)?;
		tracing::info!(target = "chimerax.session", path = %path.display(), "session exported");
		Ok(path)
	}

	pub fn load(&self, filename: &str) -> Result<SessionHistory> {
		let path = self.resolve(filename);
		let raw = match std::fs::read_to_string(&path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(BridgeError::FileNotFound(path)),
			Err(err) => return Err(err.into()),
		};
		let history = serde_json::from_str(&raw)?;
		tracing::info!(target = "chimerax.session", path = %path.display(), "session history loaded");
		Ok(history)
	}
}
