//! Bridge configuration: defaults, optional JSON file, then CLI/env overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_PORT: u16 = 42184;
pub const CONFIG_DIR_NAME: &str = "chimerax-mcp";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
	pub port: u16,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chimerax_path: Option<String>,
	pub request_timeout_ms: u64,
	pub launch: LaunchSettings,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			port: DEFAULT_PORT,
			chimerax_path: None,
			request_timeout_ms: 30_000,
			launch: LaunchSettings::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchSettings {
	pub ready_timeout_ms: u64,
	pub poll_interval_ms: u64,
	/// Wait after the port opens before the first `version` probe.
	pub grace_period_ms: u64,
	/// Wait after an auto-start before sending the requested command.
	pub settle_ms: u64,
}

impl Default for LaunchSettings {
	fn default() -> Self {
		Self {
			ready_timeout_ms: 30_000,
			poll_interval_ms: 500,
			grace_period_ms: 5_000,
			settle_ms: 2_000,
		}
	}
}

/// Values given on the command line or through the environment; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
	pub port: Option<u16>,
	pub chimerax_path: Option<String>,
}

impl BridgeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// `<config_dir>/chimerax-mcp/config.json`, when a config directory exists on this host.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		Ok(serde_json::from_str(&raw)?)
	}

	/// An explicit path must exist; the default path is used only when present.
	pub fn load(explicit: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
		let mut config = match explicit {
			Some(path) => Self::from_file(path)?,
			None => match Self::default_path().filter(|path| path.is_file()) {
				Some(path) => {
					tracing::debug!(target = "chimerax.mcp", path = %path.display(), "loading config file");
					Self::from_file(&path)?
				}
				None => Self::default(),
			},
		};
		config.apply(overrides);
		Ok(config)
	}

	pub fn apply(&mut self, overrides: ConfigOverrides) {
		if let Some(port) = overrides.port {
			self.port = port;
		}
		if let Some(path) = overrides.chimerax_path.filter(|path| !path.trim().is_empty()) {
			self.chimerax_path = Some(path);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_chimerax_conventions() {
		let config = BridgeConfig::default();
		assert_eq!(config.port, 42184);
		assert_eq!(config.launch.ready_timeout_ms, 30_000);
		assert_eq!(config.launch.poll_interval_ms, 500);
		assert_eq!(config.launch.grace_period_ms, 5_000);
	}

	#[test]
	fn partial_file_keeps_defaults() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		std::fs::write(&path, r#"{ "port": 50000, "launch": { "settleMs": 0 } }"#).unwrap();

		let config = BridgeConfig::load(Some(&path), ConfigOverrides::default()).unwrap();
		assert_eq!(config.port, 50000);
		assert_eq!(config.launch.settle_ms, 0);
		assert_eq!(config.launch.ready_timeout_ms, 30_000);
		assert_eq!(config.request_timeout_ms, 30_000);
	}

	#[test]
	fn overrides_win_over_file() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("config.json");
		std::fs::write(&path, r#"{ "port": 50000, "chimeraxPath": "/from/file" }"#).unwrap();

		let config = BridgeConfig::load(
			Some(&path),
			ConfigOverrides {
				port: Some(51000),
				chimerax_path: Some("  ".into()),
			},
		)
		.unwrap();
		assert_eq!(config.port, 51000);
		assert_eq!(config.chimerax_path.as_deref(), Some("/from/file"));
	}

	#[test]
	fn missing_explicit_file_is_an_error() {
		let tmp = tempfile::TempDir::new().unwrap();
		assert!(BridgeConfig::load(Some(&tmp.path().join("absent.json")), ConfigOverrides::default()).is_err());
	}
}
