use std::path::PathBuf;

use chrono::Local;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use super::record::{CommandEntry, ModelEntry, SessionExport, SessionInfo, SessionRecord, seconds_between};
use super::repository::SessionRepository;
use crate::error::Result;

/// Thread-safe owner of the single [`SessionRecord`].
#[derive(Debug, Default)]
pub struct SessionTracker {
	record: Mutex<SessionRecord>,
	repository: SessionRepository,
}

impl SessionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_repository(repository: SessionRepository) -> Self {
		Self {
			record: Mutex::new(SessionRecord::default()),
			repository,
		}
	}

	pub fn repository(&self) -> &SessionRepository {
		&self.repository
	}

	/// Marks the session live. Calling it again restarts the clock.
	pub fn start(&self, port: u16) {
		let now = Local::now();
		let mut record = self.record.lock();
		record.active = true;
		record.start_time = Some(now);
		record.port = Some(port);
		record.last_activity = Some(now);
		record.metadata = platform_metadata(now.to_rfc3339());
		tracing::info!(target = "chimerax.session", port, started = %now.to_rfc3339(), "session started");
	}

	pub fn stop(&self) {
		let mut record = self.record.lock();
		if !record.active {
			return;
		}
		let end = Local::now();
		if let Some(start) = record.start_time {
			let duration = seconds_between(start, end);
			record.metadata.insert("duration_seconds".into(), json!(duration));
			tracing::info!(target = "chimerax.session", duration_seconds = duration, "session stopped");
		}
		record.metadata.insert("end_time".into(), json!(end.to_rfc3339()));
		record.active = false;
		record.start_time = None;
		record.port = None;
	}

	pub fn is_active(&self) -> bool {
		self.record.lock().active
	}

	/// Appends to the history while active; returns whether it was recorded.
	pub fn record_command(&self, command: &str) -> bool {
		let mut record = self.record.lock();
		if !record.active {
			tracing::debug!(target = "chimerax.session", %command, "command executed but no active session to record it");
			return false;
		}
		let now = Local::now();
		record.last_activity = Some(now);
		record.commands.push(CommandEntry {
			command: command.to_string(),
			timestamp: now,
		});
		true
	}

	pub fn add_model(&self, info: Map<String, Value>) -> bool {
		let mut record = self.record.lock();
		if !record.active {
			tracing::debug!(target = "chimerax.session", "cannot add model without an active session");
			return false;
		}
		let now = Local::now();
		record.last_activity = Some(now);
		record.models.push(ModelEntry { info, timestamp: now });
		true
	}

	pub fn snapshot(&self) -> SessionInfo {
		let record = self.record.lock();
		let now = Local::now();
		let live = |at: Option<chrono::DateTime<Local>>| if record.active { at.map(|at| seconds_between(at, now)) } else { None };
		SessionInfo {
			active: record.active,
			start_time: record.start_time,
			duration_seconds: live(record.start_time),
			port: record.port,
			model_count: record.models.len(),
			command_count: record.commands.len(),
			session_file: record.session_file.clone(),
			last_activity: record.last_activity,
			idle_seconds: live(record.last_activity),
			metadata: record.metadata.clone(),
		}
	}

	/// The last `limit` commands, or all of them.
	pub fn command_history(&self, limit: Option<usize>) -> Vec<CommandEntry> {
		let record = self.record.lock();
		match limit {
			Some(limit) if limit > 0 => record.commands[record.commands.len().saturating_sub(limit)..].to_vec(),
			_ => record.commands.clone(),
		}
	}

	pub fn models(&self) -> Vec<ModelEntry> {
		self.record.lock().models.clone()
	}

	/// Clears command history; only allowed while active.
	pub fn clear_history(&self) -> bool {
		let mut record = self.record.lock();
		if !record.active {
			return false;
		}
		tracing::info!(target = "chimerax.session", cleared = record.commands.len(), "clearing command history");
		record.commands.clear();
		true
	}

	pub fn set_session_file(&self, path: impl Into<String>) {
		self.record.lock().session_file = Some(path.into());
	}

	pub fn record(&self) -> SessionRecord {
		self.record.lock().clone()
	}

	pub fn export(&self, filename: Option<&str>) -> Result<PathBuf> {
		let export = {
			let record = self.record.lock();
			SessionExport {
				active: record.active,
				start_time: record.start_time,
				models: record.models.clone(),
				commands: record.commands.clone(),
				session_file: record.session_file.clone(),
				metadata: record.metadata.clone(),
				export_time: Local::now(),
			}
		};
		self.repository.save(&export, filename)
	}

	/// Restores history only. `active`, `start_time` and `port` are left untouched.
	pub fn import(&self, filename: &str) -> Result<()> {
		let history = self.repository.load(filename)?;
		let mut record = self.record.lock();
		record.models = history.models;
		record.commands = history.commands;
		record.session_file = history.session_file;
		record.metadata = history.metadata;
		Ok(())
	}
}

fn platform_metadata(start_time: String) -> Map<String, Value> {
	let mut metadata = Map::new();
	metadata.insert("platform".into(), json!(chimerax_runtime::PlatformKind::detect().as_str()));
	metadata.insert("os".into(), json!(std::env::consts::OS));
	metadata.insert("arch".into(), json!(std::env::consts::ARCH));
	metadata.insert("bridge_version".into(), json!(env!("CARGO_PKG_VERSION")));
	metadata.insert("start_time".into(), json!(start_time));
	metadata
}
