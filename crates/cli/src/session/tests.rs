use serde_json::{Map, Value, json};
use tempfile::TempDir;

use super::record::parse_timestamp;
use super::*;
use crate::error::ErrorKind;

fn tracker_in(dir: &TempDir) -> SessionTracker {
	SessionTracker::with_repository(SessionRepository::new(Some(dir.path().to_path_buf())))
}

fn model(pdb: &str) -> Map<String, Value> {
	let mut info = Map::new();
	info.insert("pdb_id".into(), json!(pdb));
	info
}

#[test]
fn history_survives_stop() {
	let tracker = SessionTracker::new();
	tracker.start(42184);
	assert!(tracker.record_command("a"));
	tracker.stop();

	let record = tracker.record();
	assert!(!record.active);
	assert_eq!(record.start_time, None);
	assert_eq!(record.port, None);
	assert_eq!(record.commands.len(), 1);
	assert_eq!(record.commands[0].command, "a");
	assert!(record.metadata.contains_key("duration_seconds"));
	assert!(record.metadata.contains_key("end_time"));
}

#[test]
fn inactive_tracker_drops_records() {
	let tracker = SessionTracker::new();
	assert!(!tracker.record_command("open 1abc"));
	assert!(!tracker.add_model(model("1abc")));
	assert!(tracker.command_history(None).is_empty());
	assert!(tracker.models().is_empty());
}

#[test]
fn stop_is_noop_when_inactive() {
	let tracker = SessionTracker::new();
	tracker.stop();
	assert!(tracker.record().metadata.is_empty());
}

#[test]
fn restart_resets_clock() {
	let tracker = SessionTracker::new();
	tracker.start(1);
	let first = tracker.record().start_time.unwrap();
	std::thread::sleep(std::time::Duration::from_millis(5));
	tracker.start(2);
	let record = tracker.record();
	assert!(record.start_time.unwrap() > first);
	assert_eq!(record.port, Some(2));
}

#[test]
fn snapshot_durations_only_while_active() {
	let tracker = SessionTracker::new();
	tracker.start(42184);
	tracker.record_command("version");
	let live = tracker.snapshot();
	assert!(live.active);
	assert!(live.duration_seconds.is_some());
	assert!(live.idle_seconds.is_some());
	assert_eq!(live.command_count, 1);

	tracker.stop();
	let stopped = tracker.snapshot();
	assert_eq!(stopped.duration_seconds, None);
	assert_eq!(stopped.idle_seconds, None);
	assert_eq!(stopped.command_count, 1);
}

#[test]
fn command_history_limit_keeps_latest() {
	let tracker = SessionTracker::new();
	tracker.start(42184);
	for cmd in ["a", "b", "c"] {
		tracker.record_command(cmd);
	}
	let last_two: Vec<_> = tracker.command_history(Some(2)).into_iter().map(|entry| entry.command).collect();
	assert_eq!(last_two, ["b", "c"]);
	assert_eq!(tracker.command_history(Some(10)).len(), 3);
	assert_eq!(tracker.command_history(Some(0)).len(), 3);
}

#[test]
fn clear_history_requires_active_session() {
	let tracker = SessionTracker::new();
	tracker.start(42184);
	tracker.record_command("a");
	tracker.stop();
	assert!(!tracker.clear_history());
	assert_eq!(tracker.command_history(None).len(), 1);

	tracker.start(42184);
	assert!(tracker.clear_history());
	assert!(tracker.command_history(None).is_empty());
}

#[test]
fn export_then_import_never_resurrects_liveness() {
	let dir = TempDir::new().unwrap();
	let source = tracker_in(&dir);
	source.start(42184);
	source.record_command("open 1abc");
	source.add_model(model("1abc"));
	source.set_session_file("work.cxs");
	let path = source.export(Some("exported.json")).unwrap();
	assert_eq!(path, dir.path().join("exported.json"));

	let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
	assert_eq!(raw["active"], true);
	assert!(raw["export_time"].is_string());
	assert_eq!(raw["models"][0]["pdb_id"], "1abc");

	let fresh = tracker_in(&dir);
	fresh.import("exported.json").unwrap();
	let record = fresh.record();
	assert!(!record.active);
	assert_eq!(record.start_time, None);
	assert_eq!(record.port, None);
	assert_eq!(record.commands[0].command, "open 1abc");
	assert_eq!(record.models[0].info["pdb_id"], "1abc");
	assert_eq!(record.session_file.as_deref(), Some("work.cxs"));
}

#[test]
fn export_without_name_uses_timestamped_file() {
	let dir = TempDir::new().unwrap();
	let tracker = tracker_in(&dir);
	let path = tracker.export(None).unwrap();
	let name = path.file_name().unwrap().to_string_lossy().into_owned();
	assert!(name.starts_with("chimerax_session_"), "{name}");
	assert!(name.ends_with(".json"));
	assert!(path.exists());
}

#[test]
fn import_missing_file_is_not_found() {
	let dir = TempDir::new().unwrap();
	let err = tracker_in(&dir).import("nope.json").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn import_tolerates_missing_sections() {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("partial.json"), r#"{ "active": true, "port": 1 }"#).unwrap();
	let tracker = tracker_in(&dir);
	tracker.import("partial.json").unwrap();
	assert!(!tracker.is_active());
	assert!(tracker.command_history(None).is_empty());
}

#[test]
fn import_accepts_offsetless_timestamps() {
	let dir = TempDir::new().unwrap();
	let document = json!({
		"active": true,
		"start_time": "2024-05-01T10:00:00.000001",
		"models": [
			{ "pdb_id": "1abc", "format": null, "source": "fetch", "timestamp": "2024-05-01T10:00:03.250000" }
		],
		"commands": [
			{ "command": "open 1abc", "timestamp": "2024-05-01T10:00:05.000001" },
			{ "command": "view", "timestamp": "2024-05-01T10:00:06" },
			{ "command": "color red", "timestamp": "2024-05-01T10:00:07+02:00" },
			{ "command": "garbled", "timestamp": "yesterday" }
		],
		"session_file": null,
		"metadata": { "platform": "linux", "start_time": "2024-05-01T10:00:00.000001" },
		"export_time": "2024-05-01T10:05:00.123456"
	});
	std::fs::write(dir.path().join("earlier.json"), serde_json::to_string_pretty(&document).unwrap()).unwrap();

	let tracker = tracker_in(&dir);
	tracker.import("earlier.json").unwrap();
	let commands: Vec<String> = tracker.command_history(None).into_iter().map(|entry| entry.command).collect();
	assert_eq!(commands, ["open 1abc", "view", "color red"]);
	assert_eq!(tracker.models()[0].info["pdb_id"], "1abc");
	assert!(!tracker.is_active());

	let first = tracker.command_history(None)[0].timestamp.naive_local();
	assert_eq!(first.to_string(), "2024-05-01 10:00:05.000001");
}

#[test]
fn timestamp_forms() {
	assert!(parse_timestamp("2024-05-01T10:00:05.000001").is_some());
	assert!(parse_timestamp("2024-05-01T10:00:05").is_some());
	assert!(parse_timestamp("2024-05-01T10:00:05Z").is_some());
	assert!(parse_timestamp("2024-05-01").is_none());
}
