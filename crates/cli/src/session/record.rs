use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
	pub command: String,
	#[serde(deserialize_with = "local_timestamp")]
	pub timestamp: DateTime<Local>,
}

/// Free-form model metadata with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
	#[serde(flatten)]
	pub info: Map<String, Value>,
	#[serde(deserialize_with = "local_timestamp")]
	pub timestamp: DateTime<Local>,
}

/// Bookkeeping for one control episode.
///
/// History (`models`, `commands`) outlives `active`; only a fresh
/// [`super::SessionTracker::start`] makes the record live again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
	pub active: bool,
	pub start_time: Option<DateTime<Local>>,
	pub port: Option<u16>,
	pub models: Vec<ModelEntry>,
	pub commands: Vec<CommandEntry>,
	pub session_file: Option<String>,
	pub last_activity: Option<DateTime<Local>>,
	pub metadata: Map<String, Value>,
}

/// `get_session_status` payload; durations are computed only while active.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
	pub active: bool,
	pub start_time: Option<DateTime<Local>>,
	pub duration_seconds: Option<f64>,
	pub port: Option<u16>,
	pub model_count: usize,
	pub command_count: usize,
	pub session_file: Option<String>,
	pub last_activity: Option<DateTime<Local>>,
	pub idle_seconds: Option<f64>,
	pub metadata: Map<String, Value>,
}

/// On-disk export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
	pub active: bool,
	pub start_time: Option<DateTime<Local>>,
	pub models: Vec<ModelEntry>,
	pub commands: Vec<CommandEntry>,
	pub session_file: Option<String>,
	pub metadata: Map<String, Value>,
	pub export_time: DateTime<Local>,
}

/// The subset of an export that is ever restored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionHistory {
	#[serde(deserialize_with = "readable_entries")]
	pub models: Vec<ModelEntry>,
	#[serde(deserialize_with = "readable_entries")]
	pub commands: Vec<CommandEntry>,
	pub session_file: Option<String>,
	pub metadata: Map<String, Value>,
}

pub(crate) fn seconds_between(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
	(to - from).num_milliseconds() as f64 / 1000.0
}

/// RFC 3339, or an ISO 8601 timestamp without offset read as local time.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
	if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
		return Some(at.with_timezone(&Local));
	}
	let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
	Local.from_local_datetime(&naive).earliest()
}

fn local_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Local>, D::Error> {
	let raw = String::deserialize(deserializer)?;
	parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Entries that fail to parse are skipped; `null` reads as empty.
fn readable_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
	Ok(raw
		.into_iter()
		.filter_map(|entry| match serde_json::from_value(entry) {
			Ok(entry) => Some(entry),
			Err(err) => {
				tracing::warn!(target = "chimerax.session", error = %err, "skipping unreadable history entry");
				None
			}
		})
		.collect())
}
