use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, ErrorKind};

/// The envelope returned for every dispatched operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
	pub ok: bool,
	pub operation: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ToolError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

impl ToolResult {
	pub fn data(&self) -> Option<&Value> {
		self.data.as_ref()
	}

	pub fn error_kind(&self) -> Option<ErrorKind> {
		self.error.as_ref().map(|error| error.code)
	}

	/// Payload as display text: strings verbatim, anything else pretty JSON.
	pub fn text(&self) -> String {
		match (&self.data, &self.error) {
			(_, Some(error)) => format!("Error [{}]: {}", error.code, error.message),
			(Some(Value::String(text)), None) => text.clone(),
			(Some(value), None) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
			(None, None) => String::new(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
	pub code: ErrorKind,
	pub message: String,
}

impl From<&BridgeError> for ToolError {
	fn from(err: &BridgeError) -> Self {
		Self {
			code: err.kind(),
			message: err.to_string(),
		}
	}
}
