//! Rendering values into ChimeraX command-line syntax.

use std::borrow::Cow;
use std::path::Path;

use serde_json::{Map, Value};

/// Quotes `text` when ChimeraX would otherwise split it.
///
/// Whitespace and `;` (the command separator) force quoting, as does the empty
/// string. Double quotes are used unless the text itself contains one.
pub fn quote_argument(text: &str) -> Cow<'_, str> {
	if text.is_empty() {
		return Cow::Borrowed("\"\"");
	}
	if !text.chars().any(|c| c.is_whitespace() || c == ';') {
		return Cow::Borrowed(text);
	}
	if text.contains('"') && !text.contains('\'') {
		Cow::Owned(format!("'{text}'"))
	} else {
		Cow::Owned(format!("\"{text}\""))
	}
}

/// `None` for `null`, which is dropped from the command line.
pub fn render_value(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) => Some(quote_argument(text).into_owned()),
		Value::Bool(flag) => Some(flag.to_string()),
		Value::Number(number) => Some(number.to_string()),
		Value::Array(items) => {
			let joined = items.iter().filter_map(bare_value).collect::<Vec<_>>().join(",");
			Some(quote_argument(&joined).into_owned())
		}
		Value::Object(_) => Some(quote_argument(&value.to_string()).into_owned()),
	}
}

fn bare_value(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) => Some(text.clone()),
		other => Some(other.to_string()),
	}
}

/// `name pos1 pos2 key1 value1 ...`, named pairs in insertion order.
pub fn serialize_remote_command(name: &str, positional: &[Value], named: &Map<String, Value>) -> String {
	let mut parts = vec![name.to_string()];
	parts.extend(positional.iter().filter_map(render_value));
	for (key, value) in named {
		if let Some(rendered) = render_value(value) {
			parts.push(key.clone());
			parts.push(rendered);
		}
	}
	parts.join(" ")
}

/// File argument with forward slashes, which ChimeraX accepts on every platform.
pub fn path_argument(path: &Path) -> String {
	let normalized = path.to_string_lossy().replace('\\', "/");
	quote_argument(&normalized).into_owned()
}
