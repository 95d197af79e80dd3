use std::io::{self, Write};
use std::time::Instant;

use colored::Colorize;
use serde_json::Value;

use crate::error::{BridgeError, ErrorKind};
use crate::output::format::OutputFormat;
use crate::output::model::{ToolError, ToolResult};

/// Builder for [`ToolResult`] envelopes; duration is measured from [`ResultBuilder::new`].
pub struct ResultBuilder {
	operation: String,
	data: Option<Value>,
	error: Option<ToolError>,
	start_time: Instant,
	duration_ms: Option<u64>,
}

impl ResultBuilder {
	pub fn new(operation: impl Into<String>) -> Self {
		Self {
			operation: operation.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
			duration_ms: None,
		}
	}

	pub fn data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorKind, message: impl Into<String>) -> Self {
		self.error = Some(ToolError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn failure(mut self, err: &BridgeError) -> Self {
		self.error = Some(ToolError::from(err));
		self
	}

	pub fn duration_ms(mut self, duration_ms: u64) -> Self {
		self.duration_ms = Some(duration_ms);
		self
	}

	pub fn build(self) -> ToolResult {
		let ok = self.error.is_none();
		let duration_ms = self.duration_ms.unwrap_or_else(|| self.start_time.elapsed().as_millis() as u64);

		ToolResult {
			ok,
			operation: self.operation,
			data: if ok { self.data.or(Some(Value::Null)) } else { None },
			error: self.error,
			duration_ms: Some(duration_ms),
		}
	}
}

/// Print a result to stdout in the specified format.
pub fn print_result(result: &ToolResult, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text(result: &ToolResult) {
	let mut stdout = io::stdout().lock();
	match &result.error {
		Some(error) => {
			let _ = writeln!(stdout, "{} {}", format!("Error [{}]:", error.code).red().bold(), error.message);
		}
		None => {
			let _ = writeln!(stdout, "{}", result.text());
		}
	}
}

/// Print an error to stderr in human-readable format.
pub fn print_error_stderr(error: &ToolError) {
	eprintln!("{} {}", format!("Error [{}]:", error.code).red().bold(), error.message);
}
