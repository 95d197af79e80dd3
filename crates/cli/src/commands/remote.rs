//! Sending commands to ChimeraX, with optional auto-start and log capture.

use std::path::Path;

use serde_json::{Value, json};

use super::grammar::path_argument;
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::launcher::{LaunchOutcome, launch};

/// A command result, with the log text produced while it ran when captured.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
	Plain(Value),
	Captured { result: Value, log: String },
}

impl CommandOutput {
	pub fn result(&self) -> &Value {
		match self {
			CommandOutput::Plain(result) | CommandOutput::Captured { result, .. } => result,
		}
	}

	pub fn log(&self) -> Option<&str> {
		match self {
			CommandOutput::Plain(_) => None,
			CommandOutput::Captured { log, .. } => Some(log),
		}
	}

	pub fn into_json(self) -> Value {
		match self {
			CommandOutput::Plain(result) => result,
			CommandOutput::Captured { result, log } => json!({ "result": result, "log": log }),
		}
	}
}

/// Display text of a command result: strings verbatim, `null` empty.
pub fn result_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
	pub auto_start: bool,
	pub capture_log: bool,
}

impl RunOptions {
	pub fn new(auto_start: bool, capture_log: bool) -> Self {
		Self { auto_start, capture_log }
	}
}

/// Succeeds once ChimeraX answers, launching it first when `auto_start` is set.
pub async fn ensure_running(ctx: &BridgeContext, auto_start: bool) -> Result<()> {
	if ctx.channel.is_target_alive().await {
		return Ok(());
	}
	if !auto_start {
		return Err(BridgeError::NotRunning);
	}

	tracing::info!(target = "chimerax.dispatch", "ChimeraX not running, auto-starting");
	match launch(ctx, None).await {
		LaunchOutcome::Failed(err) => return Err(err),
		outcome @ LaunchOutcome::ChannelNeverOpened { .. } => {
			return Err(BridgeError::LaunchTimeout(format!("Failed to auto-start ChimeraX: {}", outcome.message())));
		}
		outcome @ LaunchOutcome::Cancelled { .. } => return Err(BridgeError::LaunchFailed(outcome.message())),
		LaunchOutcome::AlreadyRunning { .. } | LaunchOutcome::Started { .. } | LaunchOutcome::Unresponsive { .. } => {}
	}

	tokio::select! {
		_ = ctx.cancel.cancelled() => return Err(BridgeError::LaunchFailed("Launch cancelled before ChimeraX became ready".into())),
		_ = tokio::time::sleep(ctx.launch.settle) => {}
	}

	if !ctx.channel.is_target_alive().await {
		return Err(BridgeError::LaunchFailed(
			"ChimeraX failed to start properly. Please start it manually with open_chimerax first.".into(),
		));
	}
	Ok(())
}

/// Records `command` in the session and sends it.
pub async fn run_chimerax_command(ctx: &BridgeContext, command: &str, options: RunOptions) -> Result<CommandOutput> {
	let command = command.trim();
	if command.is_empty() {
		return Err(BridgeError::invalid("Command must be a non-empty string"));
	}
	ensure_running(ctx, options.auto_start).await?;

	if options.capture_log {
		return run_with_log_capture(ctx, command).await;
	}
	let _shared = ctx.capture_lock.read().await;
	ctx.session.record_command(command);
	let result = ctx.channel.run_command(command).await?;
	Ok(CommandOutput::Plain(result))
}

/// Runs `command` with the ChimeraX log isolated to its own output.
///
/// The current log is saved and cleared, the command runs, the fresh log is
/// saved and read back, and the original log is reopened. The capture lock is
/// held exclusively throughout, so no other command lands in the captured
/// window. The restore step runs even when the command fails.
pub async fn run_with_log_capture(ctx: &BridgeContext, command: &str) -> Result<CommandOutput> {
	let _exclusive = ctx.capture_lock.write().await;
	let workdir = tempfile::Builder::new().prefix("chimerax-log").tempdir()?;
	let previous = workdir.path().join("prev.html");
	let captured = workdir.path().join("cmd.html");

	ctx.channel.run_command(&format!("log save {}", path_argument(&previous))).await?;
	ctx.channel.run_command("log clear").await?;

	ctx.session.record_command(command);
	let outcome = ctx.channel.run_command(command).await;

	let log = read_log(ctx, &captured).await;
	if let Err(err) = restore_log(ctx, &previous).await {
		tracing::warn!(target = "chimerax.dispatch", error = %err, "failed to restore ChimeraX log");
	}

	let result = outcome?;
	let log = log?;
	tracing::debug!(target = "chimerax.dispatch", %command, log_bytes = log.len(), "captured command log");
	Ok(CommandOutput::Captured { result, log })
}

async fn read_log(ctx: &BridgeContext, path: &Path) -> Result<String> {
	ctx.channel.run_command(&format!("log save {}", path_argument(path))).await?;
	Ok(tokio::fs::read_to_string(path).await?)
}

async fn restore_log(ctx: &BridgeContext, previous: &Path) -> Result<()> {
	ctx.channel.run_command("log clear").await?;
	if tokio::fs::try_exists(previous).await? {
		ctx.channel.run_command(&format!("log open {}", path_argument(previous))).await?;
	}
	Ok(())
}
