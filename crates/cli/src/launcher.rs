//! Starts ChimeraX detached with remote control enabled and waits for it to answer.

use std::path::PathBuf;
use std::time::Duration;

use chimerax_runtime::{LaunchArgs, ReadyState, SpawnMethod, WaitOptions};
use serde_json::{Value, json};

use crate::config::LaunchSettings;
use crate::context::BridgeContext;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
	pub ready_timeout: Duration,
	pub poll_interval: Duration,
	pub grace_period: Duration,
	pub settle: Duration,
}

impl LaunchConfig {
	pub fn wait_options(&self) -> WaitOptions {
		WaitOptions {
			timeout: self.ready_timeout,
			interval: self.poll_interval,
		}
	}
}

impl Default for LaunchConfig {
	fn default() -> Self {
		Self::from(&LaunchSettings::default())
	}
}

impl From<&LaunchSettings> for LaunchConfig {
	fn from(settings: &LaunchSettings) -> Self {
		Self {
			ready_timeout: Duration::from_millis(settings.ready_timeout_ms),
			poll_interval: Duration::from_millis(settings.poll_interval_ms),
			grace_period: Duration::from_millis(settings.grace_period_ms),
			settle: Duration::from_millis(settings.settle_ms),
		}
	}
}

/// Every way a launch can end. None of them is raised.
#[derive(Debug)]
pub enum LaunchOutcome {
	AlreadyRunning { port: u16 },
	Started { port: u16, executable: PathBuf, method: SpawnMethod, version: Value },
	/// Port opened but the `version` probe failed.
	Unresponsive { port: u16, executable: PathBuf, error: String },
	ChannelNeverOpened { port: u16, executable: PathBuf },
	Cancelled { port: u16 },
	Failed(BridgeError),
}

impl LaunchOutcome {
	pub fn is_running(&self) -> bool {
		matches!(self, LaunchOutcome::AlreadyRunning { .. } | LaunchOutcome::Started { .. })
	}

	pub fn status(&self) -> &'static str {
		match self {
			LaunchOutcome::AlreadyRunning { .. } => "already_running",
			LaunchOutcome::Started { .. } => "started",
			LaunchOutcome::Unresponsive { .. } => "unresponsive",
			LaunchOutcome::ChannelNeverOpened { .. } => "channel_never_opened",
			LaunchOutcome::Cancelled { .. } => "cancelled",
			LaunchOutcome::Failed(_) => "failed",
		}
	}

	pub fn message(&self) -> String {
		match self {
			LaunchOutcome::AlreadyRunning { .. } => "ChimeraX is already running with remote control enabled".to_string(),
			LaunchOutcome::Started { .. } => "ChimeraX started with remote control enabled".to_string(),
			LaunchOutcome::Unresponsive { error, .. } => {
				format!("ChimeraX started, but not yet responsive. Wait a few seconds before sending commands. Error: {error}")
			}
			LaunchOutcome::ChannelNeverOpened { port, .. } => {
				format!("ChimeraX started, but the XML-RPC server on port {port} is not responding. Try again or start ChimeraX manually.")
			}
			LaunchOutcome::Cancelled { .. } => "Launch cancelled before ChimeraX became ready".to_string(),
			LaunchOutcome::Failed(err) => format!("Error starting ChimeraX: {err}"),
		}
	}

	pub fn into_json(self) -> Value {
		let status = self.status();
		let message = self.message();
		let running = self.is_running();
		match self {
			LaunchOutcome::AlreadyRunning { port } | LaunchOutcome::Cancelled { port } => json!({
				"status": status,
				"message": message,
				"running": running,
				"port": port,
			}),
			LaunchOutcome::Started {
				port,
				executable,
				method,
				version,
			} => json!({
				"status": status,
				"message": message,
				"running": running,
				"port": port,
				"executable": executable,
				"spawnMethod": method,
				"version": version,
			}),
			LaunchOutcome::Unresponsive { port, executable, error } => json!({
				"status": status,
				"message": message,
				"running": running,
				"port": port,
				"executable": executable,
				"error": error,
			}),
			LaunchOutcome::ChannelNeverOpened { port, executable } => json!({
				"status": status,
				"message": message,
				"running": running,
				"port": port,
				"executable": executable,
			}),
			LaunchOutcome::Failed(err) => json!({
				"status": status,
				"message": message,
				"running": running,
				"error": { "code": err.kind(), "message": err.to_string() },
			}),
		}
	}
}

/// Launches ChimeraX unless it already answers on the channel.
pub async fn launch(ctx: &BridgeContext, port: Option<u16>) -> LaunchOutcome {
	if ctx.channel.is_target_alive().await {
		let port = ctx.channel.port();
		if !ctx.session.is_active() {
			ctx.session.start(port);
		}
		tracing::info!(target = "chimerax.launcher", port, "ChimeraX already running");
		return LaunchOutcome::AlreadyRunning { port };
	}

	if let Some(port) = port {
		if port != ctx.channel.port() {
			tracing::info!(target = "chimerax.launcher", port, "custom port requested");
			ctx.channel.build_client(Some(port));
		}
	}
	let port = ctx.channel.port();

	let executable = match ctx.locator.resolve() {
		Ok(path) => path,
		Err(err) => {
			tracing::error!(target = "chimerax.launcher", error = %err, "cannot launch without an executable");
			return LaunchOutcome::Failed(err.into());
		}
	};

	let report = match ctx.platform().spawn(&executable, &LaunchArgs::remote_control(port)) {
		Ok(report) => report,
		Err(err) => {
			tracing::error!(target = "chimerax.launcher", executable = %executable.display(), error = %err, "spawn failed");
			return LaunchOutcome::Failed(err.into());
		}
	};
	tracing::info!(target = "chimerax.launcher", program = %report.program, method = ?report.method, port, "ChimeraX spawned, waiting for XML-RPC");

	match ctx.channel.wait_until_ready(Some(port), ctx.launch.wait_options(), &ctx.cancel).await {
		ReadyState::Ready => {}
		ReadyState::TimedOut => {
			tracing::error!(target = "chimerax.launcher", port, "port never became available");
			return LaunchOutcome::ChannelNeverOpened { port, executable };
		}
		ReadyState::Cancelled => return LaunchOutcome::Cancelled { port },
	}

	tokio::select! {
		_ = ctx.cancel.cancelled() => return LaunchOutcome::Cancelled { port },
		_ = tokio::time::sleep(ctx.launch.grace_period) => {}
	}

	match ctx.channel.run_command("version").await {
		Ok(version) => {
			ctx.session.start(port);
			tracing::info!(target = "chimerax.launcher", port, "ChimeraX responded to version");
			LaunchOutcome::Started {
				port,
				executable,
				method: report.method,
				version,
			}
		}
		Err(err) => {
			tracing::warn!(target = "chimerax.launcher", port, error = %err, "ChimeraX not yet responsive");
			LaunchOutcome::Unresponsive {
				port,
				executable,
				error: err.to_string(),
			}
		}
	}
}
