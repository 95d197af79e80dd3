//! Channel, executable and session lifecycle operations.

use std::path::Path;

use serde_json::{Value, json};

use super::grammar::path_argument;
use super::helpers::session_filename;
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::launcher::{LaunchOutcome, launch};

pub fn initialize_server_proxy(ctx: &BridgeContext, port: Option<u16>) -> Value {
	let client = ctx.channel.build_client(port);
	json!({
		"message": format!("XML-RPC server proxy initialized with port {}", ctx.channel.port()),
		"port": ctx.channel.port(),
		"endpoint": client.endpoint(),
	})
}

pub fn set_xmlrpc_port(ctx: &BridgeContext, port: u16) -> Value {
	ctx.channel.set_port(port);
	json!(format!("XML-RPC port set to {port}"))
}

pub async fn is_chimerax_running(ctx: &BridgeContext) -> Value {
	Value::Bool(ctx.channel.is_target_alive().await)
}

pub fn get_chimerax_executable_path(ctx: &BridgeContext) -> Result<Value> {
	let path = ctx.locator.resolve()?;
	Ok(json!(path.display().to_string()))
}

pub fn set_chimerax_path(ctx: &BridgeContext, path: &str) -> Result<Value> {
	let path = ctx.locator.set_override(path)?;
	Ok(json!(format!("ChimeraX path set to: {}", path.display())))
}

/// Launch outcomes are data; only a failed spawn or discovery is an error.
pub async fn open_chimerax(ctx: &BridgeContext, port: Option<u16>) -> Result<Value> {
	match launch(ctx, port).await {
		LaunchOutcome::Failed(err) => Err(err),
		outcome => Ok(outcome.into_json()),
	}
}

/// Saves the session when asked, sends `exit`, and ends the session episode.
pub async fn close_chimerax(ctx: &BridgeContext, save_session_file: Option<&str>) -> Result<Value> {
	if !ctx.channel.is_target_alive().await {
		ctx.session.stop();
		return Ok(json!("ChimeraX is not running"));
	}

	let _shared = ctx.capture_lock.read().await;
	let mut saved = None;
	if let Some(filename) = save_session_file.map(str::trim).filter(|name| !name.is_empty()) {
		let filename = session_filename(filename)?;
		let command = format!("save {} format session", path_argument(Path::new(&filename)));
		ctx.session.record_command(&command);
		ctx.channel.run_command(&command).await?;
		ctx.session.set_session_file(filename.clone());
		saved = Some(filename);
	}

	ctx.session.record_command("exit");
	match ctx.channel.run_command("exit").await {
		Ok(_) => {}
		// ChimeraX may drop the connection while shutting down.
		Err(BridgeError::ConnectionLost(detail)) => {
			tracing::debug!(target = "chimerax.dispatch", %detail, "connection closed during exit");
		}
		Err(err) => return Err(err),
	}
	ctx.session.stop();
	tracing::info!(target = "chimerax.dispatch", saved = saved.as_deref(), "ChimeraX closed");

	Ok(json!(match saved {
		Some(filename) => format!("ChimeraX closed and session saved to {filename}"),
		None => "ChimeraX closed".to_string(),
	}))
}

/// Reconciles the session with liveness, then reports it.
pub async fn get_session_status(ctx: &BridgeContext) -> Result<Value> {
	let running = ctx.channel.is_target_alive().await;
	if running && !ctx.session.is_active() {
		ctx.session.start(ctx.channel.port());
	}
	if !running && ctx.session.is_active() {
		ctx.session.stop();
	}
	Ok(serde_json::to_value(ctx.session.snapshot())?)
}

pub fn get_command_history(ctx: &BridgeContext, limit: Option<i64>) -> Result<Value> {
	let limit = limit.map(|limit| usize::try_from(limit).unwrap_or(0));
	Ok(serde_json::to_value(ctx.session.command_history(limit))?)
}

pub fn clear_command_history(ctx: &BridgeContext) -> Value {
	if ctx.session.clear_history() {
		json!("Command history cleared")
	} else {
		json!("No active session; command history unchanged")
	}
}

pub fn export_session(ctx: &BridgeContext, filename: Option<&str>) -> Result<Value> {
	let path = ctx.session.export(filename)?;
	Ok(json!({
		"message": format!("Session exported to {}", path.display()),
		"path": path.display().to_string(),
	}))
}

pub fn import_session(ctx: &BridgeContext, filename: &str) -> Result<Value> {
	ctx.session.import(filename)?;
	let snapshot = ctx.session.snapshot();
	Ok(json!({
		"message": format!("Session history imported from {filename}"),
		"commandCount": snapshot.command_count,
		"modelCount": snapshot.model_count,
	}))
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::config::BridgeConfig;
	use crate::error::ErrorKind;
	use crate::fake::{FakeChimeraX, FakePlatform, SpawnBehavior};

	fn context(fake: &FakeChimeraX) -> BridgeContext {
		let platform = FakePlatform::new(Some(PathBuf::from("/usr/bin/ChimeraX")), SpawnBehavior::Nothing);
		BridgeContext::new(BridgeConfig::default(), platform, fake.factory())
	}

	#[test]
	fn proxy_init_switches_port() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		let result = initialize_server_proxy(&ctx, Some(50000));
		assert_eq!(result["port"], 50000);
		assert_eq!(result["endpoint"], "fake://127.0.0.1:50000");
		assert_eq!(set_xmlrpc_port(&ctx, 50001), json!("XML-RPC port set to 50001"));
		assert_eq!(ctx.channel.endpoint().as_deref(), Some("fake://127.0.0.1:50001"));
	}

	#[test]
	fn override_path_must_exist() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		assert_eq!(set_chimerax_path(&ctx, "").unwrap_err().kind(), ErrorKind::InvalidArgument);
		assert_eq!(set_chimerax_path(&ctx, "/nonexistent/ChimeraX").unwrap_err().kind(), ErrorKind::NotFound);

		let dir = tempfile::TempDir::new().unwrap();
		let exe = dir.path().join("ChimeraX");
		std::fs::write(&exe, "").unwrap();
		set_chimerax_path(&ctx, exe.to_str().unwrap()).unwrap();
		assert_eq!(get_chimerax_executable_path(&ctx).unwrap(), json!(exe.display().to_string()));
	}

	#[tokio::test]
	async fn close_saves_then_exits() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		ctx.session.start(ctx.channel.port());

		let result = close_chimerax(&ctx, Some("final")).await.unwrap();
		assert_eq!(result, json!("ChimeraX closed and session saved to final.cxs"));
		assert_eq!(fake.issued(), ["save final.cxs format session", "exit"]);
		assert!(!fake.is_alive());
		assert!(!ctx.session.is_active());
		assert_eq!(ctx.session.record().session_file.as_deref(), Some("final.cxs"));
	}

	#[tokio::test]
	async fn close_when_not_running_sends_nothing() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		assert_eq!(close_chimerax(&ctx, None).await.unwrap(), json!("ChimeraX is not running"));
		assert!(fake.issued().is_empty());
	}

	#[tokio::test]
	async fn status_follows_liveness() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let status = get_session_status(&ctx).await.unwrap();
		assert_eq!(status["active"], true);
		assert_eq!(status["port"], ctx.channel.port());

		fake.set_alive(false);
		let status = get_session_status(&ctx).await.unwrap();
		assert_eq!(status["active"], false);
		assert!(status["metadata"]["end_time"].is_string());
	}

	#[tokio::test]
	async fn open_reports_already_running() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake);
		let result = open_chimerax(&ctx, None).await.unwrap();
		assert_eq!(result["status"], "already_running");
		assert_eq!(result["running"], true);
	}

	#[tokio::test]
	async fn open_without_executable_is_error() {
		let fake = FakeChimeraX::new();
		let platform = FakePlatform::new(None, SpawnBehavior::Nothing);
		let ctx = BridgeContext::new(BridgeConfig::default(), platform, fake.factory());
		assert_eq!(open_chimerax(&ctx, None).await.unwrap_err().kind(), ErrorKind::NotFound);
	}

	#[test]
	fn history_operations() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake);
		assert_eq!(clear_command_history(&ctx), json!("No active session; command history unchanged"));

		ctx.session.start(42184);
		for command in ["open 1abc", "view", "color red"] {
			ctx.session.record_command(command);
		}
		let history = get_command_history(&ctx, Some(2)).unwrap();
		assert_eq!(history.as_array().unwrap().len(), 2);
		assert_eq!(history[1]["command"], "color red");
		assert_eq!(clear_command_history(&ctx), json!("Command history cleared"));
		assert_eq!(get_command_history(&ctx, None).unwrap(), json!([]));
	}
}
