//! Routes a tool call to a local operation or forwards it to ChimeraX.

use serde_json::{Map, Value};

use crate::commands::grammar::serialize_remote_command;
use crate::commands::{BoundArgs, Operation, RunOptions, execute, run_chimerax_command};
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::output::{ResultBuilder, ToolResult};

/// How a name is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
	Local(Operation),
	/// Not a registry name; sent as this ChimeraX command line.
	Remote(String),
}

pub fn classify(name: &str, positional: &[Value], named: &Map<String, Value>) -> Route {
	match Operation::lookup(name) {
		Some(operation) => Route::Local(operation),
		None => Route::Remote(serialize_remote_command(name, positional, named)),
	}
}

/// Runs one call and wraps the outcome in a [`ToolResult`]. Never fails.
pub async fn dispatch(ctx: &BridgeContext, name: &str, positional: &[Value], named: &Map<String, Value>) -> ToolResult {
	let builder = ResultBuilder::new(name);
	match run(ctx, name, positional, named).await {
		Ok(data) => builder.data(data).build(),
		Err(err) => {
			tracing::error!(target = "chimerax.dispatch", operation = %name, kind = %err.kind(), error = %err, "operation failed");
			builder.failure(&err).build()
		}
	}
}

async fn run(ctx: &BridgeContext, name: &str, positional: &[Value], named: &Map<String, Value>) -> Result<Value> {
	let name = name.trim();
	if name.is_empty() {
		return Err(BridgeError::invalid("Operation name must be a non-empty string"));
	}
	match classify(name, positional, named) {
		Route::Local(operation) => {
			tracing::debug!(target = "chimerax.dispatch", operation = operation.name(), "local operation");
			let args = BoundArgs::bind(operation, positional, named)?;
			execute(ctx, &args).await
		}
		Route::Remote(command) => {
			tracing::debug!(target = "chimerax.dispatch", %command, "forwarding to ChimeraX");
			Ok(run_chimerax_command(ctx, &command, RunOptions::new(true, false)).await?.into_json())
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use serde_json::json;

	use super::*;
	use crate::config::{BridgeConfig, LaunchSettings};
	use crate::error::ErrorKind;
	use crate::fake::{FakeChimeraX, FakePlatform, SpawnBehavior};

	fn named(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => Map::new(),
		}
	}

	fn context(fake: &FakeChimeraX, behavior: SpawnBehavior) -> BridgeContext {
		let port = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap().local_addr().unwrap().port();
		let mut config = BridgeConfig::default();
		config.port = port;
		config.launch = LaunchSettings {
			ready_timeout_ms: 400,
			poll_interval_ms: 50,
			grace_period_ms: 0,
			settle_ms: 0,
		};
		let platform = FakePlatform::new(Some(PathBuf::from("/usr/bin/ChimeraX")), behavior);
		BridgeContext::new(config, platform, fake.factory())
	}

	#[test]
	fn registry_names_route_locally() {
		assert_eq!(classify("is_chimerax_running", &[], &Map::new()), Route::Local(Operation::IsChimeraxRunning));
		assert_eq!(classify("open", &[json!("1abc")], &Map::new()), Route::Remote("open 1abc".into()));
	}

	#[test]
	fn remote_quoting() {
		assert_eq!(
			classify("select", &[], &named(json!({ "name": "chain A" }))),
			Route::Remote(r#"select name "chain A""#.into())
		);
		assert_eq!(
			classify("style", &[json!("protein")], &named(json!({ "representation": "cartoon" }))),
			Route::Remote("style protein representation cartoon".into())
		);
	}

	#[tokio::test]
	async fn running_check_returns_bool() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake, SpawnBehavior::Nothing);
		let result = dispatch(&ctx, "is_chimerax_running", &[], &Map::new()).await;
		assert!(result.ok);
		assert_eq!(result.data, Some(json!(false)));
		assert!(fake.issued().is_empty());
	}

	#[tokio::test]
	async fn pass_through_sends_literal_command() {
		let fake = FakeChimeraX::running();
		fake.respond("open 1abc", json!("Opened 1abc containing 1 model"));
		let ctx = context(&fake, SpawnBehavior::Nothing);
		let result = dispatch(&ctx, "open", &[json!("1abc")], &Map::new()).await;
		assert!(result.ok, "{result:?}");
		assert_eq!(result.data, Some(json!("Opened 1abc containing 1 model")));
		assert_eq!(fake.issued(), ["open 1abc"]);
	}

	#[tokio::test]
	async fn pass_through_auto_launches() {
		let fake = FakeChimeraX::new();
		let ctx = context(&fake, SpawnBehavior::Start(fake.clone()));
		let result = dispatch(&ctx, "open", &[json!("1abc")], &Map::new()).await;
		assert!(result.ok, "{result:?}");
		assert_eq!(fake.issued(), ["open 1abc"]);
		assert!(ctx.session.is_active());
	}

	#[tokio::test]
	async fn binding_errors_become_envelopes() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake, SpawnBehavior::Nothing);
		let result = dispatch(&ctx, "measure_distance", &[json!("#1@CA")], &Map::new()).await;
		assert!(!result.ok);
		assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
		assert!(result.data.is_none());
	}

	#[tokio::test]
	async fn remote_fault_and_closed_target_are_classified() {
		let fake = FakeChimeraX::running();
		fake.fail("bogus", "Unknown command: bogus");
		let ctx = context(&fake, SpawnBehavior::Nothing);
		let failed = dispatch(&ctx, "bogus", &[], &Map::new()).await;
		assert_eq!(failed.error_kind(), Some(ErrorKind::RemoteFailure));

		let result = dispatch(&ctx, "run_chimerax_command", &[json!("exit")], &Map::new()).await;
		assert!(result.ok);
		let lost = dispatch(&ctx, "run_chimerax_command", &[json!("view")], &Map::new()).await;
		assert_eq!(lost.error_kind(), Some(ErrorKind::NotRunning));
	}

	#[tokio::test]
	async fn empty_name_is_invalid() {
		let fake = FakeChimeraX::running();
		let ctx = context(&fake, SpawnBehavior::Nothing);
		let result = dispatch(&ctx, " ", &[], &Map::new()).await;
		assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
	}
}
