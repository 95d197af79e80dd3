//! Full MCP conversations against the in-process fake ChimeraX.

use std::path::PathBuf;

use chimerax_mcp::config::BridgeConfig;
use chimerax_mcp::context::BridgeContext;
use chimerax_mcp::fake::{FakeChimeraX, FakePlatform, SpawnBehavior};
use chimerax_mcp::mcp::McpServer;
use chimerax_mcp::session::{SessionRepository, SessionTracker};
use serde_json::{Value, json};
use tempfile::TempDir;

fn context(fake: &FakeChimeraX, sessions: &TempDir) -> BridgeContext {
	let platform = FakePlatform::new(Some(PathBuf::from("/usr/bin/ChimeraX")), SpawnBehavior::Nothing);
	let mut ctx = BridgeContext::new(BridgeConfig::default(), platform, fake.factory());
	ctx.session = SessionTracker::with_repository(SessionRepository::new(Some(sessions.path().to_path_buf())));
	ctx
}

fn call(id: u64, name: &str, arguments: Value) -> String {
	json!({
		"jsonrpc": "2.0",
		"id": id,
		"method": "tools/call",
		"params": { "name": name, "arguments": arguments },
	})
	.to_string()
}

async fn converse(ctx: &BridgeContext, requests: &[String]) -> Vec<Value> {
	let mut input = requests.join("\n");
	input.push('\n');
	let mut output = Vec::new();
	McpServer::new(ctx).serve(input.as_bytes(), &mut output).await.unwrap();
	String::from_utf8(output)
		.unwrap()
		.lines()
		.map(|line| serde_json::from_str(line).unwrap())
		.collect()
}

fn text(reply: &Value) -> &str {
	reply["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn fetch_capture_and_history_round_trip() {
	let fake = FakeChimeraX::running();
	fake.push_log("earlier output\n");
	fake.respond("open 1abc", json!("Opened 1abc containing 1 model"));
	let sessions = TempDir::new().unwrap();
	let ctx = context(&fake, &sessions);

	let replies = converse(
		&ctx,
		&[
			json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }).to_string(),
			json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
			call(1, "open_chimerax", json!({})),
			call(2, "fetch_structure", json!({ "pdb_id": "1abc", "auto_display": false, "capture_log": true })),
			call(3, "get_command_history", json!({})),
			call(4, "export_session", json!({ "filename": "history.json" })),
		],
	)
	.await;
	assert_eq!(replies.len(), 5);

	let opened: Value = serde_json::from_str(text(&replies[1])).unwrap();
	assert_eq!(opened["status"], "already_running");

	let fetched: Value = serde_json::from_str(text(&replies[2])).unwrap();
	assert_eq!(fetched["result"], "Fetched structure 1abc. Opened 1abc containing 1 model");
	assert!(fetched["log"].as_str().unwrap().contains("Opened 1abc containing 1 model"));
	assert!(!fetched["log"].as_str().unwrap().contains("earlier output"));
	assert!(fake.log_text().contains("earlier output"));

	let history: Value = serde_json::from_str(text(&replies[3])).unwrap();
	assert_eq!(history.as_array().unwrap().len(), 1);
	assert_eq!(history[0]["command"], "open 1abc");

	let exported = sessions.path().join("history.json");
	assert!(exported.is_file());
	let document: Value = serde_json::from_str(&std::fs::read_to_string(&exported).unwrap()).unwrap();
	assert_eq!(document["models"][0]["pdb_id"], "1abc");
}

#[tokio::test]
async fn import_restores_history_into_a_fresh_bridge() {
	let sessions = TempDir::new().unwrap();

	let fake = FakeChimeraX::running();
	let first = context(&fake, &sessions);
	converse(
		&first,
		&[
			call(1, "open_chimerax", json!({})),
			call(2, "execute_command", json!({ "executable_name": "open", "args": ["2xyz"] })),
			call(3, "execute_command", json!({ "executable_name": "color", "args": ["red"] })),
			call(4, "export_session", json!({ "filename": "saved.json" })),
		],
	)
	.await;

	let fake = FakeChimeraX::running();
	let second = context(&fake, &sessions);
	let replies = converse(
		&second,
		&[
			call(1, "import_session", json!({ "filename": "saved.json" })),
			call(2, "get_command_history", json!({ "limit": 1 })),
		],
	)
	.await;
	let imported: Value = serde_json::from_str(text(&replies[0])).unwrap();
	assert_eq!(imported["commandCount"], 2);
	let history: Value = serde_json::from_str(text(&replies[1])).unwrap();
	assert_eq!(history[0]["command"], "color red");
}

#[tokio::test]
async fn closed_target_reports_not_running() {
	let fake = FakeChimeraX::running();
	let sessions = TempDir::new().unwrap();
	let ctx = context(&fake, &sessions);
	let replies = converse(
		&ctx,
		&[
			call(1, "close_chimerax", json!({})),
			call(2, "is_chimerax_running", json!({})),
			call(3, "run_chimerax_command", json!({ "command": "view" })),
		],
	)
	.await;
	assert_eq!(text(&replies[0]), "ChimeraX closed");
	assert_eq!(text(&replies[1]), "false");
	assert_eq!(replies[2]["result"]["isError"], true);
	assert!(text(&replies[2]).starts_with("Error [NOT_RUNNING]"));
	assert!(!ctx.session.is_active());
}
