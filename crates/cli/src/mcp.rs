//! MCP over stdio: newline-delimited JSON-RPC 2.0, one request at a time.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::Operation;
use crate::context::BridgeContext;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::output::ToolResult;

pub const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "chimerax-mcp";
const SERVER_TITLE: &str = "ChimeraX MCP";

/// Generic entry point taking any operation name or ChimeraX command.
pub const EXECUTE_COMMAND: &str = "execute_command";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct ToolCallParams {
	name: String,
	#[serde(default)]
	arguments: Value,
}

/// Omitted and `null` fields both read as empty.
#[derive(Debug, Default, Deserialize)]
struct ExecuteArguments {
	#[serde(default)]
	executable_name: Option<String>,
	#[serde(default)]
	args: Option<Vec<Value>>,
	#[serde(default)]
	named_args: Option<Map<String, Value>>,
}

fn response(id: Value, result: Value) -> Value {
	json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Option<Value>, code: i64, message: &str) -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": id.unwrap_or(Value::Null),
		"error": { "code": code, "message": message },
	})
}

fn text_content(text: String, is_error: bool) -> Value {
	json!({
		"content": [{ "type": "text", "text": text }],
		"isError": is_error,
	})
}

/// MCP `tools/call` result for a dispatch envelope. Image payloads become
/// `image` content; everything else is text.
pub fn tool_content(result: &ToolResult) -> Value {
	if let Some(Value::Object(payload)) = result.data() {
		if payload.get("type").and_then(Value::as_str) == Some("image") {
			let mut content = vec![json!({
				"type": "image",
				"data": payload.get("data").cloned().unwrap_or(Value::Null),
				"mimeType": payload.get("mimeType").cloned().unwrap_or(Value::Null),
			})];
			if let Some(path) = payload.get("path").and_then(Value::as_str) {
				content.push(json!({ "type": "text", "text": format!("Saved image: {path}") }));
			}
			return json!({ "content": content, "isError": false });
		}
	}
	text_content(result.text(), !result.ok)
}

pub fn tool_list() -> Vec<Value> {
	let mut tools = vec![json!({
		"name": EXECUTE_COMMAND,
		"description": "Run a bridge operation by name, or any ChimeraX command with positional and named arguments",
		"inputSchema": {
			"type": "object",
			"properties": {
				"executable_name": { "type": "string", "description": "Operation name or ChimeraX command" },
				"args": { "type": "array", "description": "Positional arguments" },
				"named_args": { "type": "object", "description": "Named arguments" }
			},
			"required": ["executable_name"]
		}
	})];
	tools.extend(Operation::ALL.iter().map(|op| {
		json!({
			"name": op.name(),
			"description": op.description(),
			"inputSchema": op.input_schema(),
		})
	}));
	tools
}

pub struct McpServer<'a> {
	ctx: &'a BridgeContext,
}

impl<'a> McpServer<'a> {
	pub fn new(ctx: &'a BridgeContext) -> Self {
		Self { ctx }
	}

	/// Reads requests until EOF, `exit`, or cancellation.
	pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
	where
		R: AsyncBufRead + Unpin,
		W: AsyncWrite + Unpin,
	{
		let mut lines = reader.lines();
		loop {
			let line = tokio::select! {
				_ = self.ctx.cancel.cancelled() => break,
				line = lines.next_line() => line?,
			};
			let Some(line) = line else { break };
			if line.trim().is_empty() {
				continue;
			}
			match self.handle_line(&line).await {
				Reply::None => {}
				Reply::Send(message) => {
					let mut encoded = serde_json::to_vec(&message)?;
					encoded.push(b'\n');
					writer.write_all(&encoded).await?;
					writer.flush().await?;
				}
				Reply::Exit => break,
			}
		}
		tracing::info!(target = "chimerax.mcp", "MCP input closed");
		Ok(())
	}

	pub async fn handle_line(&self, line: &str) -> Reply {
		match serde_json::from_str::<Value>(line) {
			Ok(message) => self.handle_message(&message).await,
			Err(err) => {
				tracing::warn!(target = "chimerax.mcp", error = %err, "unparseable request");
				Reply::Send(error_response(None, PARSE_ERROR, &format!("Parse error: {err}")))
			}
		}
	}

	pub async fn handle_message(&self, message: &Value) -> Reply {
		let Some(request) = message.as_object() else {
			return Reply::Send(error_response(None, INVALID_REQUEST, "Invalid Request: expected JSON object"));
		};
		let id = request.get("id").cloned();
		let Some(method) = request.get("method").and_then(Value::as_str) else {
			return Reply::Send(error_response(id, INVALID_REQUEST, "Invalid Request: missing method field"));
		};
		tracing::debug!(target = "chimerax.mcp", %method, "request");

		// Notifications get no reply.
		let Some(id) = id else {
			return if method == "exit" { Reply::Exit } else { Reply::None };
		};

		match method {
			"initialize" => Reply::Send(response(
				id,
				json!({
					"protocolVersion": PROTOCOL_VERSION,
					"capabilities": { "tools": { "listChanged": false } },
					"serverInfo": {
						"name": SERVER_NAME,
						"title": SERVER_TITLE,
						"version": env!("CARGO_PKG_VERSION"),
					},
				}),
			)),
			"ping" | "shutdown" => Reply::Send(response(id, json!({}))),
			"tools/list" => Reply::Send(response(id, json!({ "tools": tool_list() }))),
			"tools/call" => {
				let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
				match serde_json::from_value::<ToolCallParams>(params) {
					Ok(call) => Reply::Send(response(id, self.call_tool(call).await)),
					Err(err) => Reply::Send(error_response(Some(id), INVALID_PARAMS, &format!("Invalid params for tools/call: {err}"))),
				}
			}
			"exit" => Reply::Exit,
			_ => Reply::Send(error_response(Some(id), METHOD_NOT_FOUND, &format!("Method '{method}' not found"))),
		}
	}

	async fn call_tool(&self, call: ToolCallParams) -> Value {
		tracing::info!(target = "chimerax.mcp", tool = %call.name, "tools/call");
		let arguments = match call.arguments {
			Value::Object(arguments) => arguments,
			Value::Null => Map::new(),
			_ => return text_content("Tool arguments must be an object".into(), true),
		};

		if call.name == EXECUTE_COMMAND {
			let execute: ExecuteArguments = match serde_json::from_value(Value::Object(arguments)) {
				Ok(execute) => execute,
				Err(err) => return text_content(format!("Invalid arguments for {EXECUTE_COMMAND}: {err}"), true),
			};
			let Some(name) = execute.executable_name.filter(|name| !name.trim().is_empty()) else {
				return text_content("executable_name is required".into(), true);
			};
			let args = execute.args.unwrap_or_default();
			let named_args = execute.named_args.unwrap_or_default();
			let result = dispatch(self.ctx, &name, &args, &named_args).await;
			return tool_content(&result);
		}

		if Operation::lookup(&call.name).is_none() {
			return text_content(format!("Unknown tool: {}", call.name), true);
		}
		let result = dispatch(self.ctx, &call.name, &[], &arguments).await;
		tool_content(&result)
	}
}

/// What to write back for one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
	None,
	Send(Value),
	Exit,
}

/// Serves MCP on this process's stdin and stdout.
pub async fn run_stdio(ctx: &BridgeContext) -> Result<()> {
	tracing::info!(target = "chimerax.mcp", port = ctx.channel.port(), "serving MCP on stdio");
	let reader = BufReader::new(tokio::io::stdin());
	McpServer::new(ctx).serve(reader, tokio::io::stdout()).await
}
