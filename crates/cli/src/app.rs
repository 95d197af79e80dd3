//! Subcommand execution for the binary.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::cli::{Cli, Commands};
use crate::commands::Operation;
use crate::config::{BridgeConfig, ConfigOverrides};
use crate::context::BridgeContext;
use crate::dispatch::dispatch;
use crate::mcp;
use crate::output::print_result;

/// Runs the parsed command line. `Ok(false)` means the operation reported an error envelope.
pub async fn run(cli: Cli) -> Result<bool> {
	let overrides = ConfigOverrides {
		port: cli.port,
		chimerax_path: cli.chimerax_path.clone(),
	};
	let config = BridgeConfig::load(cli.config.as_deref(), overrides).context("failed to load configuration")?;

	let command = cli.command.clone().unwrap_or(Commands::Serve);
	if let Commands::Tools = command {
		let tools: Vec<Value> = Operation::ALL.iter().map(|op| op.describe()).collect();
		println!("{}", serde_json::to_string_pretty(&tools)?);
		return Ok(true);
	}

	let ctx = BridgeContext::from_config(config).context("failed to initialize bridge")?;
	let cancel = ctx.cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::info!(target = "chimerax.mcp", "interrupt received");
			cancel.cancel();
		}
	});

	match command {
		Commands::Serve => {
			mcp::run_stdio(&ctx).await?;
			Ok(true)
		}
		Commands::Exec { operation, args, named } => {
			let positional = parse_positional(args.as_deref())?;
			let named = parse_named(named.as_deref())?;
			let result = dispatch(&ctx, &operation, &positional, &named).await;
			print_result(&result, cli.format);
			Ok(result.ok)
		}
		Commands::Diagnose => {
			let result = dispatch(&ctx, Operation::DiagnoseChimerax.name(), &[], &Map::new()).await;
			print_result(&result, cli.format);
			Ok(result.ok)
		}
		Commands::Tools => Ok(true),
	}
}

fn parse_positional(raw: Option<&str>) -> Result<Vec<Value>> {
	let Some(raw) = raw else { return Ok(Vec::new()) };
	match serde_json::from_str(raw).context("--args must be JSON")? {
		Value::Array(values) => Ok(values),
		other => Ok(vec![other]),
	}
}

fn parse_named(raw: Option<&str>) -> Result<Map<String, Value>> {
	let Some(raw) = raw else { return Ok(Map::new()) };
	match serde_json::from_str(raw).context("--named must be JSON")? {
		Value::Object(map) => Ok(map),
		_ => bail!("--named must be a JSON object"),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn positional_scalars_are_wrapped() {
		assert_eq!(parse_positional(Some("[1, \"a\"]")).unwrap(), vec![json!(1), json!("a")]);
		assert_eq!(parse_positional(Some("42184")).unwrap(), vec![json!(42184)]);
		assert!(parse_positional(None).unwrap().is_empty());
		assert!(parse_positional(Some("[")).is_err());
	}

	#[test]
	fn named_must_be_an_object() {
		assert_eq!(parse_named(Some(r#"{"limit": 2}"#)).unwrap()["limit"], 2);
		assert!(parse_named(Some("[1]")).is_err());
	}
}
