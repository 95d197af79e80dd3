use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "chimerax-mcp")]
#[command(about = "MCP bridge for UCSF ChimeraX over its XML-RPC remote control")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON config file (defaults to the per-user config when present)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// XML-RPC port ChimeraX listens on
	#[arg(long, global = true, env = "CHIMERAX_XMLRPC_PORT", value_parser = clap::value_parser!(u16).range(1..))]
	pub port: Option<u16>,

	/// ChimeraX executable, skipping installation discovery
	#[arg(long, global = true, env = "CHIMERAX_PATH", value_name = "PATH")]
	pub chimerax_path: Option<String>,

	/// Result format for one-shot commands
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
	pub format: OutputFormat,

	/// Defaults to `serve`
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Serve MCP over stdin/stdout
	Serve,

	/// Run one operation or ChimeraX command and print the result envelope
	Exec {
		/// Operation name or ChimeraX command
		operation: String,
		/// Positional arguments as a JSON array
		#[arg(long, value_name = "JSON")]
		args: Option<String>,
		/// Named arguments as a JSON object
		#[arg(long, value_name = "JSON")]
		named: Option<String>,
	},

	/// List operations and their parameters
	Tools,

	/// Print the installation and connection report
	#[command(alias = "doctor")]
	Diagnose,
}
