use chimerax_mcp::{app, cli::Cli, logging};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let code = match app::run(cli).await {
		Ok(true) => 0,
		Ok(false) => 1,
		Err(err) => {
			error!(target = "chimerax.mcp", error = %format!("{err:#}"), "command failed");
			1
		}
	};
	// The stdin reader may still be parked on a blocking read.
	std::process::exit(code);
}
