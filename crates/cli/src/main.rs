//! Gestalt service host.
//!
//! Initializes the process-wide runtime, applies the configured directives, then the files and
//! directives given on the command line, and tears everything down in reverse order.

mod cli;
mod heartbeat;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use gestalt::{Runtime, RuntimeConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let mut config = RuntimeConfig::discover(cli.config.as_deref())?;
	if let Some(capacity) = cli.capacity {
		config.repository.capacity = capacity;
	}
	let runtime = Runtime::init(config)?;
	info!(capacity = runtime.config().repository.capacity, "gestaltd started");

	let mut errors = runtime.process_configured()?;
	for path in &cli.files {
		errors += runtime
			.process_file(path)
			.with_context(|| format!("processing {}", path.display()))?;
	}
	for text in &cli.directives {
		errors += runtime.process_directive(text);
	}

	if let Some(gestalt) = runtime.default_gestalt() {
		for service in gestalt.services() {
			info!(id = %service.id(), state = ?service.state(), info = %service.info(), "service");
		}
	}

	let cleanups = runtime.shutdown()?;
	info!(cleanups, errors, "gestaltd stopped");

	if errors > 0 {
		anyhow::bail!("{errors} directive(s) failed");
	}
	Ok(())
}
