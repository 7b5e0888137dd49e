use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gestaltd")]
#[command(about = "Loads and manages services from configuration directives")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Directive file to process (repeatable, processed in order)
	#[arg(short = 'f', long = "file", value_name = "PATH")]
	pub files: Vec<PathBuf>,

	/// Directive text to process after the files (repeatable)
	#[arg(short = 'S', long = "directive", value_name = "TEXT")]
	pub directives: Vec<String>,

	/// Runtime configuration file (defaults to $GESTALT_CONFIG)
	#[arg(short, long, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Capacity of the default gestalt, overriding the configuration
	#[arg(long, value_name = "N")]
	pub capacity: Option<usize>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}
