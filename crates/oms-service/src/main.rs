//! Main entry point for the order management service.
//!
//! This binary loads configuration, builds the engine with its storage
//! backend and background workers, and serves the HTTP API until
//! interrupted.

use clap::Parser;
use oms_config::Config;
use oms_core::OmsBuilder;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with storage, queue, and services
/// 5. Runs the engine and the API server until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	// Load configuration; a missing file falls back to defaults so the
	// service can be started with no setup at all.
	let config = if args.config.exists() {
		Config::from_file(&args.config)?
	} else {
		tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
		Config::default()
	};
	tracing::info!(id = %config.service.id, "Loaded configuration");

	let api_config = config.api.clone();
	let engine = Arc::new(OmsBuilder::new(config).build()?);

	if api_config.enabled {
		let api_engine = Arc::clone(&engine);
		tokio::select! {
			result = engine.run() => {
				tracing::info!("Engine finished");
				result?;
			}
			result = server::start_server(api_config, api_engine) => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("API disabled, running workers only");
		engine.run().await?;
	}

	tracing::info!("Stopped");
	Ok(())
}
