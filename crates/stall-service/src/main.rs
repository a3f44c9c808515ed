//! Command-line console for stall operators.
//!
//! Each invocation loads the configuration, restores the stored session and
//! runs one command against the marketplace backend.

use clap::Parser;
use stall_config::Config;
use stall_core::{Console, ConsoleBuilder};
use stall_types::{ConsoleEvent, SessionEvent};
use std::path::PathBuf;
use tokio::sync::broadcast;

mod commands;
mod factory_registry;
mod render;

/// Command-line arguments for the stall console.
#[derive(Parser, Debug)]
#[command(name = "stallctl", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "stallctl.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.console.id);

	let console = build_console(config).await?;
	let mut events = console.events().subscribe();

	let result = commands::run(&console, args.command).await;
	report_session_events(&mut events);
	result
}

async fn build_console(config: Config) -> Result<Console, Box<dyn std::error::Error>> {
	let console = ConsoleBuilder::new(config)
		.build(factory_registry::console_factories())
		.await?;
	Ok(console)
}

/// Tells the operator when the session ended during the command.
fn report_session_events(events: &mut broadcast::Receiver<ConsoleEvent>) {
	while let Ok(event) = events.try_recv() {
		match event {
			ConsoleEvent::Session(SessionEvent::Expired) => {
				eprintln!("Session expired. Run `stallctl login` to sign in again.");
			},
			ConsoleEvent::Order(order_event) => tracing::debug!(?order_event, "Order event"),
			ConsoleEvent::Menu(menu_event) => tracing::debug!(?menu_event, "Menu event"),
			ConsoleEvent::Session(_) => {},
		}
	}
}
