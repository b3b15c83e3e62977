//! Almanac command-line driver.
//!
//! Builds a calendar engine over a JSON event file, optionally scrolls the
//! window forward, waits for loading to settle and prints what the engine
//! holds. Useful for checking a feed and a config file before wiring them into
//! a host application.

use std::path::PathBuf;
use std::sync::Arc;

use almanac_engine::{CalendarEngine, EngineConfig, JsonFileSource, Month};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Almanac command line arguments.
#[derive(Parser, Debug)]
#[command(name = "almanac")]
#[command(about = "Drive the almanac calendar engine against a JSON event file")]
struct Args {
	/// JSON file holding an array of events (or an object with `events`)
	#[arg(short, long, value_name = "PATH")]
	events: PathBuf,

	/// Engine configuration (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Month to center on, as YYYY-MM (defaults to the current month)
	#[arg(short, long, value_name = "YYYY-MM")]
	month: Option<Month>,

	/// Number of months to append after the initial load
	#[arg(long, value_name = "N", default_value_t = 0)]
	scroll_to_end: u32,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
	let subscriber = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let config = match &args.config {
		Some(path) => EngineConfig::load(path)?,
		None => EngineConfig::default(),
	};
	info!(events = %args.events.display(), "Starting almanac");

	let mut builder = CalendarEngine::builder(config, Arc::new(JsonFileSource::new(&args.events)));
	if let Some(month) = args.month {
		builder = builder.initial(month.first_day());
	}
	let engine = builder.build()?;
	engine.settle().await;

	for _ in 0..args.scroll_to_end {
		if engine.extend_tail().is_none() {
			break;
		}
	}
	engine.settle().await;

	let snapshot = engine.snapshot();
	let window: Vec<String> = snapshot.window.iter().map(ToString::to_string).collect();
	println!("window:  {}", window.join(" "));
	println!("active:  {}", snapshot.active);
	println!(
		"cache:   {}/{} [{}]",
		snapshot.cache.size,
		snapshot.cache.capacity,
		snapshot.cache.keys.join(", ")
	);
	for grid in engine.month_grids() {
		println!("{}  {:>3} events  {} weeks", grid.month, grid.event_count(), grid.week_rows());
	}
	for (month, message) in &snapshot.errored {
		println!("{month}  error: {message}");
	}

	engine.shutdown();
	Ok(())
}
