use anyhow::Result;
use clap::Parser;
use fauna_core::config::AppConfig;
use fauna_core::metrics::init_logging;
use fauna_lib::HeadlessRunner;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 3600)]
    ticks: u64,

    /// Step length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// RNG seed, overriding the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write every event to this file as JSON Lines
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(seed) = args.seed {
        config.world.seed = Some(seed);
    }
    config.validate()?;

    let mut runner = HeadlessRunner::new(config, args.dt)?;
    if let Some(path) = &args.events {
        runner.record_events_to(path)?;
    }

    tracing::info!(ticks = args.ticks, dt = args.dt, "Running headless simulation");
    let summary = runner.run(args.ticks);
    tracing::info!(
        ticks = summary.ticks,
        population = summary.population,
        births = summary.births,
        deaths = summary.deaths,
        families = summary.families,
        "Simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
