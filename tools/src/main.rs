//! zone-runner: headless pipeline runner for PRAVAH risk zones.
//!
//! Usage:
//!   zone-runner --db pravah.db --seed 12345 --min-cell-size 10

use anyhow::Result;
use pravah_core::{config::PipelineConfig, pipeline, privacy::PrivacyPolicy, store::ZoneStore};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("pravah.db");
    let config = match args.windows(2).find(|w| w[0] == "--min-cell-size") {
        Some(w) => PipelineConfig {
            minimum_cell_size: w[1].parse()?,
        },
        None => PipelineConfig::from_env()?,
    };

    println!("PRAVAH — zone-runner");
    println!("  db:            {db}");
    println!("  seed:          {seed}");
    println!("  min cell size: {}", config.minimum_cell_size);
    println!();

    let mut store = ZoneStore::open(db)?;
    store.migrate()?;
    log::debug!("schema ready at {db}");

    let policy = PrivacyPolicy::from_config(&config);
    let summary = pipeline::run(&mut store, policy, seed)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
