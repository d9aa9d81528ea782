#![doc = include_str!("../README.md")]

mod sim;

use clap::Parser;
use sim::config::{CliArgs, SimConfig};
use sim::driver::Session;
use sim::telemetry::init_telemetry;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = SimConfig::try_from(args)?;

    init_telemetry(config.log_json)?;
    log_startup_info(&config);

    let mut session = Session::new(config);
    let report = session.run().await?;
    tracing::info!(
        updates = report.updates,
        failures = report.failures,
        records = report.records,
        gaps = report.gaps,
        "Session finished"
    );
    for view in session.timeline().views().iter().take(5) {
        tracing::info!("{view}");
    }
    Ok(())
}

fn log_startup_info(config: &SimConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting session with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting session: {} posts, page size {}, failure rate {}",
            config.seed_posts,
            config.page_size,
            config.failure_rate
        );
    }
}
