use std::sync::Arc;

use clap::Parser;
use meshmap::{
    actors::RegistryHandle,
    api::{ApiState, spawn_api_server},
    clock::SystemClock,
    config::{CollectorConfig, read_config_file},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Collects node snapshots and serves the fleet map")]
struct Args {
    /// Optional JSON config file; environment variables override it
    #[arg(short)]
    file: Option<String>,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    dotenv::dotenv().ok();

    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("meshmap", level),
        ("meshmap_collector", level),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => CollectorConfig::default(),
    };
    config.apply_env();
    config.validate()?;
    info!(
        "node timeout {}s, grace {}s, gc every {}s, max {} connections (dedup: {})",
        config.node_timeout_seconds,
        config.cleanup_grace_period_seconds,
        config.gc_interval_seconds,
        config.max_connections,
        config.dedup_connections
    );

    let registry = RegistryHandle::spawn_with_clock(config.settings()?, Arc::new(SystemClock));
    let state = ApiState::new(registry.clone());

    let addr = spawn_api_server(config.api_config(), state).await?;
    info!("collector ready on http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    registry.shutdown().await;

    Ok(())
}
