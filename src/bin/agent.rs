use clap::Parser;
use meshmap::{agent::Reporter, config::AgentConfig};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Reports this node's metrics and peer latency to the collector")]
struct Args {
    /// Send a single report and exit
    #[arg(long)]
    once: bool,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    dotenv::dotenv().ok();

    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new()
        .with_targets(vec![("meshmap", level), ("meshmap_agent", level)]);
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

    let config = AgentConfig::from_env()?;
    let mut reporter = Reporter::new(config)?;

    if args.once {
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        return reporter.report_once().await;
    }

    tokio::select! {
        _ = reporter.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("agent stopped");
        }
    }

    Ok(())
}
