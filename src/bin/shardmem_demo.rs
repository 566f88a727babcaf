//! Demo binary: spins up an in-process `LocalCluster`, runs a handful of
//! the scenarios the Director API is built against, and prints the
//! results. Not part of the tested public contract; see the library's
//! `tests/` for the behavior that actually matters.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shardmem::director::Director;
use shardmem::fabric::{Fabric, LocalCluster};
use shardmem::transform::{Fold, Op, Pred};
use shardmem::wire::Value;

/// shardmem demo - distributed variable memory over an in-process fabric
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of Shard processes to spawn
    #[arg(long, env = "SHARDS", default_value = "2")]
    shards: usize,

    /// Maximum elements a single Shard may hold
    #[arg(long, env = "MAX_PER_SHARD", default_value = "64")]
    max_per_shard: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!(shards = args.shards, max_per_shard = args.max_per_shard, "starting cluster");

    let mut fabrics = LocalCluster::build(args.shards);
    let director_fabric = Arc::new(fabrics.remove(0));

    let mut shard_tasks = Vec::with_capacity(fabrics.len());
    for fabric in fabrics {
        let fabric = Arc::new(fabric);
        let rank = fabric.rank();
        let shard = shardmem::Shard::new(fabric);
        shard_tasks.push(tokio::spawn(async move {
            if let Err(err) = shard.run().await {
                error!(rank, %err, "shard exited with an error");
            }
        }));
    }

    let mut director = Director::new(director_fabric, args.shards, args.max_per_shard);

    // S5: allocate 0..10, square it in place, keep the odd results, fold
    // with product.
    let mut handle = director.add(Value::List((0..10).collect())).await?;
    director.map(&handle, Op::Square).await?;
    director.filter(&mut handle, Pred::IsOdd).await?;
    let product = director.reduce(&handle, Fold::Product, 1).await?;
    info!(product, "scenario S5 complete");

    let read_back = director.read(&handle).await?;
    info!(?read_back, "surviving odd squares");

    director.free(&mut handle).await?;
    director.quit().await?;

    for task in shard_tasks {
        task.await?;
    }

    info!("cluster shutdown complete");
    Ok(())
}
