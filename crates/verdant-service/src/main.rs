//! One-shot admin CLI for the Verdant garden graph.
//!
//! Bootstraps the store and answers spot queries; results go to stdout
//! as JSON lines, logs to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use verdant_service::{GardenService, ServiceConfig};

#[derive(Parser)]
#[command(name = "verdant")]
#[command(about = "Administration CLI for the Verdant garden graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: verdant).
    #[arg(short, long, default_value = "verdant", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap the store: schema, seed data, reference migration.
    Init,
    /// Check whether a coordinate is plantable.
    Check {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Rank the crops nearest to a coordinate.
    Nearest {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        /// Bounding-box radius for the candidate search.
        #[arg(long, default_value_t = 50.0)]
        radius: f64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Per-kind entity counts, store-backed with memory fallback.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config);
    let service = GardenService::start(config).await?;

    match cli.command {
        Command::Init => {
            let initialized = service.bootstrap_store().await;
            let health = service.health();
            println!(
                "{}",
                serde_json::json!({ "initialized": initialized, "health": health })
            );
            if !initialized {
                anyhow::bail!("store bootstrap incomplete; see logs");
            }
        }
        Command::Check { x, y } => {
            let blocking = service.structures_intersecting(x, y).await;
            let names: Vec<&str> = blocking.iter().map(|s| s.name.as_str()).collect();
            println!(
                "{}",
                serde_json::json!({
                    "x": x,
                    "y": y,
                    "usable": blocking.is_empty(),
                    "blocking_structures": names,
                })
            );
        }
        Command::Nearest {
            x,
            y,
            radius,
            limit,
        } => {
            let limit = limit.unwrap_or(service.settings().nearest_limit);
            let hits = service.nearest_crops(x, y, radius, limit).await;
            println!("{}", serde_json::to_string(&hits)?);
        }
        Command::Stats => {
            let stats = service.stats().await;
            println!("{}", serde_json::to_string(&stats)?);
        }
    }

    Ok(())
}
