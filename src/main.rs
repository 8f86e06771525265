use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use webstash::cache::{FetchCache, Status};
use webstash::config::Config;
use webstash::fetch::ReqwestFetcher;
use webstash::inflight::InFlightRegistry;
use webstash::logging;
use webstash::server;
use webstash::store::ShardedStore;

#[derive(Parser)]
#[command(name = "webstash")]
#[command(about = "Fetch-and-cache proxy for web pages")]
#[command(version)]
struct Cli {
    /// Path to a config.toml (built-in defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
        /// Override the configured cache directory
        #[arg(long)]
        data_root: Option<PathBuf>,
    },
    /// Fetch one URI into the local cache and wait for it to settle
    Warm {
        uri: String,
        /// Override the configured cache directory
        #[arg(long)]
        data_root: Option<PathBuf>,
    },
}

fn build_cache(
    config: &Config,
    data_root: Option<PathBuf>,
) -> Result<Arc<FetchCache>, Box<dyn std::error::Error>> {
    let root = data_root.unwrap_or_else(|| config.store.data_root.clone());
    let store = ShardedStore::new(root);
    let registry = Arc::new(InFlightRegistry::new());
    let fetcher = Arc::new(ReqwestFetcher::new(
        Duration::from_secs(config.fetch.timeout_seconds),
        &config.fetch.user_agent,
    )?);
    Ok(Arc::new(FetchCache::new(store, registry, fetcher)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, data_root } => {
            let cache = build_cache(&config, data_root)?;
            let port = port.unwrap_or(config.server.port);
            server::start_server(cache, &config.server.host, port).await?;
        }
        Commands::Warm { uri, data_root } => {
            let cache = build_cache(&config, data_root)?;
            let key = cache.enqueue(&uri);
            println!("🔑 {key}");
            loop {
                match cache.status(&key).await {
                    Status::InFlight => tokio::time::sleep(Duration::from_millis(200)).await,
                    Status::Found(bytes) => {
                        println!("✅ cached {} bytes", bytes.len());
                        break;
                    }
                    Status::NotFound => {
                        error!(%uri, "fetch did not produce a cache entry");
                        println!("❌ fetch failed; nothing cached");
                        std::process::exit(1);
                    }
                }
            }
        }
    }
    Ok(())
}
