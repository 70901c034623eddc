use anyhow::{Context, Result};
use clap::Parser;
use jaggregator::config::Config;
use jaggregator::feed::FeedRegistry;
use jaggregator::web::{build_http_client, AppState, WebServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "jaggregator=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "jaggregator",
    version,
    about = "News and podcast aggregator with article expansion and an audio proxy"
)]
struct Args {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, value_name = "FILE", default_value = "jaggregator.toml")]
    config: PathBuf,

    /// Listen address, overriding `listen_addr`
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Feed registry file, overriding `feeds_file`
    #[arg(long, value_name = "FILE")]
    feeds_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(feeds_file) = args.feeds_file {
        config.feeds_file = feeds_file;
    }

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;

    let registry = FeedRegistry::load(&config.feeds_file).with_context(|| {
        format!(
            "Failed to read feed registry '{}'",
            config.feeds_file.display()
        )
    })?;
    tracing::info!(
        path = %config.feeds_file.display(),
        feeds = registry.feeds().len(),
        "Feed registry ready"
    );

    let client =
        build_http_client(config.fetch_timeout()).context("Failed to build HTTP client")?;
    let state = AppState::from_config(&config, client, registry);

    WebServer::new(addr, state, config.allowed_origins.clone())
        .run()
        .await
        .context("Web server failed")
}
