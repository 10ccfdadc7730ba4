mod cache;
mod config;
mod logging;
mod market;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "marketwatch")]
#[command(about = "Cached crypto market data in front of CoinGecko")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/marketwatch/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on, overrides server.bind
  #[arg(short, long)]
  bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override bind address if specified on command line
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  let _log_guard = logging::init(&config.logging)?;

  info!(
    upstream = %config.upstream.base_url,
    "starting marketwatch {}",
    env!("CARGO_PKG_VERSION")
  );

  let market = market::cached_client::CachedMarketClient::new(&config)?;
  server::serve(config.server.bind, server::AppState { market }).await?;

  Ok(())
}
