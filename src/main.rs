mod api;
mod app;
mod config;
mod debounce;
mod error;
mod event;
mod logging;
mod query;
mod routes;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::api::CachedTicketClient;
use crate::app::{App, AppContext};
use crate::routes::Route;

#[derive(Parser, Debug)]
#[command(name = "tix")]
#[command(about = "A terminal ticket browser")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./tix.yaml or $XDG_CONFIG_HOME/tix/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Page to open, e.g. /tickets/2 or /user-profile
  #[arg(short, long, default_value = "/tickets")]
  route: String,

  /// Ticket API base URL (default: built-in mock data)
  #[arg(long)]
  api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = Some(url);
  }

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init(config.log_dir.as_deref())?;

  let route = Route::parse(&args.route).map_err(|e| eyre!("Invalid --route: {}", e))?;
  let api = api::from_config(&config)?;
  let client = CachedTicketClient::new(api, config.cache.stale_time());
  let ctx = AppContext::new(client, config.title(), config.search.debounce());

  let mut app = App::new(ctx, route, config.tick_rate());
  app.run().await?;

  tracing::info!("exiting");
  Ok(())
}
