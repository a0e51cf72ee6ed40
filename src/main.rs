mod cache;
mod commands;
mod config;
mod gateway;
mod net;
mod request;
mod router;
mod strategy;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "appshell")]
#[command(about = "An offline-first caching gateway for documentation sites")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/appshell/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Resolve a URL through the caching rules and print the body
  Fetch {
    url: String,
    /// Treat the request as a navigation (eligible for the app shell)
    #[arg(long)]
    navigate: bool,
  },
  /// Show which rule a URL would hit, without touching cache or network
  Routes {
    url: String,
    /// Treat the request as a navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Validate the configuration
  Check,
  /// Inspect or clear the cache
  Cache {
    #[command(subcommand)]
    command: CacheCommand,
  },
  /// Fetch the app shell and configured paths from an origin into the cache
  Precache { origin: String },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Per-partition entry counts
  Stats,
  /// Drop one partition, or everything
  Clear { partition: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  init_tracing()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  match args.command {
    Command::Fetch { url, navigate } => commands::fetch(&config, &url, navigate).await,
    Command::Routes { url, navigate } => commands::routes(&config, &url, navigate),
    Command::Check => commands::check(&config),
    Command::Cache { command } => match command {
      CacheCommand::Stats => commands::cache_stats(&config),
      CacheCommand::Clear { partition } => commands::cache_clear(&config, partition.as_deref()),
    },
    Command::Precache { origin } => commands::precache(&config, &origin).await,
  }
}

/// Warnings to stderr, the full log to a file under the data directory.
fn init_tracing() -> Result<()> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("appshell");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let file_appender = tracing_appender::rolling::never(&log_dir, "appshell.log");

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("appshell=info")))
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time(),
    )
    .with(fmt::layer().with_writer(file_appender).with_ansi(false))
    .init();

  Ok(())
}
