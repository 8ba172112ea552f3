use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use scotify::{app::App, config::Config, logging, render::TerminalRenderer, Shared};

/// Show what is currently playing on spotify
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file, defaults to `scotify.yml` or `scotify.yaml`
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Spotify application client id
    #[arg(long)]
    client_id: Option<String>,
    /// Milliseconds between playback requests
    #[arg(short, long)]
    interval: Option<u64>,
    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if self.client_id.is_some() {
            config.client_id = self.client_id;
        }
        if let Some(interval) = self.interval {
            config.poll_interval_ms = interval;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_yaml(&std::fs::read_to_string(path)?)?,
        None => Config::load_with_fallback(["scotify.yml", "scotify.yaml"])?,
    };
    let config = args.apply(config.with_env()?);

    logging::init(config.log_file.as_deref())?;

    App::new(config, Shared::new(TerminalRenderer))?.run().await
}
