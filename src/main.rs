//! spotify-tray: keeps the Spotify client one click away.
//! - First instance: find or launch the client, own the control name, follow MPRIS metadata.
//! - Later instances: forward RaiseWindow (or ToggleWindow with --toggle) to the first and exit.

#![deny(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use spotify_tray::{app, config::Config, error::StartupError, logging};
use std::{path::PathBuf, process::ExitCode};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "spotify-tray", version, about = "System tray companion for the Spotify client")]
struct Cli {
    /// Path to the Spotify client application (default "spotify").
    #[arg(short = 'c', long, value_name = "PATH")]
    client_path: Option<String>,

    /// Toggle the client window of an already running instance instead of raising it.
    #[arg(short = 't', long)]
    toggle: bool,

    /// Config file (default $XDG_CONFIG_HOME/spotify-tray/config.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn load(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.client_path {
        cfg.client.path.clone_from(path);
    }
    Ok(cfg)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = match load(&cli) {
        Ok(c) => c,
        Err(e) => {
            let e = StartupError::Config(e);
            eprintln!("spotify-tray: {e}");
            return e.exit_code();
        }
    };
    logging::init(&cfg.logging.level);

    match app::run(&cfg, cli.toggle).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "app.fatal", code = e.code(), error = %e);
            e.exit_code()
        }
    }
}
