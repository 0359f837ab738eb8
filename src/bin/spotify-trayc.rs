//! spotify-trayc: send one window command to a running spotify-tray.

use anyhow::{Context, Result};
use clap::Parser;
use spotify_tray::{control::WindowCommand, logging, remote};
use std::process::ExitCode;
use zbus::Connection;

#[derive(Debug, Parser)]
#[command(name = "spotify-trayc", version, about = "Remote control for spotify-tray")]
struct Cli {
    /// raise | hide | toggle
    command: WindowCommand,
}

async fn send(cmd: WindowCommand) -> Result<()> {
    let conn = Connection::session().await.context("dbus session")?;
    remote::invoke(&conn, remote::SERVICE_NAME, cmd)
        .await
        .with_context(|| format!("calling {cmd} on {}", remote::SERVICE_NAME))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init("warn");
    match send(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("spotify-trayc: {e:#}");
            ExitCode::FAILURE
        }
    }
}
