//! Client process launch and asynchronous reaping.

use std::process::{ExitStatus, Stdio};
use tokio::{process::Command, sync::oneshot, task};
use tracing::{info, warn};

use crate::error::SpawnError;

/// A launched client; `exited` resolves once the reaper collected its status.
#[derive(Debug)]
pub struct ClientProcess {
    pub pid: Option<u32>,
    pub exited: oneshot::Receiver<Option<ExitStatus>>,
}

/// Seam for launching the client.
pub trait Spawner {
    fn spawn(&mut self, argv: &[String]) -> Result<ClientProcess, SpawnError>;
}

/// Launches through `$PATH` with the inherited environment; never waits inline.
#[derive(Debug, Default)]
pub struct ProcessSupervisor;

impl Spawner for ProcessSupervisor {
    fn spawn(&mut self, argv: &[String]) -> Result<ClientProcess, SpawnError> {
        let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SpawnError::Io {
                program: program.clone(),
                source,
            })?;
        let pid = child.id();
        info!(event = "client.spawned", program = %program, pid = ?pid);

        let (tx, rx) = oneshot::channel();
        task::spawn(async move {
            let status = match child.wait().await {
                Ok(s) => {
                    info!(event = "client.exited", pid = ?pid, status = %s);
                    Some(s)
                }
                Err(e) => {
                    warn!(event = "client.wait_failed", pid = ?pid, error = %e);
                    None
                }
            };
            let _ = tx.send(status);
        });

        Ok(ClientProcess { pid, exited: rx })
    }
}
