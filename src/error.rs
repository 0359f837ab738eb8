//! Error types and the exit codes they map to.

use std::process::ExitCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("cannot connect to the X server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),
    #[error("X connection failed: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),
    #[error("X request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),
}

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("empty client command line")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("could not start the client: {0}")]
    Spawn(#[from] SpawnError),
    #[error("no '{class}' window after {attempts} attempts")]
    Exhausted { class: String, attempts: u32 },
}

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("D-Bus: {0}")]
    Bus(#[from] zbus::Error),
    #[error("object path {0} is already registered")]
    AlreadyRegistered(&'static str),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("service {0} is not on the bus")]
    ServiceAbsent(String),
    #[error("D-Bus: {0}")]
    Bus(#[from] zbus::Error),
    #[error("D-Bus daemon: {0}")]
    Daemon(#[from] zbus::fdo::Error),
}

/// Fatal outcomes of a run; each maps to its own exit code.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("window system unavailable: {0}")]
    WindowSystem(#[from] WindowError),
    #[error("client discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("media interface unavailable: {0}")]
    Media(#[from] MediaError),
    #[error("control service unavailable: {0}")]
    Service(#[from] GuardError),
    #[error("lost ownership of {0}")]
    OwnershipLost(String),
    #[error("bad configuration: {0:#}")]
    Config(anyhow::Error),
}

impl StartupError {
    pub const fn code(&self) -> u8 {
        match self {
            Self::WindowSystem(_) | Self::Discovery(_) => 1,
            Self::Media(_) => 2,
            Self::Service(_) => 3,
            Self::OwnershipLost(_) => 4,
            Self::Config(_) => 5,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
