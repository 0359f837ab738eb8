use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::discovery::DiscoveryPolicy;

// ------------------------- Config -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: Client,
    #[serde(default)]
    pub discovery: Discovery,
    #[serde(default)]
    pub media: Media,
    #[serde(default)]
    pub tray: Tray,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Deserialize)]
pub struct Client {
    #[serde(default = "default_client_path")]
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_window_class")]
    pub window_class: String,
}
fn default_client_path() -> String {
    "spotify".into()
}
fn default_window_class() -> String {
    "spotify".into()
}
impl Default for Client {
    fn default() -> Self {
        Self {
            path: default_client_path(),
            args: vec![],
            window_class: default_window_class(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Discovery {
    #[serde(default = "d5")]
    pub attempts: u32,
    #[serde(default = "d500")]
    pub interval_ms: u64,
}
fn d5() -> u32 {
    5
}
fn d500() -> u64 {
    500
}
impl Default for Discovery {
    fn default() -> Self {
        Self {
            attempts: d5(),
            interval_ms: d500(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Media {
    #[serde(default = "default_bus_name")]
    pub bus_name: String,
}
fn default_bus_name() -> String {
    "org.mpris.MediaPlayer2.spotify".into()
}
impl Default for Media {
    fn default() -> Self {
        Self {
            bus_name: default_bus_name(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Tray {
    #[serde(default = "dtrue")]
    pub enabled: bool,
    /// Tried in order; the first one the icon theme has wins.
    #[serde(default = "default_icons")]
    pub icon_names: Vec<String>,
}
fn dtrue() -> bool {
    true
}
fn default_icons() -> Vec<String> {
    vec!["spotify-indicator".into(), "spotify".into(), "spotify-client".into()]
}
impl Default for Tray {
    fn default() -> Self {
        Self {
            enabled: true,
            icon_names: default_icons(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    #[serde(default = "default_level")]
    pub level: String,
}
fn default_level() -> String {
    "warn".into()
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

// ------------------------- Config I/O -------------------------

/// `$XDG_CONFIG_HOME/spotify-tray/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spotify-tray").join("config.toml"))
}

impl Config {
    /// Reads the config file; a missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading config {}", path.display())),
        };
        let cfg: Self = toml::from_str(&text).context("parsing toml")?;
        Ok(cfg)
    }

    /// Executable followed by its pass-through arguments.
    pub fn client_argv(&self) -> Vec<String> {
        std::iter::once(self.client.path.clone())
            .chain(self.client.args.iter().cloned())
            .collect()
    }

    pub fn discovery_policy(&self) -> DiscoveryPolicy {
        DiscoveryPolicy {
            attempts: self.discovery.attempts,
            interval: Duration::from_millis(self.discovery.interval_ms),
        }
    }
}
