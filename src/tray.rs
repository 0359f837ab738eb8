//! StatusNotifierItem front end. It only turns clicks into commands and shows the snapshot.

use ksni::{menu::StandardItem, MenuItem, Status, ToolTip, Tray, TrayService};
use std::{
    env, fs,
    path::{Path, PathBuf},
    thread,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::{
    control::{MediaCommand, WindowCommand},
    metadata::Metadata,
};

const TRAY_ID: &str = "spotify-tray";
const TRAY_TITLE: &str = "Spotify";

/// What the tray asks the event loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    Window(WindowCommand),
    Media(MediaCommand),
    Quit,
}

pub struct SpotifyTray {
    events: UnboundedSender<TrayEvent>,
    icon_name: String,
    tooltip: Option<(String, String)>,
}

impl SpotifyTray {
    pub fn new(icon_name: String, events: UnboundedSender<TrayEvent>) -> Self {
        Self {
            events,
            icon_name,
            tooltip: None,
        }
    }

    fn emit(&self, event: TrayEvent) {
        if self.events.send(event).is_err() {
            warn!(event = "tray.loop_gone", request = ?event);
        }
    }

    fn media_item(label: &str, icon: &str, cmd: MediaCommand) -> MenuItem<Self> {
        MenuItem::Standard(StandardItem {
            label: label.to_string(),
            icon_name: icon.to_string(),
            activate: Box::new(move |this: &mut Self| this.emit(TrayEvent::Media(cmd))),
            ..StandardItem::default()
        })
    }
}

/// Wheel up goes forward.
fn scroll_command(delta: i32) -> Option<MediaCommand> {
    match delta.signum() {
        -1 => Some(MediaCommand::Next),
        1 => Some(MediaCommand::Previous),
        _ => None,
    }
}

impl Tray for SpotifyTray {
    fn id(&self) -> String {
        TRAY_ID.to_string()
    }

    fn title(&self) -> String {
        TRAY_TITLE.to_string()
    }

    fn status(&self) -> Status {
        Status::Active
    }

    fn icon_name(&self) -> String {
        self.icon_name.clone()
    }

    fn tool_tip(&self) -> ToolTip {
        match &self.tooltip {
            Some((title, description)) => ToolTip {
                title: title.clone(),
                description: description.clone(),
                ..ToolTip::default()
            },
            None => ToolTip::default(),
        }
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.emit(TrayEvent::Window(WindowCommand::Toggle));
    }

    fn secondary_activate(&mut self, _x: i32, _y: i32) {
        self.emit(TrayEvent::Media(MediaCommand::PlayPause));
    }

    fn scroll(&mut self, delta: i32, orientation: &str) {
        if !orientation.eq_ignore_ascii_case("vertical") {
            return;
        }
        if let Some(cmd) = scroll_command(delta) {
            self.emit(TrayEvent::Media(cmd));
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        vec![
            Self::media_item("Play", "media-playback-start", MediaCommand::Play),
            Self::media_item("Pause", "media-playback-pause", MediaCommand::Pause),
            Self::media_item("Stop", "media-playback-stop", MediaCommand::Stop),
            Self::media_item("Next", "media-skip-forward", MediaCommand::Next),
            Self::media_item("Previous", "media-skip-backward", MediaCommand::Previous),
            MenuItem::Separator,
            MenuItem::Standard(StandardItem {
                label: "Quit".to_string(),
                icon_name: "application-exit".to_string(),
                activate: Box::new(|this: &mut Self| this.emit(TrayEvent::Quit)),
                ..StandardItem::default()
            }),
        ]
    }
}

// ------------------------- Icon lookup -------------------------

const ICON_EXTENSIONS: [&str; 3] = ["png", "svg", "xpm"];
/// `icons/<theme>/<size>/<context>/<name>.png`
const ICON_DEPTH: u8 = 3;

/// Icon theme roots: the user's, then `$XDG_DATA_DIRS`, then pixmaps.
pub fn icon_dirs() -> Vec<PathBuf> {
    let data_dirs = env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".into());
    let system: Vec<PathBuf> = env::split_paths(&data_dirs).collect();

    let mut roots = vec![];
    roots.extend(dirs::data_dir().map(|d| d.join("icons")));
    roots.extend(dirs::home_dir().map(|d| d.join(".icons")));
    roots.extend(system.iter().map(|d| d.join("icons")));
    roots.extend(system.iter().map(|d| d.join("pixmaps")));
    roots
}

/// First of `names` installed under any of `roots`; the last name when none is.
pub fn pick_icon(names: &[String], roots: &[PathBuf]) -> String {
    let found = names
        .iter()
        .find(|name| roots.iter().any(|root| has_icon(root, name, ICON_DEPTH)));
    match found.or(names.last()) {
        Some(name) => {
            info!(event = "tray.icon", name = %name, installed = found.is_some());
            name.clone()
        }
        None => String::new(),
    }
}

fn has_icon(dir: &Path, name: &str, depth: u8) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            return depth > 0 && has_icon(&path, name, depth - 1);
        }
        path.file_stem().is_some_and(|s| s == name)
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| ICON_EXTENSIONS.contains(&e))
    })
}

// ------------------------- Service -------------------------

/// Running indicator; the service lives on its own thread.
pub struct TrayHandle {
    handle: ksni::Handle<SpotifyTray>,
}

impl TrayHandle {
    pub fn spawn(icon_name: String, events: UnboundedSender<TrayEvent>) -> Self {
        let service = TrayService::new(SpotifyTray::new(icon_name, events));
        let handle = service.handle();
        thread::spawn(move || match service.run() {
            Ok(()) => info!(event = "tray.stopped"),
            Err(e) => warn!(event = "tray.failed", error = %e),
        });
        Self { handle }
    }

    pub fn show_metadata(&self, md: &Metadata) {
        let tooltip = md.tooltip();
        self.handle.update(move |tray| tray.tooltip = tooltip);
    }

    pub fn shutdown(&self) {
        self.handle.shutdown();
    }
}
