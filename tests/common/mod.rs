//! Bus fixtures shared by the integration tests.

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use spotify_tray::discovery::DiscoveryPolicy;
use zbus::dbus_interface;

/// Control endpoint that only counts what it was asked to do.
#[derive(Clone, Default)]
pub struct ControlCounter {
    raise: Arc<AtomicUsize>,
    hide: Arc<AtomicUsize>,
    toggle: Arc<AtomicUsize>,
}

impl ControlCounter {
    /// `(raise, hide, toggle)`
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.raise.load(Ordering::SeqCst),
            self.hide.load(Ordering::SeqCst),
            self.toggle.load(Ordering::SeqCst),
        )
    }
}

#[dbus_interface(name = "name.smetana.SpotifyTray")]
impl ControlCounter {
    fn raise_window(&self) {
        self.raise.fetch_add(1, Ordering::SeqCst);
    }

    fn hide_window(&self) {
        self.hide.fetch_add(1, Ordering::SeqCst);
    }

    fn toggle_window(&self) {
        self.toggle.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-process well-known name so parallel runs do not collide.
pub fn unique_name(tag: &str) -> String {
    format!("name.smetana.SpotifyTray.Test{}.{tag}", std::process::id())
}

pub fn quick_policy() -> DiscoveryPolicy {
    DiscoveryPolicy {
        attempts: 10,
        interval: Duration::from_millis(50),
    }
}
