//! spotify-tray: desktop companion for the Spotify client.
//! - Finds the client window over X11 (`_NET_CLIENT_LIST` + `WM_CLASS`), launching the client when absent.
//! - Single instance by owning a well-known D-Bus name; a second launch forwards Raise/Toggle and exits.
//! - Keeps an MPRIS metadata snapshot that is replaced whole on every PropertiesChanged signal.
//!
//! Notes:
//! - Everything runs on one current-thread tokio runtime; subscriptions are polled by one event loop.
//! - No unsafe. Shared state is replaced wholesale, never patched field by field.

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

pub mod app;
pub mod config;
pub mod control;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod media;
pub mod metadata;
pub mod remote;
pub mod supervisor;
pub mod tray;
pub mod window;
