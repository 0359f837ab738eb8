//! Immutable MPRIS metadata snapshot.

use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Value};

/// One complete `Metadata` property value. Replaced as a unit, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub track_id: String,
    pub art_url: Option<String>,
    pub album: String,
    pub title: String,
    pub track_url: String,
    /// Microseconds, as reported by the player.
    pub length: u64,
    pub track_number: i32,
    pub disc_number: i32,
    pub artists: Vec<String>,
    pub album_artists: Vec<String>,
}

// Nested variants ("v" inside "v") show up from some players.
fn peel<'a, 'v>(v: &'a Value<'v>) -> &'a Value<'v> {
    match v {
        Value::Value(inner) => peel(inner),
        other => other,
    }
}

fn as_string(v: &Value<'_>) -> Option<String> {
    match peel(v) {
        Value::Str(s) => Some(s.as_str().to_string()),
        Value::ObjectPath(p) => Some(p.as_str().to_string()),
        _ => None,
    }
}

fn as_u64(v: &Value<'_>) -> Option<u64> {
    match *peel(v) {
        Value::U64(n) => Some(n),
        Value::I64(n) => u64::try_from(n).ok(),
        Value::U32(n) => Some(u64::from(n)),
        Value::I32(n) => u64::try_from(n).ok(),
        _ => None,
    }
}

fn as_i32(v: &Value<'_>) -> Option<i32> {
    match *peel(v) {
        Value::I32(n) => Some(n),
        Value::U32(n) => i32::try_from(n).ok(),
        Value::I64(n) => i32::try_from(n).ok(),
        _ => None,
    }
}

fn as_strings(v: &Value<'_>) -> Vec<String> {
    match peel(v) {
        Value::Array(a) => a.get().iter().filter_map(as_string).collect(),
        other => as_string(other).into_iter().collect(),
    }
}

impl Metadata {
    /// Builds a snapshot from `(key, value)` pairs; unknown keys are ignored, missing ones stay empty.
    pub fn from_entries<'a, 'v: 'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value<'v>)>,
    {
        let mut md = Self::default();
        for (key, value) in entries {
            match key {
                "mpris:trackid" => md.track_id = as_string(value).unwrap_or_default(),
                "mpris:artUrl" => md.art_url = as_string(value).filter(|s| !s.is_empty()),
                "mpris:length" => md.length = as_u64(value).unwrap_or_default(),
                "xesam:album" => md.album = as_string(value).unwrap_or_default(),
                "xesam:title" => md.title = as_string(value).unwrap_or_default(),
                "xesam:url" => md.track_url = as_string(value).unwrap_or_default(),
                "xesam:trackNumber" => md.track_number = as_i32(value).unwrap_or_default(),
                "xesam:discNumber" => md.disc_number = as_i32(value).unwrap_or_default(),
                "xesam:artist" => md.artists = as_strings(value),
                "xesam:albumArtist" => md.album_artists = as_strings(value),
                _ => {}
            }
        }
        md
    }

    pub fn from_map(map: &HashMap<String, OwnedValue>) -> Self {
        Self::from_entries(map.iter().map(|(k, v)| (k.as_str(), &**v)))
    }

    /// True until the first successful fetch.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `(heading, body)` for a tray tooltip; `None` means "no data yet".
    ///
    /// Only the body is rendered as markup, so only the body is escaped.
    pub fn tooltip(&self) -> Option<(String, String)> {
        if self.is_empty() {
            return None;
        }
        let artists = if self.album_artists.is_empty() {
            &self.artists
        } else {
            &self.album_artists
        };
        let body = match (artists.is_empty(), self.album.is_empty()) {
            (false, false) => format!("{} - {}", artists.join(", "), self.album),
            (false, true) => artists.join(", "),
            (true, false) => self.album.clone(),
            (true, true) => String::new(),
        };
        Some((self.title.clone(), markup_escape(&body)))
    }
}

fn markup_escape(s: &str) -> String {
    // & first, then the rest
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}
