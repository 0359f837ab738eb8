//! Stateless control commands for the window and media surfaces.

use std::fmt;

/// Commands accepted by the remote-control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    Raise,
    Hide,
    Toggle,
}

impl WindowCommand {
    /// D-Bus method name on the control interface.
    pub const fn method(self) -> &'static str {
        match self {
            Self::Raise => "RaiseWindow",
            Self::Hide => "HideWindow",
            Self::Toggle => "ToggleWindow",
        }
    }

    /// Command a delegating instance forwards to the owner.
    pub const fn delegated(toggle: bool) -> Self {
        if toggle {
            Self::Toggle
        } else {
            Self::Raise
        }
    }
}

impl fmt::Display for WindowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl std::str::FromStr for WindowCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raise" => Ok(Self::Raise),
            "hide" => Ok(Self::Hide),
            "toggle" => Ok(Self::Toggle),
            other => Err(format!("unknown window command: {other}")),
        }
    }
}

/// Playback commands sent to the player's MPRIS interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCommand {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Stop,
}

impl MediaCommand {
    pub const fn method(self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Pause => "Pause",
            Self::PlayPause => "PlayPause",
            Self::Next => "Next",
            Self::Previous => "Previous",
            Self::Stop => "Stop",
        }
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_picks_toggle_only_when_requested() {
        assert_eq!(WindowCommand::delegated(true), WindowCommand::Toggle);
        assert_eq!(WindowCommand::delegated(false), WindowCommand::Raise);
    }

    #[test]
    fn window_methods_match_the_bus_interface() {
        assert_eq!(WindowCommand::Raise.method(), "RaiseWindow");
        assert_eq!(WindowCommand::Hide.method(), "HideWindow");
        assert_eq!(WindowCommand::Toggle.method(), "ToggleWindow");
    }

    #[test]
    fn parses_cli_words() {
        assert_eq!("toggle".parse::<WindowCommand>(), Ok(WindowCommand::Toggle));
        assert!("Toggle".parse::<WindowCommand>().is_err());
    }
}
