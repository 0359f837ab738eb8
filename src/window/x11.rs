// X11 backend: EWMH client list, ICCCM WM_CLASS, _NET_WM_PID.

use x11rb::{
    connection::Connection,
    protocol::xproto::{
        AtomEnum, ConfigureWindowAux, ConnectionExt, EventMask, MapState, StackMode, UnmapNotifyEvent, Window,
        UNMAP_NOTIFY_EVENT,
    },
    rust_connection::RustConnection,
};

use super::{WindowId, WindowSystem};
use crate::error::WindowError;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _NET_WM_PID,
    }
}

pub struct X11WindowSystem {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl X11WindowSystem {
    /// Connects to `$DISPLAY`.
    pub fn connect() -> Result<Self, WindowError> {
        let (conn, screen) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen].root;
        let atoms = Atoms::new(&conn)?.reply()?;
        Ok(Self { conn, root, atoms })
    }
}

/// First NUL-terminated component of a WM_CLASS value ("spotify\0Spotify\0" -> "spotify").
fn class_component(raw: &[u8]) -> Option<String> {
    let first = raw.split(|&b| b == 0).next()?;
    if first.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(first).into_owned())
}

impl WindowSystem for X11WindowSystem {
    fn client_list(&self) -> Result<Vec<WindowId>, WindowError> {
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW, 0, u32::MAX)?
            .reply()?;
        Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
    }

    fn class_name(&self, window: WindowId) -> Result<Option<String>, WindowError> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)?
            .reply()?;
        Ok(class_component(&reply.value))
    }

    fn pid(&self, window: WindowId) -> Result<Option<u32>, WindowError> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms._NET_WM_PID, AtomEnum::CARDINAL, 0, 1)?
            .reply()?;
        Ok(reply.value32().and_then(|mut v| v.next()))
    }

    fn is_visible(&self, window: WindowId) -> Result<bool, WindowError> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        Ok(attrs.map_state == MapState::VIEWABLE)
    }

    fn show(&self, window: WindowId) -> Result<(), WindowError> {
        self.conn.map_window(window)?;
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        self.conn.flush()?;
        Ok(())
    }

    fn hide(&self, window: WindowId) -> Result<(), WindowError> {
        // ICCCM withdraw: unmap plus a synthetic UnmapNotify to the root.
        self.conn.unmap_window(window)?;
        let event = UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 0,
            event: self.root,
            window,
            from_configure: false,
        };
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn destroy(&self, window: WindowId) -> Result<(), WindowError> {
        self.conn.destroy_window(window)?;
        self.conn.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::class_component;

    #[test]
    fn takes_instance_part_of_wm_class() {
        assert_eq!(class_component(b"spotify\0Spotify\0").as_deref(), Some("spotify"));
        assert_eq!(class_component(b"kitty\0").as_deref(), Some("kitty"));
        assert_eq!(class_component(b""), None);
        assert_eq!(class_component(b"\0Spotify\0"), None);
    }
}
