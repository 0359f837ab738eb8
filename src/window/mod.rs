//! Client window lookup and the handle the control surface drives.

use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use crate::{control::WindowCommand, error::WindowError};

mod x11;

pub use x11::X11WindowSystem;

/// Native top-level window id.
pub type WindowId = u32;

/// Capability interface over the windowing system; one implementation per backend.
pub trait WindowSystem: Send + Sync {
    /// Top-level windows in window-manager order.
    fn client_list(&self) -> Result<Vec<WindowId>, WindowError>;
    /// Class name of `window`, `None` when the property is absent.
    fn class_name(&self, window: WindowId) -> Result<Option<String>, WindowError>;
    /// Creating process id, `None` when the property is absent.
    fn pid(&self, window: WindowId) -> Result<Option<u32>, WindowError>;
    fn is_visible(&self, window: WindowId) -> Result<bool, WindowError>;
    fn show(&self, window: WindowId) -> Result<(), WindowError>;
    fn hide(&self, window: WindowId) -> Result<(), WindowError>;
    fn destroy(&self, window: WindowId) -> Result<(), WindowError>;
}

/// The discovered client window. Cloning shares the same backend.
#[derive(Clone)]
pub struct WindowHandle {
    id: WindowId,
    pid: u32,
    system: Arc<dyn WindowSystem>,
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle")
            .field("id", &format_args!("{:#x}", self.id))
            .field("pid", &self.pid)
            .finish()
    }
}

impl WindowHandle {
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Owning process id; 0 means unknown and is never signalled.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_visible(&self) -> Result<bool, WindowError> {
        self.system.is_visible(self.id)
    }

    /// Applies `cmd`; returns whether visibility changed.
    pub fn apply(&self, cmd: WindowCommand) -> Result<bool, WindowError> {
        let visible = self.system.is_visible(self.id)?;
        match (cmd, visible) {
            (WindowCommand::Raise | WindowCommand::Toggle, false) => {
                self.system.show(self.id)?;
                Ok(true)
            }
            (WindowCommand::Hide | WindowCommand::Toggle, true) => {
                self.system.hide(self.id)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn destroy(&self) -> Result<(), WindowError> {
        self.system.destroy(self.id)
    }
}

/// Finds the first window whose class name equals `target` exactly.
///
/// Windows without a readable class are skipped; a failed list read counts as "not found".
pub fn locate(system: &Arc<dyn WindowSystem>, target: &str) -> Option<WindowHandle> {
    let windows = match system.client_list() {
        Ok(w) => w,
        Err(e) => {
            warn!(event = "window.list_failed", error = %e);
            return None;
        }
    };
    let id = windows.into_iter().find(|&w| match system.class_name(w) {
        Ok(Some(class)) => class == target,
        Ok(None) => false,
        Err(e) => {
            debug!(event = "window.class_unreadable", window = w, error = %e);
            false
        }
    })?;
    let pid = system.pid(id).ok().flatten().unwrap_or(0);
    debug!(event = "window.located", window = id, pid = pid, class = target);
    Some(WindowHandle {
        id,
        pid,
        system: Arc::clone(system),
    })
}
