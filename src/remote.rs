//! Single-instance guard and the window remote-control endpoint.
//!
//! The first instance owns `name.smetana.SpotifyTray` (requested with DoNotQueue) and serves
//! RaiseWindow/HideWindow/ToggleWindow. Later instances find the name taken, forward one
//! command to the owner and exit.

use futures_util::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use zbus::{
    dbus_interface, dbus_proxy,
    fdo::{self, DBusProxy, NameLostStream, RequestNameFlags, RequestNameReply},
    Connection,
};

use crate::{control::WindowCommand, discovery::DiscoveryPolicy, error::GuardError, window::WindowHandle};

pub const SERVICE_NAME: &str = "name.smetana.SpotifyTray";
pub const OBJECT_PATH: &str = "/name/smetana/SpotifyTray";

#[dbus_proxy(
    interface = "name.smetana.SpotifyTray",
    default_service = "name.smetana.SpotifyTray",
    default_path = "/name/smetana/SpotifyTray"
)]
trait SpotifyTray {
    fn raise_window(&self) -> zbus::Result<()>;
    fn hide_window(&self) -> zbus::Result<()>;
    fn toggle_window(&self) -> zbus::Result<()>;
}

// ------------------------- Server -------------------------

/// Method table bound to the discovered window. Every call gets an empty reply.
pub struct ControlService {
    window: WindowHandle,
}

impl ControlService {
    pub fn new(window: WindowHandle) -> Self {
        Self { window }
    }

    fn handle(&self, cmd: WindowCommand) {
        match self.window.apply(cmd) {
            Ok(changed) => debug!(event = "control.handled", method = cmd.method(), changed = changed),
            Err(e) => warn!(event = "control.window_failed", method = cmd.method(), error = %e),
        }
    }
}

#[dbus_interface(name = "name.smetana.SpotifyTray")]
impl ControlService {
    fn raise_window(&self) {
        self.handle(WindowCommand::Raise);
    }

    fn hide_window(&self) {
        self.handle(WindowCommand::Hide);
    }

    fn toggle_window(&self) {
        self.handle(WindowCommand::Toggle);
    }
}

/// The registered control endpoint; unregister on teardown.
pub struct RemoteControlServer {
    conn: Connection,
}

impl RemoteControlServer {
    pub async fn register(conn: &Connection, window: WindowHandle) -> Result<Self, GuardError> {
        if !conn.object_server().at(OBJECT_PATH, ControlService::new(window)).await? {
            return Err(GuardError::AlreadyRegistered(OBJECT_PATH));
        }
        info!(event = "control.registered", path = OBJECT_PATH);
        Ok(Self { conn: conn.clone() })
    }

    pub async fn unregister(self) {
        match self.conn.object_server().remove::<ControlService, _>(OBJECT_PATH).await {
            Ok(_) => debug!(event = "control.unregistered", path = OBJECT_PATH),
            Err(e) => warn!(event = "control.unregister_failed", error = %e),
        }
    }
}

// ------------------------- Ownership -------------------------

/// Held bus name. Releasing is explicit because it needs a bus round trip.
pub struct InstanceGuard {
    conn: Connection,
    name: String,
    lost: NameLostStream<'static>,
}

pub enum Ownership {
    Owner(InstanceGuard),
    Client,
}

/// `true` when the reply makes us the primary owner. A taken name is not an error.
fn owns_name(reply: zbus::Result<RequestNameReply>) -> Result<bool, GuardError> {
    match reply {
        Ok(RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner) => Ok(true),
        Ok(_) | Err(zbus::Error::NameTaken) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Claims `name` without queueing; if someone else holds it, forwards `delegate` to them.
///
/// An owner still discovering its window has no endpoint yet; the call is repeated on
/// `patience` until the endpoint appears.
pub async fn acquire_or_delegate(
    conn: &Connection,
    name: &str,
    delegate: WindowCommand,
    patience: DiscoveryPolicy,
) -> Result<Ownership, GuardError> {
    // Subscribe first so a loss right after acquisition is not missed.
    let lost = DBusProxy::new(conn).await?.receive_name_lost().await?;
    let reply = conn.request_name_with_flags(name, RequestNameFlags::DoNotQueue.into()).await;
    if owns_name(reply)? {
        info!(event = "instance.owner", name = name);
        // Answer calls from now on; until the endpoint is registered they get UnknownObject.
        let _ = conn.object_server();
        return Ok(Ownership::Owner(InstanceGuard {
            conn: conn.clone(),
            name: name.to_owned(),
            lost,
        }));
    }

    info!(event = "instance.delegate", name = name, method = delegate.method());
    if let Err(e) = invoke_when_ready(conn, name, delegate, patience).await {
        error!(event = "instance.delegate_failed", name = name, method = delegate.method(), error = %e);
    }
    Ok(Ownership::Client)
}

/// The owner holds the name but has not registered the control object yet.
fn endpoint_missing(err: &zbus::Error) -> bool {
    const MISSING: [&str; 3] = [
        "org.freedesktop.DBus.Error.UnknownObject",
        "org.freedesktop.DBus.Error.UnknownInterface",
        "org.freedesktop.DBus.Error.UnknownMethod",
    ];
    match err {
        zbus::Error::MethodError(name, ..) => MISSING.contains(&name.as_str()),
        zbus::Error::FDO(e) => matches!(
            **e,
            fdo::Error::UnknownObject(_) | fdo::Error::UnknownInterface(_) | fdo::Error::UnknownMethod(_)
        ),
        _ => false,
    }
}

/// A missing endpoint means the call was not delivered, so repeating it still delivers one command.
async fn invoke_when_ready(
    conn: &Connection,
    name: &str,
    cmd: WindowCommand,
    patience: DiscoveryPolicy,
) -> zbus::Result<()> {
    let mut waited = 0;
    loop {
        match invoke(conn, name, cmd).await {
            Err(e) if endpoint_missing(&e) && waited < patience.attempts => {
                waited += 1;
                debug!(event = "instance.owner_starting", name = name, attempt = waited);
                sleep(patience.interval).await;
            }
            other => return other,
        }
    }
}

/// Calls one control method on the instance owning `name`.
pub async fn invoke(conn: &Connection, name: &str, cmd: WindowCommand) -> zbus::Result<()> {
    let proxy = SpotifyTrayProxy::builder(conn).destination(name.to_owned())?.build().await?;
    match cmd {
        WindowCommand::Raise => proxy.raise_window().await,
        WindowCommand::Hide => proxy.hide_window().await,
        WindowCommand::Toggle => proxy.toggle_window().await,
    }
}

impl InstanceGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves when the bus takes the name away or the connection goes down.
    pub async fn lost(&mut self) {
        while let Some(signal) = self.lost.next().await {
            match signal.args() {
                Ok(args) if args.name().as_str() == self.name => return,
                Ok(_) => {}
                Err(e) => debug!(event = "instance.bad_name_lost", error = %e),
            }
        }
    }

    pub async fn release(self) {
        match self.conn.release_name(self.name.as_str()).await {
            Ok(released) => debug!(event = "instance.released", name = %self.name, released = released),
            Err(e) => warn!(event = "instance.release_failed", name = %self.name, error = %e),
        }
    }
}
