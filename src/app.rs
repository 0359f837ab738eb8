//! Startup sequence and the owner's event loop.

use futures_util::StreamExt;
use std::{future::pending, process::ExitStatus, sync::Arc};
use tokio::{
    signal::unix::{signal, Signal, SignalKind},
    sync::{mpsc, oneshot},
};
use tracing::{error, info, warn};
use zbus::Connection;

use crate::{
    config::Config,
    control::WindowCommand,
    discovery::{self, Discovered},
    error::{GuardError, StartupError, WindowError},
    media::{self, MediaProxy},
    remote::{self, InstanceGuard, Ownership, RemoteControlServer},
    supervisor::{ProcessSupervisor, Spawner},
    tray::{self, TrayEvent, TrayHandle},
    window::{self, WindowHandle, WindowSystem, X11WindowSystem},
};

/// Why the owner left its event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Signal,
    ClientExited,
    Quit,
}

/// Window system and launcher the owner works against.
pub trait Desktop {
    fn window_system(&mut self) -> Result<Arc<dyn WindowSystem>, WindowError>;
    fn spawner(&mut self) -> &mut dyn Spawner;
}

/// The real X11 display and process launcher.
#[derive(Debug, Default)]
pub struct X11Desktop {
    supervisor: ProcessSupervisor,
}

impl Desktop for X11Desktop {
    fn window_system(&mut self) -> Result<Arc<dyn WindowSystem>, WindowError> {
        Ok(Arc::new(X11WindowSystem::connect()?))
    }

    fn spawner(&mut self) -> &mut dyn Spawner {
        &mut self.supervisor
    }
}

/// Owner or delegate, depending on who holds the service name.
///
/// `Ok` covers both a finished owner run and a delegated command.
pub async fn run(config: &Config, toggle: bool) -> Result<(), StartupError> {
    let conn = Connection::session().await.map_err(GuardError::from)?;
    run_on(&conn, remote::SERVICE_NAME, config, toggle, &mut X11Desktop::default()).await
}

/// [`run`] on an existing connection, claiming `service_name`.
pub async fn run_on<D: Desktop>(
    conn: &Connection,
    service_name: &str,
    config: &Config,
    toggle: bool,
    desktop: &mut D,
) -> Result<(), StartupError> {
    let delegate = WindowCommand::delegated(toggle);
    let patience = config.discovery_policy();
    let mut guard = match remote::acquire_or_delegate(conn, service_name, delegate, patience).await? {
        Ownership::Client => return Ok(()),
        Ownership::Owner(guard) => guard,
    };

    let outcome = run_owner(conn, &mut guard, config, desktop).await;
    guard.release().await;
    let reason = outcome?;
    info!(event = "app.shutdown", reason = ?reason);
    Ok(())
}

async fn run_owner<D: Desktop>(
    conn: &Connection,
    guard: &mut InstanceGuard,
    config: &Config,
    desktop: &mut D,
) -> Result<Shutdown, StartupError> {
    let system = desktop.window_system()?;
    let Discovered { window, process } = discovery::discover(
        |class| window::locate(&system, class),
        desktop.spawner(),
        &config.client.window_class,
        &config.client_argv(),
        config.discovery_policy(),
    )
    .await?;

    let (media, changes) = MediaProxy::connect(conn, &config.media.bus_name, media::OBJECT_PATH).await?;
    let server = RemoteControlServer::register(conn, window.clone()).await?;

    let outcome = event_loop(
        guard,
        &window,
        &media,
        changes,
        process.map(|p| p.exited),
        config,
    )
    .await;

    server.unregister().await;
    outcome
}

async fn event_loop(
    guard: &mut InstanceGuard,
    window: &WindowHandle,
    media: &MediaProxy<media::ZbusPlayer>,
    mut changes: zbus::fdo::PropertiesChangedStream<'static>,
    mut client_exit: Option<oneshot::Receiver<Option<ExitStatus>>>,
    config: &Config,
) -> Result<Shutdown, StartupError> {
    let (tx, mut tray_events) = mpsc::unbounded_channel();
    let tray = config
        .tray
        .enabled
        .then(|| TrayHandle::spawn(tray::pick_icon(&config.tray.icon_names, &tray::icon_dirs()), tx));
    let mut metadata = media.subscribe();
    if let Some(t) = &tray {
        t.show_metadata(&media.snapshot());
    }
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| warn!(event = "app.no_sigint", error = %e)).ok();
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| warn!(event = "app.no_sigterm", error = %e)).ok();

    info!(event = "app.ready", window = window.id(), pid = window.pid());
    let outcome = loop {
        tokio::select! {
            Some(event) = tray_events.recv() => match event {
                TrayEvent::Window(cmd) => {
                    if let Err(e) = window.apply(cmd) {
                        warn!(event = "app.window_failed", method = cmd.method(), error = %e);
                    }
                }
                TrayEvent::Media(cmd) => media.send(cmd).await,
                TrayEvent::Quit => {
                    if let Err(e) = window.destroy() {
                        warn!(event = "app.destroy_failed", error = %e);
                    }
                    break Ok(Shutdown::Quit);
                }
            },
            Some(_) = changes.next() => {
                media.refresh().await;
            }
            Ok(()) = metadata.changed() => {
                let snapshot = Arc::clone(&metadata.borrow_and_update());
                if let Some(t) = &tray {
                    t.show_metadata(&snapshot);
                }
            }
            status = exited(&mut client_exit) => {
                info!(event = "app.client_exited", status = ?status);
                break Ok(Shutdown::ClientExited);
            }
            () = guard.lost() => {
                error!(event = "app.ownership_lost", name = guard.name());
                break Err(StartupError::OwnershipLost(guard.name().to_owned()));
            }
            () = received(&mut sigint) => break Ok(Shutdown::Signal),
            () = received(&mut sigterm) => break Ok(Shutdown::Signal),
        }
    };

    if let Some(t) = tray {
        t.shutdown();
    }
    outcome
}

async fn exited(rx: &mut Option<oneshot::Receiver<Option<ExitStatus>>>) -> Option<ExitStatus> {
    match rx {
        Some(r) => r.await.ok().flatten(),
        None => pending().await,
    }
}

async fn received(sig: &mut Option<Signal>) {
    match sig {
        Some(s) => {
            s.recv().await;
        }
        None => pending().await,
    }
}
