//! MPRIS player proxy with a wholesale-replaced metadata cache.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zbus::{
    dbus_proxy,
    fdo::{DBusProxy, PropertiesChangedStream, PropertiesProxy},
    names::BusName,
    zvariant::OwnedValue,
    CacheProperties, Connection,
};

use crate::{control::MediaCommand, error::MediaError, metadata::Metadata};

pub const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

#[dbus_proxy(interface = "org.mpris.MediaPlayer2.Player", default_path = "/org/mpris/MediaPlayer2")]
trait Player {
    fn play(&self) -> zbus::Result<()>;
    fn pause(&self) -> zbus::Result<()>;
    fn play_pause(&self) -> zbus::Result<()>;
    fn next(&self) -> zbus::Result<()>;
    fn previous(&self) -> zbus::Result<()>;
    fn stop(&self) -> zbus::Result<()>;

    #[dbus_proxy(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Remote side of the player: full metadata reads and zero-argument calls.
#[allow(async_fn_in_trait)]
pub trait PlayerBackend {
    async fn fetch_metadata(&self) -> Result<Metadata, MediaError>;
    async fn call(&self, cmd: MediaCommand) -> Result<(), MediaError>;
}

/// zbus implementation over the session bus.
pub struct ZbusPlayer {
    player: PlayerProxy<'static>,
}

impl ZbusPlayer {
    /// The change stream is subscribed before anything is read, so no signal falls in between.
    pub async fn connect(
        conn: &Connection,
        service: &str,
        path: &str,
    ) -> Result<(Self, PropertiesChangedStream<'static>), MediaError> {
        let name = BusName::try_from(service.to_owned()).map_err(zbus::Error::from)?;
        if !DBusProxy::new(conn).await?.name_has_owner(name).await? {
            return Err(MediaError::ServiceAbsent(service.to_owned()));
        }
        let properties = PropertiesProxy::builder(conn)
            .destination(service.to_owned())?
            .path(path.to_owned())?
            .build()
            .await?;
        let changes = properties.receive_properties_changed().await?;
        // Uncached: every read is a real Properties.Get.
        let player = PlayerProxy::builder(conn)
            .destination(service.to_owned())?
            .path(path.to_owned())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok((Self { player }, changes))
    }
}

impl PlayerBackend for ZbusPlayer {
    async fn fetch_metadata(&self) -> Result<Metadata, MediaError> {
        let map = self.player.metadata().await?;
        Ok(Metadata::from_map(&map))
    }

    async fn call(&self, cmd: MediaCommand) -> Result<(), MediaError> {
        match cmd {
            MediaCommand::Play => self.player.play().await?,
            MediaCommand::Pause => self.player.pause().await?,
            MediaCommand::PlayPause => self.player.play_pause().await?,
            MediaCommand::Next => self.player.next().await?,
            MediaCommand::Previous => self.player.previous().await?,
            MediaCommand::Stop => self.player.stop().await?,
        }
        Ok(())
    }
}

pub struct MediaProxy<B> {
    backend: B,
    cache: watch::Sender<Arc<Metadata>>,
}

impl MediaProxy<ZbusPlayer> {
    /// Fails when the service is not on the bus; a failed first fetch leaves an empty snapshot.
    ///
    /// Every item of the returned stream should be answered with [`MediaProxy::refresh`].
    pub async fn connect(
        conn: &Connection,
        service: &str,
        path: &str,
    ) -> Result<(Self, PropertiesChangedStream<'static>), MediaError> {
        let (backend, changes) = ZbusPlayer::connect(conn, service, path).await?;
        info!(event = "media.connected", service = service, path = path, interface = PLAYER_INTERFACE);
        Ok((Self::new(backend).await, changes))
    }
}

impl<B: PlayerBackend> MediaProxy<B> {
    pub async fn new(backend: B) -> Self {
        let (cache, _) = watch::channel(Arc::new(Metadata::default()));
        let proxy = Self { backend, cache };
        proxy.refresh().await;
        proxy
    }

    /// Current snapshot; always one complete fetch result.
    pub fn snapshot(&self) -> Arc<Metadata> {
        Arc::clone(&self.cache.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Metadata>> {
        self.cache.subscribe()
    }

    /// Re-reads the whole property and swaps it in; on failure the previous snapshot stays.
    pub async fn refresh(&self) -> bool {
        match self.backend.fetch_metadata().await {
            Ok(md) => {
                debug!(event = "media.metadata", title = %md.title, track = %md.track_id);
                self.cache.send_replace(Arc::new(md));
                true
            }
            Err(e) => {
                warn!(event = "media.fetch_failed", error = %e);
                false
            }
        }
    }

    /// One round trip, failures logged, never retried.
    pub async fn send(&self, cmd: MediaCommand) {
        debug!(event = "media.command", method = cmd.method());
        if let Err(e) = self.backend.call(cmd).await {
            warn!(event = "media.command_failed", method = cmd.method(), error = %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, collections::VecDeque};

    /// Answers fetches from a script; the last scripted value is "what the player has now".
    #[derive(Default)]
    struct ScriptedPlayer {
        fetches: RefCell<VecDeque<Result<Metadata, MediaError>>>,
        calls: RefCell<Vec<MediaCommand>>,
        fail_calls: bool,
    }

    impl ScriptedPlayer {
        fn with(script: Vec<Result<Metadata, MediaError>>) -> Self {
            Self {
                fetches: RefCell::new(script.into()),
                ..Self::default()
            }
        }
    }

    impl PlayerBackend for ScriptedPlayer {
        async fn fetch_metadata(&self) -> Result<Metadata, MediaError> {
            self.fetches
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(MediaError::ServiceAbsent("script exhausted".into())))
        }

        async fn call(&self, cmd: MediaCommand) -> Result<(), MediaError> {
            self.calls.borrow_mut().push(cmd);
            if self.fail_calls {
                return Err(MediaError::Bus(zbus::Error::Failure("player went away".into())));
            }
            Ok(())
        }
    }

    fn track(title: &str, artist: &str, album: &str, n: i32) -> Metadata {
        Metadata {
            track_id: format!("/com/spotify/track/{n}"),
            title: title.into(),
            artists: vec![artist.into()],
            album_artists: vec![artist.into()],
            album: album.into(),
            track_number: n,
            length: 200_000_000 + u64::try_from(n).unwrap(),
            ..Metadata::default()
        }
    }

    fn failure() -> Result<Metadata, MediaError> {
        Err(MediaError::Bus(zbus::Error::Failure("timeout".into())))
    }

    #[tokio::test]
    async fn initial_fetch_fills_the_cache() {
        let first = track("Intro", "The xx", "xx", 1);
        let proxy = MediaProxy::new(ScriptedPlayer::with(vec![Ok(first.clone())])).await;
        assert_eq!(*proxy.snapshot(), first);
    }

    #[tokio::test]
    async fn failed_initial_fetch_leaves_an_empty_snapshot() {
        let proxy = MediaProxy::new(ScriptedPlayer::with(vec![failure()])).await;
        assert!(proxy.snapshot().is_empty());
        assert!(proxy.snapshot().tooltip().is_none());
    }

    #[tokio::test]
    async fn two_rapid_notifications_settle_on_the_latest_full_value() {
        let a = track("Teardrop", "Massive Attack", "Mezzanine", 3);
        let b = track("Windowlicker", "Aphex Twin", "Windowlicker", 1);
        let proxy = MediaProxy::new(ScriptedPlayer::with(vec![
            Ok(Metadata::default()),
            Ok(a.clone()),
            Ok(b.clone()),
        ]))
        .await;
        let mut rx = proxy.subscribe();

        let mut seen = vec![];
        for _ in 0..2 {
            assert!(proxy.refresh().await);
            seen.push((**rx.borrow_and_update()).clone());
        }

        assert_eq!(seen, vec![a.clone(), b.clone()]);
        assert_eq!(*proxy.snapshot(), b);
        // No hybrid: the title and the album always come from the same fetch.
        let snap = proxy.snapshot();
        assert!(snap.title == b.title && snap.album == b.album && snap.artists == b.artists);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_the_previous_snapshot() {
        let a = track("Roygbiv", "Boards of Canada", "Music Has the Right to Children", 7);
        let proxy = MediaProxy::new(ScriptedPlayer::with(vec![Ok(a.clone()), failure()])).await;
        assert!(!proxy.refresh().await);
        assert_eq!(*proxy.snapshot(), a);
    }

    #[tokio::test]
    async fn send_logs_failures_without_retrying() {
        let player = ScriptedPlayer {
            fail_calls: true,
            ..ScriptedPlayer::with(vec![Ok(Metadata::default())])
        };
        let proxy = MediaProxy::new(player).await;
        proxy.send(MediaCommand::PlayPause).await;
        proxy.send(MediaCommand::Next).await;
        assert_eq!(*proxy.backend.calls.borrow(), vec![MediaCommand::PlayPause, MediaCommand::Next]);
    }
}
