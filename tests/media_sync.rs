//! Metadata cache against a scripted player on the bus:
//! `dbus-run-session -- cargo test -- --ignored`.

use futures_util::StreamExt;
use spotify_tray::media::{MediaProxy, OBJECT_PATH};
use std::{collections::HashMap, time::Duration};
use tokio::{sync::mpsc, time::timeout};
use zbus::{dbus_interface, zvariant::Value, Connection};

/// Reports every Metadata read so the test can change the track right behind it.
struct ScriptedPlayer {
    title: String,
    reads: mpsc::UnboundedSender<()>,
}

#[dbus_interface(name = "org.mpris.MediaPlayer2.Player")]
impl ScriptedPlayer {
    #[dbus_interface(property)]
    fn metadata(&self) -> HashMap<String, Value<'static>> {
        let _ = self.reads.send(());
        HashMap::from([
            ("mpris:trackid".to_owned(), Value::from(format!("/com/spotify/track/{}", self.title))),
            ("xesam:title".to_owned(), Value::from(self.title.clone())),
        ])
    }
}

#[tokio::test]
#[ignore = "needs a D-Bus session bus"]
async fn change_right_after_the_first_read_is_not_lost() {
    let service = format!("org.mpris.MediaPlayer2.SpotifyTrayTest{}", std::process::id());
    let (reads, mut read_rx) = mpsc::unbounded_channel();
    let player = Connection::session().await.unwrap();
    player
        .object_server()
        .at(
            OBJECT_PATH,
            ScriptedPlayer {
                title: "A".into(),
                reads,
            },
        )
        .await
        .unwrap();
    player.request_name(service.as_str()).await.unwrap();
    let iface = player
        .object_server()
        .interface::<_, ScriptedPlayer>(OBJECT_PATH)
        .await
        .unwrap();

    let conn = Connection::session().await.unwrap();
    let next_track = async {
        read_rx.recv().await;
        let mut p = iface.get_mut().await;
        p.title = "B".into();
        p.metadata_changed(iface.signal_context()).await.unwrap();
    };
    let (connected, ()) = tokio::join!(MediaProxy::connect(&conn, &service, OBJECT_PATH), next_track);
    let (media, mut changes) = connected.unwrap();
    assert_eq!(media.snapshot().title, "A");

    let settled = timeout(Duration::from_secs(2), async {
        while media.snapshot().title != "B" {
            if changes.next().await.is_none() {
                break;
            }
            media.refresh().await;
        }
    })
    .await;

    assert!(settled.is_ok(), "no PropertiesChanged reached the cache");
    assert_eq!(media.snapshot().title, "B");
    assert_eq!(media.snapshot().track_id, "/com/spotify/track/B");
}
