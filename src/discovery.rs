//! Bounded-retry window discovery coupled to client launch.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    error::DiscoveryError,
    supervisor::{ClientProcess, Spawner},
    window::WindowHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    /// Locate attempts after the launch.
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(500),
        }
    }
}

/// Result of a successful discovery.
#[derive(Debug)]
pub struct Discovered {
    pub window: WindowHandle,
    /// Present only when this run launched the client.
    pub process: Option<ClientProcess>,
}

/// Locate → Spawn (once) → up to `attempts` × (sleep, locate).
pub async fn discover<L, S>(
    mut locate: L,
    spawner: &mut S,
    target_class: &str,
    argv: &[String],
    policy: DiscoveryPolicy,
) -> Result<Discovered, DiscoveryError>
where
    L: FnMut(&str) -> Option<WindowHandle>,
    S: Spawner + ?Sized,
{
    if let Some(window) = locate(target_class) {
        info!(event = "discovery.found_running", window = window.id(), pid = window.pid());
        return Ok(Discovered { window, process: None });
    }

    let process = spawner.spawn(argv)?;

    for attempt in 1..=policy.attempts {
        sleep(policy.interval).await;
        if let Some(window) = locate(target_class) {
            info!(event = "discovery.found_launched", window = window.id(), pid = window.pid(), attempt = attempt);
            return Ok(Discovered {
                window,
                process: Some(process),
            });
        }
        warn!(
            event = "discovery.attempt_failed",
            class = target_class,
            attempt = attempt,
            attempts = policy.attempts,
        );
    }

    Err(DiscoveryError::Exhausted {
        class: target_class.to_string(),
        attempts: policy.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SpawnError,
        window::{fake::FakeWindows, locate, WindowSystem},
    };
    use std::sync::Arc;
    use tokio::{sync::oneshot, time::Instant};

    #[derive(Default)]
    struct CountingSpawner {
        calls: usize,
        fail: bool,
    }

    impl Spawner for CountingSpawner {
        fn spawn(&mut self, _argv: &[String]) -> Result<ClientProcess, SpawnError> {
            self.calls += 1;
            if self.fail {
                return Err(SpawnError::EmptyCommand);
            }
            let (_tx, rx) = oneshot::channel();
            Ok(ClientProcess { pid: Some(99), exited: rx })
        }
    }

    fn argv() -> Vec<String> {
        vec!["spotify".into()]
    }

    #[tokio::test(start_paused = true)]
    async fn never_found_spawns_once_and_tries_exactly_attempts_times() {
        let mut spawner = CountingSpawner::default();
        let mut locates = 0;
        let started = Instant::now();
        let err = discover(
            |_| {
                locates += 1;
                None
            },
            &mut spawner,
            "spotify",
            &argv(),
            DiscoveryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Exhausted { attempts: 5, .. }));
        assert_eq!(spawner.calls, 1);
        assert_eq!(locates, 1 + 5);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(2500) && waited < Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_right_after_the_successful_attempt() {
        let fake = Arc::new(FakeWindows::default());
        let sys: Arc<dyn WindowSystem> = fake.clone();
        let mut spawner = CountingSpawner::default();
        let mut locates = 0;
        let started = Instant::now();
        let found = discover(
            |class| {
                locates += 1;
                // Window appears once the second post-launch attempt runs.
                if locates == 3 {
                    fake.add(0x4a0_0007, Some("spotify"));
                }
                locate(&sys, class)
            },
            &mut spawner,
            "spotify",
            &argv(),
            DiscoveryPolicy::default(),
        )
        .await
        .unwrap();
        assert_eq!(found.window.id(), 0x4a0_0007);
        assert!(found.process.is_some());
        assert_eq!(spawner.calls, 1);
        assert_eq!(locates, 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1000) && waited < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn running_client_is_not_spawned() {
        let sys: Arc<dyn WindowSystem> = Arc::new(FakeWindows::with(&[(3, Some("spotify"))]));
        let mut spawner = CountingSpawner::default();
        let found = discover(|c| locate(&sys, c), &mut spawner, "spotify", &argv(), DiscoveryPolicy::default())
            .await
            .unwrap();
        assert!(found.process.is_none());
        assert_eq!(spawner.calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_ends_without_retrying() {
        let mut spawner = CountingSpawner { fail: true, ..Default::default() };
        let mut locates = 0;
        let err = discover(
            |_| {
                locates += 1;
                None
            },
            &mut spawner,
            "spotify",
            &argv(),
            DiscoveryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Spawn(_)));
        assert_eq!(spawner.calls, 1);
        assert_eq!(locates, 1);
    }
}
