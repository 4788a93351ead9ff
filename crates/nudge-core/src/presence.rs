//! Presence broadcast sessions.
//!
//! [`PresenceManager`] owns at most one live session. A restart cancels the
//! running session and waits (bounded) for it to close before opening the
//! next one, so two sessions never broadcast at the same time.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;

const SESSION_TICK: Duration = Duration::from_secs(1);
const STOP_TIMEOUT: Duration = Duration::from_secs(1);
const OPEN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceButton {
    pub label: String,
    pub url: String,
}

/// Everything a publisher needs to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceActivity {
    pub app_id: String,
    pub state: String,
    pub details: String,
    pub large_image: String,
    pub large_text: String,
    pub start: DateTime<Utc>,
    pub buttons: Vec<PresenceButton>,
}

/// An open broadcast; closed exactly once when its session ends
#[async_trait]
pub trait PresenceConnection: Send {
    async fn close(&mut self) -> Result<()>;
}

/// Presence transport
#[async_trait]
pub trait PresencePublisher: Send + Sync {
    async fn open(&self, activity: &PresenceActivity) -> Result<Box<dyn PresenceConnection>>;
}

/// Discord Rich Presence over local IPC
pub struct DiscordPublisher;

struct DiscordConnection {
    client: Option<DiscordIpcClient>,
}

fn connect_discord(presence: &PresenceActivity) -> Result<DiscordIpcClient> {
    let mut client = DiscordIpcClient::new(&presence.app_id)
        .map_err(|e| anyhow!("Failed to create Discord client: {e}"))?;
    client
        .connect()
        .map_err(|e| anyhow!("Failed to connect to Discord: {e}"))?;

    let buttons: Vec<activity::Button> = presence
        .buttons
        .iter()
        .map(|b| activity::Button::new(&b.label, &b.url))
        .collect();
    let payload = activity::Activity::new()
        .state(&presence.state)
        .details(&presence.details)
        .assets(
            activity::Assets::new()
                .large_image(&presence.large_image)
                .large_text(&presence.large_text),
        )
        .timestamps(activity::Timestamps::new().start(presence.start.timestamp()))
        .buttons(buttons);

    client
        .set_activity(payload)
        .map_err(|e| anyhow!("Failed to set Discord activity: {e}"))?;
    Ok(client)
}

/// Run `connect` on the blocking pool.
///
/// The blocking call cannot be interrupted, so if the caller stops waiting
/// (an open timeout) a late success is passed to `discard` instead of being
/// dropped with its activity still published.
async fn connect_blocking<T, C, D>(connect: C, discard: D) -> Result<T>
where
    T: Send + 'static,
    C: FnOnce() -> Result<T> + Send + 'static,
    D: FnOnce(T) + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        if let Err(Ok(late)) = tx.send(connect()) {
            log::debug!("Presence connect finished after its caller gave up, closing it");
            discard(late);
        }
    });
    rx.await.context("Presence connect task failed")?
}

#[async_trait]
impl PresencePublisher for DiscordPublisher {
    async fn open(&self, activity: &PresenceActivity) -> Result<Box<dyn PresenceConnection>> {
        let activity = activity.clone();
        let client = connect_blocking(
            move || connect_discord(&activity),
            |mut client: DiscordIpcClient| {
                if let Err(e) = client.close() {
                    log::debug!("Failed to close abandoned Discord client: {e}");
                }
            },
        )
        .await?;
        Ok(Box::new(DiscordConnection {
            client: Some(client),
        }))
    }
}

#[async_trait]
impl PresenceConnection for DiscordConnection {
    async fn close(&mut self) -> Result<()> {
        let Some(mut client) = self.client.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || {
            client
                .close()
                .map_err(|e| anyhow!("Failed to close Discord client: {e}"))
        })
        .await
        .context("Discord close task failed")?
    }
}

/// Static parts of every activity
#[derive(Debug, Clone)]
pub struct PresenceSettings {
    pub app_id: String,
    pub large_text: String,
    pub buttons: Vec<PresenceButton>,
}

impl PresenceSettings {
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            app_id: config.presence_app_id.clone(),
            large_text: config.presence_large_text.clone(),
            buttons: config.presence_buttons.clone(),
        }
    }
}

struct PresenceSession {
    details: String,
    since: DateTime<Utc>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

async fn run_session(
    mut connection: Box<dyn PresenceConnection>,
    cancel: CancellationToken,
    details: String,
) {
    let mut ticker = tokio::time::interval(SESSION_TICK);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
    }

    if let Err(e) = connection.close().await {
        log::warn!("Presence session '{details}' did not close cleanly: {e:#}");
    }
    log::debug!("Presence session '{details}' ended");
}

/// Single owner of the live presence session
pub struct PresenceManager {
    publisher: Arc<dyn PresencePublisher>,
    settings: PresenceSettings,
    session: Option<PresenceSession>,
    stop_timeout: Duration,
}

impl PresenceManager {
    #[must_use]
    pub fn new(publisher: Arc<dyn PresencePublisher>, settings: PresenceSettings) -> Self {
        Self {
            publisher,
            settings,
            session: None,
            stop_timeout: STOP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Details and start time of the live session
    #[must_use]
    pub fn current(&self) -> Option<(&str, DateTime<Utc>)> {
        self.session
            .as_ref()
            .map(|s| (s.details.as_str(), s.since))
    }

    /// Replace the live session.
    ///
    /// The previous session is cancelled and joined (bounded) before the new
    /// one opens. A failed open leaves no session.
    pub async fn restart(
        &mut self,
        label: &str,
        details: &str,
        large_image: &str,
        since: DateTime<Utc>,
    ) {
        self.stop().await;

        let activity = PresenceActivity {
            app_id: self.settings.app_id.clone(),
            state: label.to_string(),
            details: details.to_string(),
            large_image: large_image.to_string(),
            large_text: self.settings.large_text.clone(),
            start: since,
            buttons: self.settings.buttons.clone(),
        };

        let connection = match tokio::time::timeout(OPEN_TIMEOUT, self.publisher.open(&activity)).await
        {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                log::warn!("Failed to open presence session: {e:#}");
                return;
            }
            Err(_) => {
                log::warn!("Opening presence session timed out after {OPEN_TIMEOUT:?}");
                log::debug!("A late connect will be closed as soon as it completes");
                return;
            }
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_session(connection, cancel.clone(), details.to_string()));
        log::info!("Presence: {label} {details} (since {since})");

        self.session = Some(PresenceSession {
            details: details.to_string(),
            since,
            cancel,
            handle,
        });
    }

    /// Cancel the live session, if any, without starting a replacement
    pub async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.cancel.cancel();
        match tokio::time::timeout(self.stop_timeout, session.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Presence session '{}' task failed: {e}", session.details),
            Err(_) => log::warn!(
                "Presence session '{}' did not stop within {:?}, continuing without it",
                session.details,
                self.stop_timeout
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePublisher;
    use chrono::TimeZone;

    fn settings() -> PresenceSettings {
        PresenceSettings {
            app_id: "42".to_string(),
            large_text: "nudge".to_string(),
            buttons: vec![PresenceButton {
                label: "Repository".to_string(),
                url: "https://example.com".to_string(),
            }],
        }
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 16, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_connect_blocking_returns_value() {
        let value = connect_blocking(|| Ok(7), |_: i32| panic!("discarded a value that was awaited"))
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = connect_blocking(|| Err::<i32, _>(anyhow!("no ipc socket")), |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no ipc socket"));
    }

    #[tokio::test]
    async fn test_late_connect_is_discarded() {
        let (discarded_tx, discarded_rx) = std::sync::mpsc::channel();
        let connect = connect_blocking(
            || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(7)
            },
            move |value| {
                let _ = discarded_tx.send(value);
            },
        );
        assert!(tokio::time::timeout(Duration::from_millis(20), connect)
            .await
            .is_err());

        let discarded =
            tokio::task::spawn_blocking(move || discarded_rx.recv_timeout(Duration::from_secs(2)))
                .await
                .unwrap();
        assert_eq!(discarded, Ok(7));
    }

    #[tokio::test]
    async fn test_restart_opens_session() {
        let publisher = Arc::new(FakePublisher::default());
        let mut manager = PresenceManager::new(publisher.clone(), settings());

        manager
            .restart("Time in full focus:", "Focus State", "cat", since())
            .await;

        assert!(manager.is_active());
        assert_eq!(manager.current(), Some(("Focus State", since())));
        assert_eq!(publisher.active(), 1);

        let opened = publisher.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].app_id, "42");
        assert_eq!(opened[0].state, "Time in full focus:");
        assert_eq!(opened[0].large_image, "cat");
        assert_eq!(opened[0].buttons.len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_restarts_leave_one_session() {
        let publisher = Arc::new(FakePublisher::default());
        let mut manager = PresenceManager::new(publisher.clone(), settings());

        manager.restart("a", "Focus State", "cat", since()).await;
        manager.restart("a", "Unfocus State", "fix", since()).await;

        assert_eq!(publisher.opened().len(), 2);
        assert_eq!(publisher.active(), 1);
        assert_eq!(publisher.max_active(), 1);
        assert_eq!(manager.current().map(|(d, _)| d), Some("Unfocus State"));
    }

    #[tokio::test]
    async fn test_stop_closes_without_replacement() {
        let publisher = Arc::new(FakePublisher::default());
        let mut manager = PresenceManager::new(publisher.clone(), settings());

        manager.restart("a", "Focus State", "cat", since()).await;
        manager.stop().await;

        assert!(!manager.is_active());
        assert_eq!(publisher.active(), 0);

        // Stopping twice is a no-op
        manager.stop().await;
        assert_eq!(publisher.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_leaves_no_session() {
        let publisher = Arc::new(FakePublisher::failing());
        let mut manager = PresenceManager::new(publisher.clone(), settings());

        manager.restart("a", "Focus State", "cat", since()).await;
        assert!(!manager.is_active());
        assert_eq!(publisher.active(), 0);
    }

    #[tokio::test]
    async fn test_stuck_session_does_not_block_restart() {
        let publisher = Arc::new(FakePublisher::with_close_delay(Duration::from_secs(30)));
        let mut manager = PresenceManager::new(publisher.clone(), settings());
        manager.stop_timeout = Duration::from_millis(100);

        manager.restart("a", "Focus State", "cat", since()).await;
        let started = tokio::time::Instant::now();
        manager.restart("a", "Unfocus State", "fix", since()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(manager.current().map(|(d, _)| d), Some("Unfocus State"));
        assert_eq!(publisher.opened().len(), 2);
    }
}
