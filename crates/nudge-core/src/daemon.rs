use crate::{
    audio::RodioAudio,
    config::MonitorConfig,
    dispatcher::{DispatchSettings, Dispatcher},
    monitor::{create_inspector, WindowInspector, WindowPoller},
    presence::{DiscordPublisher, PresenceManager, PresenceSettings},
    speech::EdgeTtsCommand,
    tracker::{FocusState, FocusTracker},
};
use anyhow::Result;
use nudge_ai::LlamaCppProvider;
use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};

pub struct Daemon {
    poller: WindowPoller,
    tracker: FocusTracker,
    state: FocusState,
    dispatcher: Dispatcher,
    tick_interval: Duration,
}

impl Daemon {
    /// Build the daemon with the platform inspector and the real collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported or the completion
    /// client cannot be created
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let inspector = create_inspector()?;
        let completion = LlamaCppProvider::new(
            &config.completion_url,
            config.sampling.clone(),
            config.request_timeout(),
        )?;

        let mut dispatcher = Dispatcher::new(
            DispatchSettings::from_config(config),
            Arc::new(RodioAudio::new()),
            Arc::new(completion),
            Arc::new(EdgeTtsCommand::new(&config.tts_command)),
            Arc::clone(&inspector),
        );
        if config.discord_presence {
            dispatcher = dispatcher.with_presence(PresenceManager::new(
                Arc::new(DiscordPublisher),
                PresenceSettings::from_config(config),
            ));
        }

        Ok(Self::with_components(config, inspector, dispatcher))
    }

    #[must_use]
    pub fn with_components(
        config: &MonitorConfig,
        inspector: Arc<dyn WindowInspector>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            poller: WindowPoller::new(inspector),
            tracker: FocusTracker::from_config(config),
            state: FocusState::new(chrono::Utc::now()),
            dispatcher,
            tick_interval: config.poll_interval(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub async fn run_with_signals(&mut self) -> Result<()> {
        let mut interval = interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Monitoring started, polling every {:?}", self.tick_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        log::error!("Unexpected error during tick: {e:#}");
                        tokio::time::sleep(self.tick_interval).await;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    break;
                }
            }
        }

        self.dispatcher.shutdown().await;
        log::info!("Monitoring stopped.");
        Ok(())
    }

    /// One poll-decide-dispatch cycle
    pub async fn tick(&mut self) -> Result<()> {
        let title = self.poller.sample().await;
        let intents = self
            .tracker
            .update(title.as_deref(), chrono::Utc::now(), &mut self.state);

        for intent in intents {
            log::debug!("Dispatching {intent:?}");
            self.dispatcher.dispatch(intent).await;
        }
        Ok(())
    }
}
