//! Turns tracker intents into sounds, generated speech and presence updates.
//!
//! Only one rebuke/commendation may be generating or speaking at a time; new
//! requests arriving while one is in flight are dropped, not queued.

use nudge_ai::{CompletionProvider, PromptTemplates};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::audio::AudioOutput;
use crate::config::MonitorConfig;
use crate::monitor::WindowInspector;
use crate::presence::PresenceManager;
use crate::speech::{speak, SpeechSynthesizer};
use crate::tracker::{Intent, PresenceStatus};


/// Clears the in-flight flag when the generation task ends, however it ends
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Per-dispatch settings taken from the configuration
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub reminder_sound: PathBuf,
    pub voice: String,
    pub templates: PromptTemplates,
    pub switch_back: bool,
    pub focus_image: String,
    pub unfocus_image: String,
}

impl DispatchSettings {
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            reminder_sound: config.reminder_sound.clone(),
            voice: config.edge_tts_voice.clone(),
            templates: config.templates(),
            switch_back: config.switch_back,
            focus_image: config.presence_focus_image.clone(),
            unfocus_image: config.presence_unfocus_image.clone(),
        }
    }
}

pub struct Dispatcher {
    settings: DispatchSettings,
    audio: Arc<dyn AudioOutput>,
    completion: Arc<dyn CompletionProvider>,
    speech: Arc<dyn SpeechSynthesizer>,
    inspector: Arc<dyn WindowInspector>,
    presence: Option<PresenceManager>,
    in_flight: Arc<AtomicBool>,
    generation: Option<JoinHandle<()>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        settings: DispatchSettings,
        audio: Arc<dyn AudioOutput>,
        completion: Arc<dyn CompletionProvider>,
        speech: Arc<dyn SpeechSynthesizer>,
        inspector: Arc<dyn WindowInspector>,
    ) -> Self {
        Self {
            settings,
            audio,
            completion,
            speech,
            inspector,
            presence: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            generation: None,
        }
    }

    /// Enable presence broadcasting through the given manager
    #[must_use]
    pub fn with_presence(mut self, presence: PresenceManager) -> Self {
        self.presence = Some(presence);
        self
    }

    /// True while a rebuke or commendation is being generated or spoken
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn presence(&self) -> Option<&PresenceManager> {
        self.presence.as_ref()
    }

    /// Act on one intent. Never waits for generation or speech.
    pub async fn dispatch(&mut self, intent: Intent) {
        match intent {
            Intent::Reminder => self.play_reminder(),
            Intent::Punishment {
                distracting_window,
                target_window,
            } => {
                self.switch_back(target_window.as_deref());
                let prompt = self
                    .settings
                    .templates
                    .punishment_prompt(&distracting_window, target_window.as_deref());
                self.spawn_generation("punishment", prompt);
            }
            Intent::Praise {
                window,
                focused_seconds,
            } => {
                let prompt = self.settings.templates.praise_prompt(&window, focused_seconds);
                self.spawn_generation("praise", prompt);
            }
            Intent::Presence { status, since } => {
                let image = match status {
                    PresenceStatus::Focused => &self.settings.focus_image,
                    PresenceStatus::Unfocused => &self.settings.unfocus_image,
                };
                if let Some(presence) = self.presence.as_mut() {
                    presence
                        .restart(status.label(), status.details(), image, since)
                        .await;
                }
            }
        }
    }

    fn play_reminder(&self) {
        match self.audio.play_file(&self.settings.reminder_sound) {
            Ok(()) => log::info!("Reminder: sound queued"),
            Err(e) => log::warn!("Failed to play reminder sound: {e:#}"),
        }
    }

    fn switch_back(&self, target_window: Option<&str>) {
        if !self.settings.switch_back {
            return;
        }
        let Some(target) = target_window else {
            log::info!("No previous target window, cannot switch back");
            return;
        };

        log::info!("Switching back to last target window: {target}");
        let inspector = Arc::clone(&self.inspector);
        let target = target.to_string();
        tokio::spawn(async move {
            match inspector.activate(&target).await {
                Ok(()) => log::info!("Switched to window: {target}"),
                Err(e) => log::warn!("Failed to switch to {target}: {e:#}"),
            }
        });
    }

    fn spawn_generation(&mut self, kind: &'static str, prompt: String) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("Dropping {kind}: another utterance is still in flight");
            return;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let completion = Arc::clone(&self.completion);
        let speech = Arc::clone(&self.speech);
        let audio = Arc::clone(&self.audio);
        let voice = self.settings.voice.clone();

        self.generation = Some(tokio::spawn(async move {
            let _guard = guard;

            let text = match completion.complete(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Completion for {kind} failed: {e}");
                    return;
                }
            };
            log::info!("AI response: {text}");

            if let Err(e) = speak(speech.as_ref(), audio.as_ref(), &text, &voice).await {
                log::warn!("Failed to speak {kind}: {e:#}");
            }
        }));
    }

    /// Stop presence and abandon any utterance in flight
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.generation.take() {
            handle.abort();
        }
        if let Some(presence) = self.presence.as_mut() {
            presence.stop().await;
        }
    }
}
