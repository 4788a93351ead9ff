//! In-memory collaborators for unit tests.

use anyhow::Result;
use async_trait::async_trait;
use nudge_ai::{CompletionError, CompletionProvider};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use crate::audio::{AudioOutput, PlaybackHandle};
use crate::monitor::WindowInspector;
use crate::presence::{PresenceActivity, PresenceConnection, PresencePublisher};
use crate::speech::{AudioChunks, SpeechSynthesizer};

#[derive(Default)]
pub struct FakeInspector {
    titles: Mutex<VecDeque<Option<String>>>,
    fail: bool,
    activations: Mutex<Vec<String>>,
}

impl FakeInspector {
    pub fn with_titles(titles: &[Option<&str>]) -> Self {
        Self {
            titles: Mutex::new(titles.iter().map(|t| t.map(str::to_string)).collect()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn activations(&self) -> Vec<String> {
        self.activations.lock().unwrap().clone()
    }
}

#[async_trait]
impl WindowInspector for FakeInspector {
    async fn current_title(&self) -> Result<Option<String>> {
        if self.fail {
            anyhow::bail!("no display");
        }
        Ok(self.titles.lock().unwrap().pop_front().flatten())
    }

    async fn activate(&self, title: &str) -> Result<()> {
        self.activations.lock().unwrap().push(title.to_string());
        if self.fail {
            anyhow::bail!("window not found");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAudio {
    files: Mutex<Vec<PathBuf>>,
    clips: Mutex<Vec<Vec<u8>>>,
}

impl FakeAudio {
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().clone()
    }

    pub fn clips(&self) -> Vec<Vec<u8>> {
        self.clips.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioOutput for FakeAudio {
    fn play_file(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn play_bytes(&self, bytes: Vec<u8>) -> Result<PlaybackHandle> {
        self.clips.lock().unwrap().push(bytes);
        Ok(PlaybackHandle::finished())
    }
}

/// Echoes the text back as the "audio"
#[derive(Default)]
pub struct FakeSpeech {
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeSpeech {
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioChunks> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice.to_string()));
        let (tx, rx) = mpsc::channel(1);
        tx.send(Ok(text.as_bytes().to_vec())).await?;
        Ok(AudioChunks::new(rx))
    }
}

/// Completion stub; optionally holds every call until released
pub struct FakeCompletion {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Calls block until a permit is added to the returned semaphore
    pub fn gated(text: &str) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let fake = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::replying(text)
        };
        (fake, gate)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.reply.clone().ok_or(CompletionError::Status {
            status: 500,
            body: "model not loaded".to_string(),
        })
    }
}

#[derive(Default)]
struct PublisherCounters {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[derive(Default)]
pub struct FakePublisher {
    counters: Arc<PublisherCounters>,
    opened: Mutex<Vec<PresenceActivity>>,
    fail: bool,
    close_delay: Option<Duration>,
}

impl FakePublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_close_delay(delay: Duration) -> Self {
        Self {
            close_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<PresenceActivity> {
        self.opened.lock().unwrap().clone()
    }
}

struct FakeConnection {
    counters: Arc<PublisherCounters>,
    close_delay: Option<Duration>,
}

#[async_trait]
impl PresenceConnection for FakeConnection {
    async fn close(&mut self) -> Result<()> {
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PresencePublisher for FakePublisher {
    async fn open(&self, activity: &PresenceActivity) -> Result<Box<dyn PresenceConnection>> {
        if self.fail {
            anyhow::bail!("Discord is not running");
        }
        self.opened.lock().unwrap().push(activity.clone());
        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            counters: Arc::clone(&self.counters),
            close_delay: self.close_delay,
        }))
    }
}
