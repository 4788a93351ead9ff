//! Single shared audio output channel.
//!
//! Every request stops whatever is playing before starting, so the most
//! recent reminder or utterance always wins.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

const PLAYBACK_POLL: Duration = Duration::from_millis(100);

/// Observes one playback until it ends or is preempted
pub struct PlaybackHandle {
    is_busy: Box<dyn Fn() -> bool + Send + Sync>,
}

impl PlaybackHandle {
    pub fn new(is_busy: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            is_busy: Box::new(is_busy),
        }
    }

    /// A handle for playback that has already ended
    #[must_use]
    pub fn finished() -> Self {
        Self::new(|| false)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        (self.is_busy)()
    }

    /// Wait until the sound has finished playing or was replaced
    pub async fn wait(self) {
        while self.is_busy() {
            tokio::time::sleep(PLAYBACK_POLL).await;
        }
    }
}

/// Exclusive audio output
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Queue a sound file for playback without waiting for it.
    ///
    /// `Ok` means the request was accepted, decoding and playback happen
    /// later and report their own failures.
    fn play_file(&self, path: &Path) -> Result<()>;

    /// Play an in-memory encoded clip, returning a handle to await its end
    async fn play_bytes(&self, bytes: Vec<u8>) -> Result<PlaybackHandle>;
}

enum AudioCommand {
    PlayFile(PathBuf),
    PlayBytes {
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<Arc<Sink>>>,
    },
}

/// `rodio` backed output; a dedicated thread owns the non-`Send` stream
pub struct RodioAudio {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl RodioAudio {
    #[must_use]
    pub fn new() -> Self {
        Self { tx: Mutex::new(None) }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|e| anyhow!("audio channel lock poisoned: {e}"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut current: Option<Arc<Sink>> = None;

                while let Ok(cmd) = rx.recv() {
                    if let Some(old) = current.take() {
                        old.stop();
                    }

                    match cmd {
                        AudioCommand::PlayFile(path) => match play_file(&mut output, &path) {
                            Ok(sink) => {
                                log::info!("Playing {}", path.display());
                                current = Some(sink);
                            }
                            Err(e) => log::warn!("Failed to play {}: {e:#}", path.display()),
                        },
                        AudioCommand::PlayBytes { bytes, reply } => {
                            let result = play_bytes(&mut output, bytes);
                            if let Ok(sink) = &result {
                                current = Some(Arc::clone(sink));
                            }
                            let _ = reply.send(result);
                        }
                    }
                }
            })
            .context("Failed to spawn audio thread")?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl Default for RodioAudio {
    fn default() -> Self {
        Self::new()
    }
}

fn open_sink(output: &mut Option<(OutputStream, OutputStreamHandle)>) -> Result<Sink> {
    if output.is_none() {
        let stream = OutputStream::try_default()
            .map_err(|e| anyhow!("Failed to open audio output stream: {e}"))?;
        *output = Some(stream);
    }
    let Some((_, handle)) = output.as_ref() else {
        anyhow::bail!("Audio output stream unavailable");
    };
    Sink::try_new(handle).map_err(|e| anyhow!("Failed to create audio sink: {e}"))
}

fn play_file(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    path: &Path,
) -> Result<Arc<Sink>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| anyhow!("Failed to decode {}: {e}", path.display()))?;
    let sink = open_sink(output)?;
    sink.append(source);
    Ok(Arc::new(sink))
}

fn play_bytes(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    bytes: Vec<u8>,
) -> Result<Arc<Sink>> {
    let source =
        Decoder::new(Cursor::new(bytes)).map_err(|e| anyhow!("Failed to decode audio: {e}"))?;
    let sink = open_sink(output)?;
    sink.append(source);
    Ok(Arc::new(sink))
}

#[async_trait]
impl AudioOutput for RodioAudio {
    fn play_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            anyhow::bail!("Sound file {} not found", path.display());
        }
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PlayFile(path.to_path_buf()))
            .map_err(|_| anyhow!("Audio thread has stopped"))
    }

    async fn play_bytes(&self, bytes: Vec<u8>) -> Result<PlaybackHandle> {
        let tx = self.ensure_thread()?;
        let (reply, response) = oneshot::channel();
        tx.send(AudioCommand::PlayBytes { bytes, reply })
            .map_err(|_| anyhow!("Audio thread has stopped"))?;

        let sink = response
            .await
            .map_err(|_| anyhow!("Audio thread dropped the request"))??;
        Ok(PlaybackHandle::new(move || !sink.empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_missing_sound_file_is_rejected_before_queueing() {
        let audio = RodioAudio::new();
        let err = audio
            .play_file(Path::new("/nonexistent/warning.mp3"))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(audio.tx.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finished_handle_returns_immediately() {
        let handle = PlaybackHandle::finished();
        assert!(!handle.is_busy());
        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_not_busy() {
        let busy = Arc::new(AtomicBool::new(true));
        let probe = Arc::clone(&busy);
        let handle = PlaybackHandle::new(move || probe.load(Ordering::SeqCst));

        let waiter = tokio::spawn(handle.wait());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!waiter.is_finished());

        busy.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
