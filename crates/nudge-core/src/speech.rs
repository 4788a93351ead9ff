//! Text-to-speech via an external synthesizer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::audio::AudioOutput;

const CHUNK_SIZE: usize = 16 * 1024;

/// Finite, non-restartable stream of encoded audio chunks
pub struct AudioChunks {
    rx: mpsc::Receiver<Result<Vec<u8>>>,
}

impl AudioChunks {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Result<Vec<u8>>>) -> Self {
        Self { rx }
    }

    /// Next chunk, or `None` once the stream has ended
    pub async fn next(&mut self) -> Option<Result<Vec<u8>>> {
        self.rx.recv().await
    }

    /// Buffer the whole stream
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the synthesizer
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut audio = Vec::new();
        while let Some(chunk) = self.next().await {
            audio.extend_from_slice(&chunk?);
        }
        Ok(audio)
    }
}

/// Speech synthesis collaborator
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioChunks>;
}

/// Runs the `edge-tts` command line tool and streams MP3 from its stdout
pub struct EdgeTtsCommand {
    program: String,
}

impl EdgeTtsCommand {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsCommand {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioChunks> {
        let mut child = Command::new(&self.program)
            .arg("--voice")
            .arg(voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        let mut stdout = child
            .stdout
            .take()
            .context("Synthesizer stdout was not captured")?;
        let program = self.program.clone();
        let (tx, rx) = mpsc::channel::<Result<Vec<u8>>>(16);

        tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                }
            }

            match child.wait_with_output().await {
                Ok(output) if output.status.success() => {}
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let _ = tx
                        .send(Err(anyhow::anyhow!(
                            "{program} exited with {}: {}",
                            output.status,
                            stderr.trim()
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                }
            }
        });

        Ok(AudioChunks::new(rx))
    }
}

/// Synthesize `text`, play it on the shared channel and wait for the end
///
/// # Errors
///
/// Returns an error if synthesis fails, yields no audio, or playback cannot start
pub async fn speak(
    synthesizer: &dyn SpeechSynthesizer,
    audio: &dyn AudioOutput,
    text: &str,
    voice: &str,
) -> Result<()> {
    if text.trim().is_empty() {
        log::info!("Nothing to say, skipping speech");
        return Ok(());
    }

    let clip = synthesizer.synthesize(text, voice).await?.collect().await?;
    if clip.is_empty() {
        anyhow::bail!("Synthesizer produced no audio");
    }

    let playback = audio.play_bytes(clip).await?;
    playback.wait().await;
    Ok(())
}
