use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sampling::SamplingParams;


/// Recoverable failures of a completion request
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion request failed: {0}")]
    Transport(reqwest::Error),
    #[error("failed to decode completion response: {0}")]
    Decode(reqwest::Error),
}

/// Trait for text completion services
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a continuation for the given prompt
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Check if the service answers at all
    async fn is_available(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    sampling: &'a SamplingParams,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

/// Local llama.cpp server provider (`POST /completion`)
pub struct LlamaCppProvider {
    client: Client,
    url: String,
    sampling: SamplingParams,
    timeout: Duration,
}

impl LlamaCppProvider {
    /// Create a provider that posts to `url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(url: &str, sampling: SamplingParams, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            sampling,
            timeout,
        })
    }

    fn health_url(&self) -> String {
        let base = self
            .url
            .strip_suffix("/completion")
            .unwrap_or(self.url.as_str());
        format!("{base}/health")
    }

    fn classify(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Transport(err)
        }
    }
}

#[async_trait]
impl CompletionProvider for LlamaCppProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = CompletionRequest {
            prompt,
            sampling: &self.sampling,
        };

        log::debug!("Posting completion request to {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout)
            } else {
                CompletionError::Decode(e)
            }
        })?;

        Ok(parsed.content.trim().to_string())
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.health_url())
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }
}
