//! ElevenLabs-backed speech synthesis.
//! Audio is streamed to a `.part` file and renamed into place once the
//! response body has been fully received.

use super::SpeechSynthesizer;
use crate::config::ElevenLabsConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Synthesizer that calls the ElevenLabs text-to-speech endpoint.
pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: String,
    config: ElevenLabsConfig,
}

impl ElevenLabsSynthesizer {
    /// Create a new synthesizer reading the API key from `ELEVEN_API_KEY`.
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let key = std::env::var("ELEVEN_API_KEY").context("ELEVEN_API_KEY is not set")?;
        Ok(Self::with_key(key, config))
    }

    pub fn with_key(api_key: impl Into<String>, config: ElevenLabsConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        trace!(
            "synthesize(chars={}, out={})",
            text.chars().count(),
            out.display()
        );
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
        });
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .context("ElevenLabs request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("ElevenLabs TTS failed: {status}: {detail}"));
        }

        let part = out.with_extension("part");
        let written = match stream_to_file(resp, &part, out).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(err);
            }
        };
        debug!("wrote {} bytes of narration to {}", written, out.display());
        Ok(())
    }
}

/// Stream the response body into `part`, then move it to `out`.
async fn stream_to_file(resp: reqwest::Response, part: &Path, out: &Path) -> Result<usize> {
    let mut file = tokio::fs::File::create(part)
        .await
        .with_context(|| format!("failed to create {}", part.display()))?;
    let mut written = 0usize;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("failed to read ElevenLabs audio stream")?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(part, out)
        .await
        .with_context(|| format!("failed to move audio into {}", out.display()))?;
    Ok(written)
}
