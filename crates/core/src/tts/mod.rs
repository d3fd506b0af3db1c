//! Text-to-speech for the reel narration.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod elevenlabs;

/// Turns narration text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into `out`. Returns only after the file is fully
    /// written, so callers can read it straight away.
    async fn synthesize(&self, text: &str, out: &Path) -> Result<()>;
}

/// Stand-in used when narration audio is supplied up front. Calling it is a
/// wiring mistake, so it fails loudly instead of writing anything.
pub struct PrerecordedNarration;

#[async_trait]
impl SpeechSynthesizer for PrerecordedNarration {
    async fn synthesize(&self, _text: &str, out: &Path) -> Result<()> {
        Err(anyhow::anyhow!(
            "narration is prerecorded, refusing to synthesize {}",
            out.display()
        ))
    }
}
