//! Run configuration for reel generation.
//! Defaults reproduce the stock 1080x1920 reel layout; a JSON file can
//! override any subset of fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Everything a single reel run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    /// Output canvas width in pixels.
    pub width: u32,
    /// Output canvas height in pixels.
    pub height: u32,
    /// Expected narration length used to time captions before audio exists.
    pub target_duration_secs: f64,
    pub font: PathBuf,
    pub font_size: f32,
    /// Distance from the top of a caption overlay to its first row.
    pub caption_top_offset: u32,
    /// Distance from the bottom of the canvas to the top of the caption overlay.
    pub caption_bottom_offset: u32,
    pub background_video: PathBuf,
    /// Looped under the narration when set and present on disk.
    pub background_music: Option<PathBuf>,
    pub music_volume: f32,
    pub output_dir: PathBuf,
    /// Existing narration audio to use instead of calling text-to-speech.
    pub narration_override: Option<PathBuf>,
    pub fps: u32,
    pub video_bitrate: String,
    pub preset: String,
    /// Seed for background clip selection. Unseeded runs use OS entropy.
    pub seed: Option<u64>,
    pub openai: OpenAiConfig,
    pub elevenlabs: ElevenLabsConfig,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            target_duration_secs: 55.0,
            font: PathBuf::from("src/assets/Video_Text.ttf"),
            font_size: 60.0,
            caption_top_offset: 20,
            caption_bottom_offset: 700,
            background_video: PathBuf::from("src/assets/BG_Video.mp4"),
            background_music: Some(PathBuf::from("src/assets/BG_Music.wav")),
            music_volume: 0.08,
            output_dir: PathBuf::from("out"),
            narration_override: None,
            fps: 30,
            video_bitrate: "6000k".to_string(),
            preset: "medium".to_string(),
            seed: None,
            openai: OpenAiConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
        }
    }
}

/// Settings for the chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Settings for the ElevenLabs text-to-speech endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            voice_id: "nPczCjzI2devNBz1zQrb".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
        }
    }
}

impl ReelConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        trace!("ReelConfig::load path={}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Vertical position of the caption overlay on the canvas.
    pub fn caption_y(&self) -> u32 {
        self.height.saturating_sub(self.caption_bottom_offset)
    }

    pub fn voice_path(&self) -> PathBuf {
        self.output_dir.join("voice.mp3")
    }

    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join("reel.mp4")
    }

    pub fn subtitles_path(&self) -> PathBuf {
        self.output_dir.join("reel.srt")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join("reel_description.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reel.json");
        fs::write(
            &path,
            r#"{"target_duration_secs": 30.0, "seed": 7, "openai": {"model": "gpt-4o"}}"#,
        )
        .unwrap();
        let config = ReelConfig::load(&path).unwrap();
        assert_eq!(config.target_duration_secs, 30.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.base_url, "https://api.openai.com");
        assert_eq!(config.width, 1080);
        assert_eq!(config.caption_y(), 1220);
    }

    #[test]
    fn rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reel.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ReelConfig::load(&path).is_err());
    }

    #[test]
    fn output_paths_live_in_output_dir() {
        let config = ReelConfig {
            output_dir: PathBuf::from("build"),
            ..ReelConfig::default()
        };
        assert_eq!(config.video_path(), PathBuf::from("build/reel.mp4"));
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("build/reel_description.json")
        );
    }
}
