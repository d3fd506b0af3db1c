//! Reel assembly.
//! This module wires narration, caption timing, overlay rendering, video
//! compositing and metadata generation into one run.

use crate::config::ReelConfig;
use crate::llm::ChatModel;
use crate::metadata::{self, MetadataOutcome};
use crate::srt;
use crate::subtitle::{self, render, FontFace};
use crate::tts::SpeechSynthesizer;
use crate::video::{self, CompositePlan, Compositor};
use anyhow::{bail, Context, Result};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Files and facts produced by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReelOutput {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    pub metadata_path: PathBuf,
    pub narration: PathBuf,
    /// Measured narration length in seconds.
    pub duration_secs: f64,
    pub metadata: MetadataOutcome,
}

/// External services a run depends on.
pub struct Collaborators<'a> {
    pub tts: &'a dyn SpeechSynthesizer,
    pub llm: &'a dyn ChatModel,
    pub compositor: &'a dyn Compositor,
}

/// Build a reel from the narration script at `script_path`.
/// This function writes the narration, video, subtitles and metadata into
/// `config.output_dir` and returns their paths.
pub async fn make_reel<R: Rng + ?Sized>(
    script_path: &Path,
    config: &ReelConfig,
    services: &Collaborators<'_>,
    rng: &mut R,
) -> Result<ReelOutput> {
    trace!("make_reel script={}", script_path.display());
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output dir {}",
            config.output_dir.display()
        )
    })?;

    let script = fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    // Timing only depends on the text, so bad scripts fail before any API call.
    let captions = subtitle::segment(&script, config.target_duration_secs)?;
    info!("split script into {} captions", captions.len());

    let narration = match &config.narration_override {
        Some(path) => {
            info!("using existing narration {}", path.display());
            path.clone()
        }
        None => {
            let path = config.voice_path();
            info!("synthesizing narration");
            services.tts.synthesize(&script, &path).await?;
            path
        }
    };
    ensure_artifact(&narration)?;

    let duration = services.compositor.probe_duration(&narration).await?;
    info!("narration is {:.1}s", duration);
    let clip_len = services
        .compositor
        .probe_duration(&config.background_video)
        .await?;
    let window = video::pick_background_window(rng, clip_len, duration)?;
    debug!(
        "background window starts at {:.0}s (looped: {})",
        window.start, window.looped
    );

    let subtitles = config.subtitles_path();
    srt::write(&captions, &subtitles)?;

    let face = FontFace::load(&config.font);
    let overlay_dir = tempfile::Builder::new()
        .prefix("autoreel-captions")
        .tempdir()
        .context("failed to create caption directory")?;
    let overlays = render::render_captions(&captions, config, &face, overlay_dir.path())?;

    let music = match &config.background_music {
        Some(path) if path.exists() => Some(path.clone()),
        Some(path) => {
            info!("background music {} not found, using narration only", path.display());
            None
        }
        None => None,
    };

    let plan = CompositePlan {
        background: config.background_video.clone(),
        window,
        narration: narration.clone(),
        music,
        music_volume: config.music_volume,
        overlays,
        width: config.width,
        height: config.height,
        caption_y: config.caption_y(),
        duration,
        fps: config.fps,
        video_bitrate: config.video_bitrate.clone(),
        preset: config.preset.clone(),
        threads: video::encoder_threads(),
        output: config.video_path(),
    };
    info!("compositing video");
    services.compositor.composite(&plan).await?;
    ensure_artifact(&plan.output)?;
    drop(overlay_dir);

    let outcome = metadata::generate_metadata(services.llm, &script).await?;
    let metadata_path = config.metadata_path();
    metadata::write(outcome.metadata(), &metadata_path)?;

    info!("video: {}", plan.output.display());
    info!("metadata: {}", metadata_path.display());
    info!("duration: {:.1}s", duration);
    Ok(ReelOutput {
        video: plan.output,
        subtitles,
        metadata_path,
        narration,
        duration_secs: duration,
        metadata: outcome,
    })
}

/// Fail unless `path` is a non-empty file.
fn ensure_artifact(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("expected output {} is missing", path.display()))?;
    if !meta.is_file() || meta.len() == 0 {
        bail!("expected output {} is empty", path.display());
    }
    Ok(())
}
