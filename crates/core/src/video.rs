//! Video helpers for assembling the reel with ffmpeg.

use crate::subtitle::render::CaptionOverlay;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, trace};

/// Length of the video fade at each end, in seconds.
const VIDEO_FADE_SECS: f64 = 0.5;
/// Length of the music fade at each end, in seconds.
const MUSIC_FADE_SECS: f64 = 2.0;
/// Fade-in applied to the narration, in seconds.
const VOICE_FADE_SECS: f64 = 0.5;

/// Slice of the background clip that plays under the narration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundWindow {
    /// Offset into the clip, in seconds.
    pub start: f64,
    pub duration: f64,
    /// True when the clip is shorter than the narration and has to repeat.
    pub looped: bool,
}

/// Choose a random whole-second window of `clip_len` long enough to cover
/// `min_duration`. Clips that are too short start at zero and loop.
pub fn pick_background_window<R: Rng + ?Sized>(
    rng: &mut R,
    clip_len: f64,
    min_duration: f64,
) -> Result<BackgroundWindow> {
    trace!(
        "pick_background_window clip_len={} min_duration={}",
        clip_len,
        min_duration
    );
    if !min_duration.is_finite() || min_duration <= 0.0 {
        bail!("narration duration must be positive, got {min_duration}");
    }
    if !clip_len.is_finite() || clip_len <= 0.0 {
        bail!("background clip duration must be positive, got {clip_len}");
    }
    if clip_len < min_duration {
        debug!("background clip is {clip_len:.1}s, shorter than narration; looping it");
        return Ok(BackgroundWindow {
            start: 0.0,
            duration: min_duration,
            looped: true,
        });
    }
    let latest = (clip_len - min_duration).floor() as u64;
    let start = rng.gen_range(0..=latest) as f64;
    Ok(BackgroundWindow {
        start,
        duration: min_duration,
        looped: false,
    })
}

/// Everything ffmpeg needs to produce the final reel.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePlan {
    pub background: PathBuf,
    pub window: BackgroundWindow,
    pub narration: PathBuf,
    pub music: Option<PathBuf>,
    pub music_volume: f32,
    pub overlays: Vec<CaptionOverlay>,
    pub width: u32,
    pub height: u32,
    /// Top edge of every caption overlay.
    pub caption_y: u32,
    /// Final video length, taken from the narration.
    pub duration: f64,
    pub fps: u32,
    pub video_bitrate: String,
    pub preset: String,
    pub threads: usize,
    pub output: PathBuf,
}

/// Half of the available cores, never less than one.
pub fn encoder_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// Build the filter graph that frames the background, burns in captions
/// and mixes the audio. Video ends up in `[vout]`, audio in `[aout]`.
pub fn filter_graph(plan: &CompositePlan) -> String {
    let (w, h) = (plan.width, plan.height);
    let mut filter = String::new();

    // Crop to the canvas aspect ratio around the centre, then breathe slowly.
    filter.push_str(&format!(
        "[0:v]crop=w='min(iw,ih*{w}/{h})':h='min(ih,iw*{h}/{w})',scale={w}:{h},\
         scale=w='trunc(iw*(1.01+0.01*sin(t/4))/2)*2':h='trunc(ih*(1.01+0.01*sin(t/4))/2)*2':eval=frame,\
         crop={w}:{h},setsar=1[bg];"
    ));

    let first_overlay = if plan.music.is_some() { 3 } else { 2 };
    let mut last = "bg".to_string();
    for (i, overlay) in plan.overlays.iter().enumerate() {
        let label = format!("v{i}");
        filter.push_str(&format!(
            "[{last}][{input}:v]overlay=x=(W-w)/2:y={y}:enable='between(t,{start:.3},{end:.3})'[{label}];",
            input = first_overlay + i,
            y = plan.caption_y,
            start = overlay.start,
            end = overlay.end,
        ));
        last = label;
    }
    filter.push_str(&format!(
        "[{last}]fade=t=in:st=0:d={VIDEO_FADE_SECS},fade=t=out:st={:.3}:d={VIDEO_FADE_SECS}[vout];",
        (plan.duration - VIDEO_FADE_SECS).max(0.0)
    ));

    if plan.music.is_some() {
        filter.push_str(&format!(
            "[2:a]volume={},afade=t=in:st=0:d={MUSIC_FADE_SECS},afade=t=out:st={:.3}:d={MUSIC_FADE_SECS}[music];",
            plan.music_volume,
            (plan.duration - MUSIC_FADE_SECS).max(0.0)
        ));
        filter.push_str(&format!(
            "[1:a]afade=t=in:st=0:d={VOICE_FADE_SECS}[voice];\
             [music][voice]amix=inputs=2:duration=longest:normalize=0[aout]"
        ));
    } else {
        filter.push_str("[1:a]anull[aout]");
    }
    filter
}

/// Build the full ffmpeg argument list for `plan`.
/// Inputs are ordered background, narration, optional music, then one
/// image per caption.
pub fn composite_args(plan: &CompositePlan) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".to_string()];
    if plan.window.looped {
        args.extend(["-stream_loop".to_string(), "-1".to_string()]);
    } else {
        args.extend(["-ss".to_string(), format!("{:.3}", plan.window.start)]);
    }
    args.extend([
        "-t".to_string(),
        format!("{:.3}", plan.window.duration),
        "-i".to_string(),
        plan.background.display().to_string(),
        "-i".to_string(),
        plan.narration.display().to_string(),
    ]);
    if let Some(music) = &plan.music {
        args.extend([
            "-stream_loop".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            music.display().to_string(),
        ]);
    }
    for overlay in &plan.overlays {
        args.extend(["-i".to_string(), overlay.path.display().to_string()]);
    }
    args.extend([
        "-filter_complex".to_string(),
        filter_graph(plan),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-t".to_string(),
        format!("{:.3}", plan.duration),
        "-r".to_string(),
        plan.fps.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        plan.preset.clone(),
        "-b:v".to_string(),
        plan.video_bitrate.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-threads".to_string(),
        plan.threads.to_string(),
        plan.output.display().to_string(),
    ]);
    args
}

/// Media inspection and encoding backend used by the reel pipeline.
#[async_trait]
pub trait Compositor: Send + Sync {
    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Render `plan` into `plan.output`, returning once the file is complete.
    async fn composite(&self, plan: &CompositePlan) -> Result<()>;
}

/// Compositor that shells out to the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffmpeg;

#[async_trait]
impl Compositor for Ffmpeg {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        probe_duration(path).await
    }

    async fn composite(&self, plan: &CompositePlan) -> Result<()> {
        trace!(
            "composite(output={}, overlays={})",
            plan.output.display(),
            plan.overlays.len()
        );
        let args = composite_args(plan);
        debug!("ffmpeg {}", args.join(" "));
        let output = Command::new("ffmpeg")
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to run ffmpeg")?;
        if !output.status.success() {
            return Err(anyhow!(
                "ffmpeg failed ({}): {}",
                output.status,
                stderr_tail(&output.stderr, 10)
            ));
        }
        Ok(())
    }
}

/// Last `lines` lines of a process's stderr, where ffmpeg puts the actual error.
fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Read the container duration of `path` with ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    trace!("probe_duration(path={})", path.display());
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("failed to run ffprobe")?;
    if !output.status.success() {
        return Err(anyhow!("ffprobe failed for {}", path.display()));
    }
    parse_duration(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("cannot read duration of {}", path.display()))
}

fn parse_duration(raw: &str) -> Result<f64> {
    let secs: f64 = raw.trim().parse()?;
    if !secs.is_finite() || secs <= 0.0 {
        bail!("non-positive duration {secs}");
    }
    Ok(secs)
}
