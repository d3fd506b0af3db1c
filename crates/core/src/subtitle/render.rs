//! Rendering of timed captions into transparent PNG overlays.

use super::layout::{layout_for_canvas, place_rows, FontFace, LayoutBlock};
use super::{SubtitleError, TimedCaption};
use crate::config::ReelConfig;
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::Scale;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Overlays are never shorter than this, matching the stock caption band.
const MIN_OVERLAY_HEIGHT: u32 = 250;

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A caption image on disk and the window it is shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOverlay {
    pub path: PathBuf,
    pub start: f64,
    pub end: f64,
}

/// Wrap and place `text` for the configured canvas.
pub fn caption_block(
    text: &str,
    config: &ReelConfig,
    face: &FontFace,
) -> Result<LayoutBlock, SubtitleError> {
    let rows = layout_for_canvas(text, config.width, face, config.font_size)?;
    Ok(place_rows(
        &rows,
        config.width,
        face,
        config.font_size,
        config.caption_top_offset as f32,
    ))
}

/// Draw one caption onto a transparent image as wide as the canvas.
pub fn render_caption(
    text: &str,
    config: &ReelConfig,
    face: &FontFace,
) -> Result<RgbaImage, SubtitleError> {
    let block = caption_block(text, config, face)?;
    let height =
        (block.bottom().ceil() as u32 + config.caption_top_offset).max(MIN_OVERLAY_HEIGHT);
    let mut img = RgbaImage::new(config.width, height);
    if let Some(font) = face.glyphs() {
        let scale = Scale::uniform(config.font_size);
        for row in &block.rows {
            draw_text_mut(
                &mut img,
                TEXT_COLOR,
                row.x.round() as i32,
                row.y.round() as i32,
                scale,
                font,
                &row.text,
            );
        }
    }
    Ok(img)
}

/// Render every caption to `caption_NNNN.png` inside `dir`.
pub fn render_captions(
    captions: &[TimedCaption],
    config: &ReelConfig,
    face: &FontFace,
    dir: &Path,
) -> Result<Vec<CaptionOverlay>> {
    trace!(
        "render_captions(count={}, dir={})",
        captions.len(),
        dir.display()
    );
    let mut overlays = Vec::with_capacity(captions.len());
    for (i, caption) in captions.iter().enumerate() {
        let img = render_caption(&caption.text, config, face)?;
        let path = dir.join(format!("caption_{i:04}.png"));
        img.save(&path)
            .with_context(|| format!("failed to write caption overlay {}", path.display()))?;
        debug!(
            "rendered caption {} [{:.2}s, {:.2}s) to {}",
            i,
            caption.start,
            caption.end,
            path.display()
        );
        overlays.push(CaptionOverlay {
            path,
            start: caption.start,
            end: caption.end,
        });
    }
    Ok(overlays)
}
