//! SRT output for timed captions.
//! The reel ships with a sidecar subtitle file so platforms that accept
//! uploaded captions get the same timing that was burned into the video.

use crate::subtitle::TimedCaption;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::trace;

/// Format captions as SRT text.
/// The way this works is by writing each caption as a numbered block
/// followed by a blank line, with times rounded to milliseconds.
pub fn format(captions: &[TimedCaption]) -> String {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_time(to_millis(caption.start)),
            format_time(to_millis(caption.end)),
            caption.text
        ));
    }
    out
}

/// Write captions to `path` as an SRT file.
pub fn write(captions: &[TimedCaption], path: &Path) -> Result<()> {
    trace!("srt::write path={} count={}", path.display(), captions.len());
    fs::write(path, format(captions))
        .with_context(|| format!("failed to write subtitles {}", path.display()))
}

fn to_millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

/// Format milliseconds as `HH:MM:SS,mmm`.
fn format_time(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let ms = ms % 1000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbered_blocks() {
        let captions = vec![
            TimedCaption {
                start: 0.0,
                end: 1.25,
                text: "Hello".into(),
            },
            TimedCaption {
                start: 1.25,
                end: 3723.0004,
                text: "world".into(),
            },
        ];
        let out = format(&captions);
        assert_eq!(
            out,
            "1\n00:00:00,000 --> 00:00:01,250\nHello\n\n2\n00:00:01,250 --> 01:02:03,000\nworld\n\n"
        );
    }

    #[test]
    fn rounds_to_nearest_millisecond() {
        assert_eq!(format_time(to_millis(0.0996)), "00:00:00,100");
    }
}
