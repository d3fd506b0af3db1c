//! Caption timing and layout for the reel canvas.
//! Narration text is split into timed caption lines, then each caption is
//! word-wrapped against the canvas width for rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

pub mod layout;
pub mod render;

pub use layout::{layout_for_canvas, place_rows, FontFace, LayoutBlock, PlacedRow, TextMeasure};

/// Shortest time a caption stays on screen, in seconds.
pub const MIN_CAPTION_SECS: f64 = 0.8;

/// Chunk width used when the script is not already split into captions.
pub const WRAP_WIDTH: usize = 70;

/// Lower bound for the character total so tiny scripts don't get huge captions.
const MIN_TOTAL_CHARS: usize = 16;

/// Errors raised by the timing and layout engine.
#[derive(Debug, Error, PartialEq)]
pub enum SubtitleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A caption line with its time window, in seconds from the start of the narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCaption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedCaption {
    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split narration into contiguous timed captions.
///
/// Each non-blank line of the script becomes a caption. Scripts with two
/// lines or fewer are treated as prose and wrapped into chunks of at most
/// [`WRAP_WIDTH`] characters instead. Time is shared out in proportion to
/// line length over `target_secs`, with every caption lasting at least
/// [`MIN_CAPTION_SECS`].
pub fn segment(text: &str, target_secs: f64) -> Result<Vec<TimedCaption>, SubtitleError> {
    trace!(
        "segment(chars={}, target_secs={})",
        text.chars().count(),
        target_secs
    );
    if !target_secs.is_finite() || target_secs <= 0.0 {
        return Err(SubtitleError::InvalidInput(format!(
            "target duration must be positive, got {target_secs}"
        )));
    }
    if text.trim().is_empty() {
        return Err(SubtitleError::InvalidInput(
            "narration text is empty".to_string(),
        ));
    }

    let mut lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.len() <= 2 {
        lines = wrap_words(text, WRAP_WIDTH);
    }

    let total_chars: usize = lines.iter().map(|l| l.chars().count()).sum();
    let denominator = total_chars.max(MIN_TOTAL_CHARS) as f64;
    let mut pos = 0.0;
    let captions = lines
        .into_iter()
        .map(|line| {
            let share = line.chars().count() as f64 / denominator;
            let duration = (share * target_secs).max(MIN_CAPTION_SECS);
            let caption = TimedCaption {
                start: pos,
                end: pos + duration,
                text: line,
            };
            pos += duration;
            caption
        })
        .collect();
    Ok(captions)
}

/// Greedily pack the words of `text` into chunks no longer than `width`
/// characters. Words are never split, so a word longer than `width` sits
/// alone in its own chunk.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_contiguous(captions: &[TimedCaption]) {
        assert_eq!(captions[0].start, 0.0);
        for pair in captions.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < EPS);
        }
    }

    /// Short prose falls back to wrapping and fills the whole target.
    #[test]
    fn single_sentence_is_one_chunk() {
        let captions = segment("Hello world, how are you?", 10.0).unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].start, 0.0);
        assert!((captions[0].end - 10.0).abs() < EPS);
    }

    /// Under 16 characters the floor shortens the only caption.
    #[test]
    fn very_short_sentence_is_scaled_by_char_floor() {
        let captions = segment("Hello world", 10.0).unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "Hello world");
        assert!((captions[0].end - 6.875).abs() < EPS);
    }

    /// Pre-segmented lines get time in proportion to their length.
    #[test]
    fn proportional_durations_for_presegmented_lines() {
        let text = format!("{}\n{}\n{}\n", "a".repeat(10), "b".repeat(20), "c".repeat(30));
        let captions = segment(&text, 60.0).unwrap();
        let durations: Vec<f64> = captions.iter().map(TimedCaption::duration).collect();
        let starts: Vec<f64> = captions.iter().map(|c| c.start).collect();
        for (got, want) in durations.iter().zip([10.0, 20.0, 30.0]) {
            assert!((got - want).abs() < EPS, "{got} != {want}");
        }
        for (got, want) in starts.iter().zip([0.0, 10.0, 30.0]) {
            assert!((got - want).abs() < EPS, "{got} != {want}");
        }
    }

    /// Durations add up to the target and windows never overlap.
    #[test]
    fn durations_sum_to_target() {
        let text = "The quick brown fox\n\n  jumps over the lazy dog  \nand keeps running\nuntil sunset\n";
        let captions = segment(text, 42.5).unwrap();
        assert_eq!(captions.len(), 4);
        assert_eq!(captions[1].text, "jumps over the lazy dog");
        let total: f64 = captions.iter().map(TimedCaption::duration).sum();
        assert!((total - 42.5).abs() < 1e-6);
        assert_contiguous(&captions);
    }

    /// Very short lines are held on screen for the minimum time.
    #[test]
    fn short_lines_respect_floor() {
        let text = "a\nb\nc\nthis line is much much longer than the others";
        let captions = segment(text, 5.0).unwrap();
        assert!(captions.iter().all(|c| c.duration() >= MIN_CAPTION_SECS - EPS));
        assert!((captions[0].duration() - MIN_CAPTION_SECS).abs() < EPS);
        assert_contiguous(&captions);
    }

    /// Tiny scripts use the 16 character floor for the total.
    #[test]
    fn tiny_script_uses_char_floor() {
        let captions = segment("abcd\nefgh\nijkl", 16.0).unwrap();
        assert_eq!(captions.len(), 3);
        assert!((captions[0].duration() - 4.0).abs() < EPS);
        assert!((captions[2].end - 12.0).abs() < EPS);
    }

    /// Long prose on two lines is rewrapped at word boundaries.
    #[test]
    fn prose_is_wrapped_at_word_boundaries() {
        let text = "Rust makes it possible to write fast and reliable software without a garbage collector.\nIt also has great tooling and a friendly community that helps newcomers.";
        let captions = segment(text, 30.0).unwrap();
        assert!(captions.len() > 2);
        let words: Vec<&str> = text.split_whitespace().collect();
        let rejoined: Vec<&str> = captions.iter().flat_map(|c| c.text.split(' ')).collect();
        assert_eq!(words, rejoined);
        assert!(captions.iter().all(|c| c.text.chars().count() <= WRAP_WIDTH));
        assert_contiguous(&captions);
    }

    #[test]
    fn overlong_word_gets_its_own_chunk() {
        let long = "x".repeat(90);
        let chunks = wrap_words(&format!("start {long} end"), WRAP_WIDTH);
        assert_eq!(chunks, vec!["start".to_string(), long, "end".to_string()]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let word = "é".repeat(34);
        let chunks = wrap_words(&format!("{word} {word}"), WRAP_WIDTH);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn rejects_blank_narration() {
        assert!(matches!(
            segment(" \n\t\n ", 55.0),
            Err(SubtitleError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_bad_target() {
        for target in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                segment("hello", target),
                Err(SubtitleError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn segmenting_is_repeatable() {
        let text = "one line here\nanother one\nand a third\n";
        assert_eq!(segment(text, 55.0).unwrap(), segment(text, 55.0).unwrap());
    }
}
