//! Word wrapping and placement of caption rows on the canvas.

use super::SubtitleError;
use rusttype::{point, Font, Scale};
use std::path::Path;
use tracing::{debug, trace};

/// Horizontal space kept free across both sides of the canvas.
pub const HORIZONTAL_MARGIN: u32 = 120;

/// System fonts tried when the configured font cannot be loaded.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Width of one character, in em, for the metric-only fallback.
const FALLBACK_ADVANCE_EM: f32 = 0.6;

/// Something that can tell how wide a string renders at a given size.
pub trait TextMeasure {
    /// Rendered width of `text` in pixels.
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// Distance between the tops of two consecutive rows, in pixels.
    fn line_height(&self, font_size: f32) -> f32;
}

/// A resolved caption font.
///
/// `Glyphs` holds a parsed TrueType/OpenType font. `Metric` is the last
/// resort when no font file can be loaded: it measures text with a fixed
/// advance per character and has nothing to draw with.
#[derive(Clone)]
pub enum FontFace {
    Glyphs(Font<'static>),
    Metric,
}

impl FontFace {
    /// Load the font at `path`, silently falling back to a system font or
    /// to the metric-only face when that fails.
    pub fn load(path: &Path) -> Self {
        trace!("FontFace::load(path={})", path.display());
        if let Some(font) = read_font(path) {
            return FontFace::Glyphs(font);
        }
        debug!("could not load font {}, trying fallbacks", path.display());
        for candidate in FALLBACK_FONTS {
            if let Some(font) = read_font(Path::new(candidate)) {
                debug!("using fallback font {}", candidate);
                return FontFace::Glyphs(font);
            }
        }
        debug!("no fallback font found, captions are measured but not drawn");
        FontFace::Metric
    }

    /// The parsed font, if this face can draw glyphs.
    pub fn glyphs(&self) -> Option<&Font<'static>> {
        match self {
            FontFace::Glyphs(font) => Some(font),
            FontFace::Metric => None,
        }
    }
}

fn read_font(path: &Path) -> Option<Font<'static>> {
    let bytes = std::fs::read(path).ok()?;
    Font::try_from_vec(bytes)
}

impl TextMeasure for FontFace {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            FontFace::Glyphs(font) => {
                let scale = Scale::uniform(font_size);
                font.layout(text, scale, point(0.0, 0.0))
                    .last()
                    .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                    .unwrap_or(0.0)
            }
            FontFace::Metric => text.chars().count() as f32 * font_size * FALLBACK_ADVANCE_EM,
        }
    }

    fn line_height(&self, font_size: f32) -> f32 {
        match self {
            FontFace::Glyphs(font) => {
                let v = font.v_metrics(Scale::uniform(font_size));
                v.ascent - v.descent + v.line_gap
            }
            FontFace::Metric => font_size * 1.2,
        }
    }
}

/// A wrapped row and the top-left position it is drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// All rows of one caption, stacked and centred on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBlock {
    pub rows: Vec<PlacedRow>,
    pub line_height: f32,
}

impl LayoutBlock {
    /// Bottom edge of the last row.
    pub fn bottom(&self) -> f32 {
        self.rows
            .last()
            .map(|r| r.y + self.line_height)
            .unwrap_or(0.0)
    }
}

/// Wrap `text` into rows that fit the canvas width minus the margins.
///
/// Words are packed left to right. A word joins the current row only when
/// the resulting row measures narrower than the available width. A word
/// that is wider than the whole budget is still placed, alone on its row.
pub fn layout_for_canvas<M: TextMeasure + ?Sized>(
    text: &str,
    canvas_width: u32,
    font: &M,
    font_size: f32,
) -> Result<Vec<String>, SubtitleError> {
    trace!(
        "layout_for_canvas(text={:?}, canvas_width={}, font_size={})",
        text,
        canvas_width,
        font_size
    );
    if text.trim().is_empty() {
        return Err(SubtitleError::InvalidInput(
            "caption text is empty".to_string(),
        ));
    }
    if canvas_width <= HORIZONTAL_MARGIN {
        return Err(SubtitleError::InvalidInput(format!(
            "canvas width {canvas_width} leaves no room inside the {HORIZONTAL_MARGIN}px margin"
        )));
    }
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(SubtitleError::InvalidInput(format!(
            "font size must be positive, got {font_size}"
        )));
    }

    let budget = (canvas_width - HORIZONTAL_MARGIN) as f32;
    let mut rows = Vec::new();
    let mut row = String::new();
    for word in text.split_whitespace() {
        if row.is_empty() {
            row.push_str(word);
            continue;
        }
        let candidate = format!("{row} {word}");
        if font.text_width(&candidate, font_size) < budget {
            row = candidate;
        } else {
            rows.push(std::mem::replace(&mut row, word.to_string()));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    Ok(rows)
}

/// Stack `rows` downward from `top_offset`, centring each one horizontally.
pub fn place_rows<M: TextMeasure + ?Sized>(
    rows: &[String],
    canvas_width: u32,
    font: &M,
    font_size: f32,
    top_offset: f32,
) -> LayoutBlock {
    let line_height = font.line_height(font_size);
    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let width = font.text_width(text, font_size);
            PlacedRow {
                text: text.clone(),
                x: (canvas_width as f32 - width) / 2.0,
                y: top_offset + i as f32 * line_height,
            }
        })
        .collect();
    LayoutBlock { rows, line_height }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is as wide as the font size; rows are two pixels taller.
    struct Mono;

    impl TextMeasure for Mono {
        fn text_width(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * font_size
        }

        fn line_height(&self, font_size: f32) -> f32 {
            font_size + 2.0
        }
    }

    #[test]
    fn packs_words_until_budget() {
        // 250px canvas leaves 130px, so rows must stay under 13 characters.
        let rows = layout_for_canvas("aaa bbb ccc ddd eee", 250, &Mono, 10.0).unwrap();
        assert_eq!(rows, vec!["aaa bbb ccc", "ddd eee"]);
        for row in &rows {
            assert!(Mono.text_width(row, 10.0) < 130.0);
        }
    }

    #[test]
    fn exact_budget_width_starts_new_row() {
        // "aaaaaa bbbbbb" is 13 characters, exactly 130px.
        let rows = layout_for_canvas("aaaaaa bbbbbb", 250, &Mono, 10.0).unwrap();
        assert_eq!(rows, vec!["aaaaaa", "bbbbbb"]);
    }

    #[test]
    fn wide_word_overflows_on_its_own_row() {
        let wide = "w".repeat(20);
        let text = format!("hi {wide} there");
        let rows = layout_for_canvas(&text, 250, &Mono, 10.0).unwrap();
        assert_eq!(rows, vec!["hi".to_string(), wide, "there".to_string()]);
        assert!(rows.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn leading_wide_word_does_not_leave_empty_row() {
        let wide = "w".repeat(20);
        let rows = layout_for_canvas(&wide, 250, &Mono, 10.0).unwrap();
        assert_eq!(rows, vec![wide]);
    }

    #[test]
    fn never_splits_words() {
        let text = "layout keeps every single word intact across rows";
        let rows = layout_for_canvas(text, 300, &Mono, 10.0).unwrap();
        let rejoined: Vec<&str> = rows.iter().flat_map(|r| r.split(' ')).collect();
        assert_eq!(rejoined, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(layout_for_canvas("   ", 1080, &Mono, 10.0).is_err());
        assert!(layout_for_canvas("hi", 120, &Mono, 10.0).is_err());
        assert!(layout_for_canvas("hi", 1080, &Mono, 0.0).is_err());
    }

    #[test]
    fn places_rows_centred_and_stacked() {
        let rows = vec!["abc".to_string(), "abcdefg".to_string()];
        let block = place_rows(&rows, 200, &Mono, 10.0, 20.0);
        assert_eq!(block.rows[0].x, 85.0);
        assert_eq!(block.rows[0].y, 20.0);
        assert_eq!(block.rows[1].x, 65.0);
        assert_eq!(block.rows[1].y, 32.0);
        assert_eq!(block.bottom(), 44.0);
    }

    #[test]
    fn missing_font_falls_back_silently() {
        let face = FontFace::load(Path::new("/definitely/not/here.ttf"));
        assert!(face.text_width("hello", 60.0) > 0.0);
        assert!(face.line_height(60.0) > 0.0);
    }

    #[test]
    fn metric_face_measures_by_character() {
        let width = FontFace::Metric.text_width("abcd", 10.0);
        assert!((width - 24.0).abs() < 1e-3);
    }

    /// Real glyph metrics, checked against whichever system font is installed.
    #[test]
    fn glyph_face_measures_real_text() {
        let Some(face) = FALLBACK_FONTS
            .iter()
            .filter_map(|p| read_font(Path::new(p)))
            .map(FontFace::Glyphs)
            .next()
        else {
            return;
        };
        let short = face.text_width("Hi", 60.0);
        let long = face.text_width("Hi there, friend", 60.0);
        assert!(short > 0.0);
        assert!(long > short);
        assert_eq!(face.text_width("", 60.0), 0.0);
        assert!(face.line_height(60.0) > 0.0);

        let text = "Captions wrap against the real advance widths of the installed font";
        let rows = layout_for_canvas(text, 1080, &face, 60.0).unwrap();
        assert!(rows.len() > 1);
        for row in &rows {
            assert!(face.text_width(row, 60.0) < 960.0 || !row.contains(' '));
        }
    }
}
