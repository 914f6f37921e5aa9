//! Text shaping with Parley.
//!
//! Measurement during layout and line placement during rendering shape the
//! same way from a [`TextStyleResolved`], so a text box is always as big as
//! the lines later drawn into it. With no usable font (the usual case in
//! WASM) Parley yields no glyph runs and an average-advance estimate takes
//! over.

use std::borrow::Cow;

use parley::layout::{Alignment, Layout, PositionedLayoutItem};
use parley::style::{FontStack, FontWeight, LineHeight, StyleProperty};
use parley::{AlignmentOptions, FontContext, LayoutContext};
use taffy::Size;

use crate::element::TextAlign;
use crate::layout::TextStyleResolved;

pub struct TextLayoutEngine {
    font_cx: FontContext,
    layout_cx: LayoutContext<[u8; 4]>,
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
        }
    }

    /// Add a font file to the collection and return the family names it
    /// provides.
    pub fn register_font(&mut self, data: Vec<u8>) -> Vec<String> {
        let collection = &mut self.font_cx.collection;
        let registered = collection.register_fonts(data.into(), None);
        registered
            .iter()
            .filter_map(|(id, _)| collection.family_name(*id).map(str::to_string))
            .collect()
    }

    fn shape(&mut self, text: &str, style: &TextStyleResolved, max_width: Option<f32>) -> Layout<[u8; 4]> {
        let mut builder = self
            .layout_cx
            .ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontStack(FontStack::Source(Cow::Owned(
            style.font_family.clone(),
        ))));
        builder.push_default(StyleProperty::FontSize(style.font_size));
        builder.push_default(StyleProperty::FontWeight(FontWeight::new(style.font_weight as f32)));
        builder.push_default(StyleProperty::LineHeight(LineHeight::FontSizeRelative(style.line_height)));
        builder.push_default(StyleProperty::LetterSpacing(style.letter_spacing));

        let mut layout = builder.build(text);
        layout.break_all_lines(max_width);
        layout
    }

    /// Size of `text` wrapped at `max_width`, or unwrapped when `None`.
    pub fn measure(&mut self, text: &str, style: &TextStyleResolved, max_width: Option<f32>) -> Size<f32> {
        if text.is_empty() {
            return Size {
                width: 0.0,
                height: style.font_size * style.line_height,
            };
        }
        let layout = self.shape(text, style, max_width);
        let (width, height) = (layout.width(), layout.height());
        if width > 0.0 && height > 0.0 {
            return Size { width, height };
        }
        let estimate = estimate(text, style, max_width);
        Size {
            width: estimate.width,
            height: estimate.height,
        }
    }

    /// Break `text` into lines aligned within `max_width`.
    pub fn layout(&mut self, text: &str, style: &TextStyleResolved, max_width: f32) -> TextLayoutResult {
        if text.is_empty() {
            return TextLayoutResult {
                width: 0.0,
                height: style.font_size * style.line_height,
                lines: vec![],
            };
        }

        let mut layout = self.shape(text, style, Some(max_width));
        let alignment = match style.text_align {
            TextAlign::Left => Alignment::Start,
            TextAlign::Center => Alignment::Center,
        };
        layout.align(Some(max_width), alignment, AlignmentOptions::default());

        let lines: Vec<TextLine> = layout
            .lines()
            .map(|line| {
                let metrics = line.metrics();
                let mut span: Option<(usize, usize)> = None;
                let mut left: Option<f32> = None;
                let mut width = 0.0;
                for item in line.items() {
                    let PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let range = run.run().text_range();
                    span = Some(match span {
                        Some((start, end)) => (start.min(range.start), end.max(range.end)),
                        None => (range.start, range.end),
                    });
                    left = Some(left.map_or(run.offset(), |x: f32| x.min(run.offset())));
                    width += run.advance();
                }
                TextLine {
                    text: span
                        .map(|(start, end)| text[start..end].trim_end().to_string())
                        .unwrap_or_default(),
                    x: left.unwrap_or(0.0),
                    width,
                    baseline: metrics.baseline,
                    ascent: metrics.ascent,
                    descent: metrics.descent,
                }
            })
            .collect();

        if lines.iter().all(|line| line.text.is_empty()) {
            return estimate(text, style, Some(max_width));
        }

        TextLayoutResult {
            width: layout.width(),
            height: layout.height(),
            lines,
        }
    }
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct TextLayoutResult {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TextLine>,
}

/// A line of laid out text, positioned relative to the text box.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    /// Left edge after alignment
    pub x: f32,
    pub width: f32,
    pub baseline: f32,
    pub ascent: f32,
    pub descent: f32,
}

/// Average glyph advance in ems, used without fonts.
const CHAR_WIDTH_RATIO: f32 = 0.55;
const ASCENT_RATIO: f32 = 0.8;
const DESCENT_RATIO: f32 = 0.2;

fn advance(text: &str, font_size: f32, letter_spacing: f32) -> f32 {
    text.chars().count() as f32 * (font_size * CHAR_WIDTH_RATIO + letter_spacing)
}

/// Greedy word wrap against the estimated advance.
fn word_wrap(text: &str, font_size: f32, letter_spacing: f32, max_width: Option<f32>) -> Vec<String> {
    let limit = max_width.unwrap_or(f32::INFINITY);
    let space = advance(" ", font_size, letter_spacing);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = advance(word, font_size, letter_spacing);
        if line.is_empty() {
            line_width = word_width;
        } else if line_width + space + word_width > limit {
            lines.push(std::mem::take(&mut line));
            line_width = word_width;
        } else {
            line.push(' ');
            line_width += space + word_width;
        }
        line.push_str(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Font-free layout from the average advance.
fn estimate(text: &str, style: &TextStyleResolved, max_width: Option<f32>) -> TextLayoutResult {
    let size = style.font_size;
    let row = size * style.line_height;
    let ascent = size * ASCENT_RATIO;
    let descent = size * DESCENT_RATIO;
    // Half-leading keeps glyphs vertically centered in their row.
    let leading = (row - ascent - descent) / 2.0;

    let wrapped = word_wrap(text, size, style.letter_spacing, max_width);
    let widths: Vec<f32> = wrapped
        .iter()
        .map(|line| {
            let width = advance(line, size, style.letter_spacing);
            max_width.map_or(width, |max| width.min(max))
        })
        .collect();
    let widest = widths.iter().copied().fold(0.0_f32, f32::max);
    let frame = max_width.unwrap_or(widest);

    let lines = wrapped
        .into_iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (text, width))| TextLine {
            x: match style.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((frame - width) / 2.0).max(0.0),
            },
            text,
            width,
            baseline: row * i as f32 + leading + ascent,
            ascent,
            descent,
        })
        .collect::<Vec<_>>();

    TextLayoutResult {
        width: widest,
        height: row * lines.len() as f32,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(font_size: f32, letter_spacing: f32) -> TextStyleResolved {
        TextStyleResolved {
            font_size,
            letter_spacing,
            ..Default::default()
        }
    }

    #[test]
    fn test_word_wrap_respects_width() {
        // 11 px per char at size 20: "hello world" is 121 px wide.
        let lines = word_wrap("hello world again", 20.0, 0.0, Some(130.0));
        assert_eq!(lines, vec!["hello world", "again"]);
        assert_eq!(word_wrap("", 20.0, 0.0, None), vec![String::new()]);
    }

    #[test]
    fn test_letter_spacing_widens_estimate() {
        let plain = estimate("Scan me", &sized(16.0, 0.0), None);
        let spaced = estimate("Scan me", &sized(16.0, 2.0), None);
        assert!((spaced.width - plain.width - 14.0).abs() < 1e-3);
        assert_eq!(plain.height, spaced.height);
    }

    #[test]
    fn test_estimate_centers_lines() {
        let style = TextStyleResolved {
            text_align: TextAlign::Center,
            ..sized(10.0, 0.0)
        };
        let result = estimate("ab", &style, Some(100.0));
        assert_eq!(result.lines.len(), 1);
        let line = &result.lines[0];
        assert!((line.width - 11.0).abs() < 1e-3);
        assert!((line.x - 44.5).abs() < 1e-3);
    }

    #[test]
    fn test_measure_without_fonts_matches_layout() {
        let mut engine = TextLayoutEngine::new();
        let style = sized(20.0, 0.0);
        let measured = engine.measure("hello world again", &style, Some(130.0));
        let laid_out = engine.layout("hello world again", &style, 130.0);
        assert_eq!(measured.height, laid_out.height);
    }
}
