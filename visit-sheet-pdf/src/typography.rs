//! Text layout: greedy line wrapping and justified paragraphs
//!
//! Words are the whitespace-separated tokens of the input and are never split.
//! A word wider than the available width is set alone on its own line.

use crate::fonts::TextMeasure;

/// Break `text` into lines no wider than `max_width` at `font_size`.
///
/// Empty or whitespace-only input yields no lines. Joining the result with
/// single spaces reproduces the word sequence of the input.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    text: &str,
    max_width: f32,
    font_size: f32,
    measure: &M,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure.text_width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// One line of a paragraph, with the extra spacing needed to fill the width.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedLine {
    pub words: Vec<String>,
    /// Width of the words joined by single spaces.
    pub natural_width: f32,
    /// Added to every inter-word gap.
    pub extra_word_spacing: f32,
}

impl FormattedLine {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    pub fn gap_count(&self) -> usize {
        self.words.len().saturating_sub(1)
    }

    pub fn is_justified(&self) -> bool {
        self.extra_word_spacing > 0.0
    }

    /// Width of the line as drawn.
    pub fn set_width(&self) -> f32 {
        self.natural_width + self.extra_word_spacing * self.gap_count() as f32
    }
}

/// A wrapped block of text drawn as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedParagraph {
    pub lines: Vec<FormattedLine>,
    pub font_size: f32,
    /// Baseline-to-baseline distance.
    pub leading: f32,
    pub height: f32,
}

/// Spread the slack of `line` evenly over its inter-word gaps.
pub fn justify_line<M: TextMeasure + ?Sized>(
    line: &str,
    max_width: f32,
    font_size: f32,
    measure: &M,
) -> FormattedLine {
    let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let natural_width = measure.text_width(&words.join(" "), font_size);
    let gaps = words.len().saturating_sub(1);
    let slack = max_width - natural_width;

    let extra_word_spacing = if gaps == 0 || slack <= 0.0 {
        0.0
    } else {
        slack / gaps as f32
    };

    FormattedLine {
        words,
        natural_width,
        extra_word_spacing,
    }
}

/// Wrap `text` and justify every line except the last.
pub fn layout_paragraph<M: TextMeasure + ?Sized>(
    text: &str,
    max_width: f32,
    font_size: f32,
    leading: f32,
    measure: &M,
) -> FormattedParagraph {
    let wrapped = wrap_text(text, max_width, font_size, measure);
    let last = wrapped.len().saturating_sub(1);

    let lines: Vec<FormattedLine> = wrapped
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == last {
                // Last line keeps natural spacing.
                justify_line(line, 0.0, font_size, measure)
            } else {
                justify_line(line, max_width, font_size, measure)
            }
        })
        .collect();

    let height = lines.len() as f32 * leading;
    FormattedParagraph {
        lines,
        font_size,
        leading,
        height,
    }
}
