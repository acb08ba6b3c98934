//! Drawing surface used by the sheet generator
//!
//! The generator only needs to measure text, draw text and a few shapes, and
//! advance to the next page. `PdfCanvas` (in `pdf_canvas`) writes a real PDF;
//! `RecordingCanvas` keeps the drawing operations in memory for dry runs and
//! tests.

use crate::fonts::TextMeasure;
use crate::typography::FormattedLine;
use anyhow::Result;

/// Drawing primitives. Coordinates are PDF points with the origin at the
/// bottom-left corner of the page; text `y` is the baseline.
pub trait Canvas: TextMeasure {
    fn draw_text(&mut self, x: f32, y: f32, font_size: f32, text: &str);

    fn draw_text_centered(&mut self, center_x: f32, y: f32, font_size: f32, text: &str) {
        let width = self.text_width(text, font_size);
        self.draw_text(center_x - width / 2.0, y, font_size, text);
    }

    /// Draw a line with `extra_word_spacing` added to every gap between words.
    fn draw_justified(&mut self, x: f32, y: f32, font_size: f32, line: &FormattedLine);

    /// Stroked circle, the unit of a placeholder line.
    fn draw_dot(&mut self, x: f32, y: f32, radius: f32);

    /// Stroked rectangle with its bottom-left corner at (x, y).
    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32);

    /// Number of the page currently being drawn, starting at 1.
    fn page_number(&self) -> u32;

    /// Finish the current page and continue on a new one.
    fn show_page(&mut self) -> Result<()>;

    /// Finish the last page. Nothing may be drawn afterwards.
    fn finish(&mut self) -> Result<()>;
}

/// A drawing operation captured by `RecordingCanvas`.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        page: u32,
        x: f32,
        y: f32,
        font_size: f32,
        text: String,
    },
    Justified {
        page: u32,
        x: f32,
        y: f32,
        font_size: f32,
        text: String,
        extra_word_spacing: f32,
    },
    Dot {
        page: u32,
        x: f32,
        y: f32,
        radius: f32,
    },
    Rect {
        page: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
    EndPage {
        page: u32,
    },
}

impl DrawOp {
    pub fn page(&self) -> u32 {
        match self {
            DrawOp::Text { page, .. }
            | DrawOp::Justified { page, .. }
            | DrawOp::Dot { page, .. }
            | DrawOp::Rect { page, .. }
            | DrawOp::EndPage { page } => *page,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } | DrawOp::Justified { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A run of dots sharing one baseline: one drawn placeholder line.
#[derive(Debug, Clone, PartialEq)]
pub struct DottedRow {
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub dots: usize,
}

/// In-memory canvas that records what would be drawn.
pub struct RecordingCanvas<'m, M: TextMeasure + ?Sized> {
    measure: &'m M,
    ops: Vec<DrawOp>,
    page: u32,
    finished: bool,
}

impl<'m, M: TextMeasure + ?Sized> RecordingCanvas<'m, M> {
    pub fn new(measure: &'m M) -> Self {
        Self {
            measure,
            ops: Vec::new(),
            page: 1,
            finished: false,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text of every text operation, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops.iter().filter_map(DrawOp::text).collect()
    }

    pub fn page_count(&self) -> u32 {
        self.page
    }

    /// Group consecutive dots on the same page and baseline into rows.
    pub fn dotted_rows(&self) -> Vec<DottedRow> {
        let mut rows: Vec<DottedRow> = Vec::new();
        let mut previous_was_dot = false;

        for op in &self.ops {
            match op {
                DrawOp::Dot { page, x, y, .. } => {
                    let continues = previous_was_dot
                        && rows
                            .last()
                            .map(|row| row.page == *page && row.y == *y)
                            .unwrap_or(false);
                    if continues {
                        if let Some(row) = rows.last_mut() {
                            row.dots += 1;
                        }
                    } else {
                        rows.push(DottedRow {
                            page: *page,
                            x: *x,
                            y: *y,
                            dots: 1,
                        });
                    }
                    previous_was_dot = true;
                }
                _ => previous_was_dot = false,
            }
        }

        rows
    }
}

impl<M: TextMeasure + ?Sized> TextMeasure for RecordingCanvas<'_, M> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.measure.text_width(text, font_size)
    }
}

impl<M: TextMeasure + ?Sized> Canvas for RecordingCanvas<'_, M> {
    fn draw_text(&mut self, x: f32, y: f32, font_size: f32, text: &str) {
        self.ops.push(DrawOp::Text {
            page: self.page,
            x,
            y,
            font_size,
            text: text.to_string(),
        });
    }

    fn draw_justified(&mut self, x: f32, y: f32, font_size: f32, line: &FormattedLine) {
        self.ops.push(DrawOp::Justified {
            page: self.page,
            x,
            y,
            font_size,
            text: line.text(),
            extra_word_spacing: line.extra_word_spacing,
        });
    }

    fn draw_dot(&mut self, x: f32, y: f32, radius: f32) {
        self.ops.push(DrawOp::Dot {
            page: self.page,
            x,
            y,
            radius,
        });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32) {
        self.ops.push(DrawOp::Rect {
            page: self.page,
            x,
            y,
            width,
            height,
            line_width,
        });
    }

    fn page_number(&self) -> u32 {
        self.page
    }

    fn show_page(&mut self) -> Result<()> {
        self.ops.push(DrawOp::EndPage { page: self.page });
        self.page += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.ops.push(DrawOp::EndPage { page: self.page });
            self.finished = true;
        }
        Ok(())
    }
}
