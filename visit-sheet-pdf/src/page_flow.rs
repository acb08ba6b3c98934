//! Vertical cursor and page breaking
//!
//! The cursor is a small value type: every flow operation takes the current
//! cursor and returns the updated one, so a rendering pass has no hidden
//! position state.

use crate::canvas::Canvas;
use crate::config::SheetConfig;
use anyhow::Result;

/// Drawing position within the current page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Baseline of the next line, in points from the bottom edge.
    pub y: f32,
    pub font_size: f32,
}

impl Cursor {
    /// Move down by `dy` points.
    pub fn advance(self, dy: f32) -> Self {
        Self {
            y: self.y - dy,
            ..self
        }
    }

    pub fn with_font_size(self, font_size: f32) -> Self {
        Self { font_size, ..self }
    }
}

pub struct PageFlow<'c> {
    config: &'c SheetConfig,
}

impl<'c> PageFlow<'c> {
    pub fn new(config: &'c SheetConfig) -> Self {
        Self { config }
    }

    /// Cursor at the top of a fresh page with the body font.
    pub fn top(&self) -> Cursor {
        Cursor {
            y: self.config.top_y(),
            font_size: self.config.body_font_size,
        }
    }

    pub fn is_at_top(&self, cursor: Cursor) -> bool {
        cursor.y >= self.config.top_y()
    }

    /// True if a block of this height fits on an empty page.
    pub fn fits_on_page(&self, block_height: f32) -> bool {
        block_height <= self.config.usable_height()
    }

    /// Break the page once the cursor has dropped below the bottom threshold.
    ///
    /// Must run after every line advance.
    pub fn paginate<C: Canvas + ?Sized>(&self, canvas: &mut C, cursor: Cursor) -> Result<Cursor> {
        if cursor.y < self.config.bottom_threshold {
            self.break_page(canvas)
        } else {
            Ok(cursor)
        }
    }

    /// Make room for a block drawn as one unit.
    ///
    /// Breaks the page first when the block would cross the bottom threshold,
    /// unless the cursor already sits at the top of a page or the block is
    /// taller than any page can hold.
    pub fn reserve<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        block_height: f32,
    ) -> Result<Cursor> {
        let overflows = cursor.y - block_height < self.config.bottom_threshold;
        if overflows && !self.is_at_top(cursor) && self.fits_on_page(block_height) {
            self.break_page(canvas)
        } else {
            Ok(cursor)
        }
    }

    /// Stamp the page number of the current page.
    pub fn draw_footer<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let text = format!("{} {}", self.config.footer_label, canvas.page_number());
        canvas.draw_text_centered(
            self.config.page_width / 2.0,
            self.config.footer_y,
            self.config.footer_font_size,
            &text,
        );
    }

    /// Footer for the last page, then close the document.
    pub fn finish<C: Canvas + ?Sized>(&self, canvas: &mut C) -> Result<()> {
        self.draw_footer(canvas);
        canvas.finish()
    }

    fn break_page<C: Canvas + ?Sized>(&self, canvas: &mut C) -> Result<Cursor> {
        self.draw_footer(canvas);
        canvas.show_page()?;
        log::trace!("Page break, now on page {}", canvas.page_number());
        Ok(self.top())
    }
}
