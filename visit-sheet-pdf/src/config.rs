//! Layout configuration
//!
//! Page geometry, font sizes, line heights and spacing for a visit sheet.
//! Built once at startup and shared read-only by every record render.

use crate::error::SheetError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// PDF points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

/// Convert millimetres to PDF points.
pub fn mm(value: f32) -> f32 {
    value * MM
}

/// How the title is placed on the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleAlign {
    Centered,
    Left,
}

/// Presentation variant of the sheet.
///
/// All variants share the same answer/placeholder policy; they differ only in
/// how the title, the fields and the question answers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStyle {
    /// Centered title, wrapped labels and answers.
    #[default]
    PlainWrap,
    /// Left-aligned title, fields as bordered label/value rows.
    BorderedTable,
    /// Like `BorderedTable`, with question answers set as justified paragraphs.
    JustifiedParagraph,
}

impl PresentationStyle {
    pub fn title_align(self) -> TitleAlign {
        match self {
            PresentationStyle::PlainWrap => TitleAlign::Centered,
            PresentationStyle::BorderedTable | PresentationStyle::JustifiedParagraph => {
                TitleAlign::Left
            }
        }
    }

    pub fn uses_field_table(self) -> bool {
        !matches!(self, PresentationStyle::PlainWrap)
    }

    pub fn justifies_answers(self) -> bool {
        matches!(self, PresentationStyle::JustifiedParagraph)
    }
}

/// Immutable layout settings for one rendering run. All lengths are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    // Page geometry (A4)
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub content_width: f32,
    /// Distance from the top edge to the first baseline of every page.
    pub top_offset: f32,
    /// A page break happens once the cursor drops below this height.
    pub bottom_threshold: f32,
    pub footer_y: f32,

    // Font sizes
    pub body_font_size: f32,
    pub title_font_size: f32,
    pub section_font_size: f32,
    pub footer_font_size: f32,

    // Line heights
    pub title_line_height: f32,
    pub section_line_height: f32,
    pub body_line_height: f32,
    pub placeholder_line_height: f32,

    // Vertical gaps
    pub field_gap: f32,
    pub question_gap: f32,
    pub section_gap: f32,

    // Placeholder dots
    pub dot_length: f32,
    pub dot_spacing: f32,
    pub dot_radius: f32,

    // Bordered table rows
    pub table_label_width: f32,
    pub table_padding: f32,
    pub table_line_width: f32,

    pub bullet: String,
    pub footer_label: String,
    pub style: PresentationStyle,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            page_width: 595.2756,
            page_height: 841.8898,
            margin_left: mm(25.0),
            content_width: mm(160.0),
            top_offset: mm(30.0),
            bottom_threshold: mm(25.0),
            footer_y: mm(10.0),

            body_font_size: 12.0,
            title_font_size: 16.0,
            section_font_size: 14.0,
            footer_font_size: 10.0,

            title_line_height: 20.0,
            section_line_height: 20.0,
            body_line_height: 14.0,
            placeholder_line_height: 16.0,

            field_gap: 10.0,
            question_gap: 8.0,
            section_gap: 10.0,

            dot_length: 450.0,
            dot_spacing: 6.0,
            dot_radius: 0.6,

            table_label_width: mm(55.0),
            table_padding: 4.0,
            table_line_width: 0.5,

            bullet: "• ".to_string(),
            footer_label: "Oldal".to_string(),
            style: PresentationStyle::PlainWrap,
        }
    }
}

impl SheetConfig {
    /// Load a config file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let text = std::fs::read_to_string(path).map_err(|e| SheetError::io(path, e))?;
        let config: SheetConfig = serde_json::from_str(&text)
            .map_err(|e| SheetError::json(path.display().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_style(mut self, style: PresentationStyle) -> Self {
        self.style = style;
        self
    }

    /// Baseline of the first line on a fresh page.
    pub fn top_y(&self) -> f32 {
        self.page_height - self.top_offset
    }

    /// Vertical room between the top baseline and the break threshold.
    pub fn usable_height(&self) -> f32 {
        self.top_y() - self.bottom_threshold
    }

    pub fn validate(&self) -> Result<(), SheetError> {
        let positive = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("content_width", self.content_width),
            ("body_font_size", self.body_font_size),
            ("title_font_size", self.title_font_size),
            ("section_font_size", self.section_font_size),
            ("footer_font_size", self.footer_font_size),
            ("title_line_height", self.title_line_height),
            ("section_line_height", self.section_line_height),
            ("body_line_height", self.body_line_height),
            ("placeholder_line_height", self.placeholder_line_height),
            ("dot_spacing", self.dot_spacing),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(SheetError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.usable_height() <= 0.0 {
            return Err(SheetError::InvalidConfig(
                "top_offset and bottom_threshold leave no room for content".to_string(),
            ));
        }

        if self.style.uses_field_table() && self.table_label_width >= self.content_width {
            return Err(SheetError::InvalidConfig(
                "table_label_width must be smaller than content_width".to_string(),
            ));
        }

        Ok(())
    }
}
