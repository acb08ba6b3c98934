//! Visit sheet generation
//!
//! Walks a template in order (title, fields, sections with their questions)
//! and, for every answer slot, draws either the record's answer or the
//! requested number of dotted placeholder lines. Never both.

use crate::canvas::{Canvas, RecordingCanvas};
use crate::config::{SheetConfig, TitleAlign};
use crate::fonts::{FontContext, TextMeasure};
use crate::page_flow::{Cursor, PageFlow};
use crate::pdf_canvas::PdfCanvas;
use crate::template::{Field, Question, Record, Section, Template};
use crate::typography::{layout_paragraph, wrap_text};
use anyhow::{Context, Result};
use std::path::Path;

/// Share of the font size above the baseline, used to place table borders.
const ASCENT_RATIO: f32 = 0.8;

/// What a rendering pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub pages: u32,
    /// Slots that showed an answer.
    pub answered_slots: usize,
    /// Slots that showed placeholder lines.
    pub empty_slots: usize,
    pub answer_lines: usize,
    pub placeholder_lines: usize,
}

/// Draw a placeholder line: dots at `x`, `x + spacing`, ... while the
/// position stays below `x + length`.
pub fn draw_dotted_line<C: Canvas + ?Sized>(
    canvas: &mut C,
    x: f32,
    y: f32,
    length: f32,
    spacing: f32,
    radius: f32,
) {
    if spacing <= 0.0 {
        return;
    }
    let end = x + length;
    let mut index = 0u32;
    loop {
        let pos = x + index as f32 * spacing;
        if pos >= end {
            break;
        }
        canvas.draw_dot(pos, y, radius);
        index += 1;
    }
}

pub struct SheetRenderer<'a> {
    config: &'a SheetConfig,
    flow: PageFlow<'a>,
}

impl<'a> SheetRenderer<'a> {
    pub fn new(config: &'a SheetConfig) -> Self {
        Self {
            config,
            flow: PageFlow::new(config),
        }
    }

    /// Render one record onto `canvas` and finish the document.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        template: &Template,
        record: &Record,
        canvas: &mut C,
    ) -> Result<RenderSummary> {
        let mut summary = RenderSummary::default();
        let mut cursor = self.flow.top();

        if let Some(title) = &template.title {
            cursor = self.render_title(canvas, cursor, title)?;
        }

        for field in &template.fields {
            cursor = self.render_field(canvas, cursor, field, record, &mut summary)?;
        }

        for section in &template.sections {
            cursor = self.render_section(canvas, cursor, section, record, &mut summary)?;
        }

        self.flow.finish(canvas)?;
        summary.pages = canvas.page_number();
        Ok(summary)
    }

    fn render_title<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        title: &str,
    ) -> Result<Cursor> {
        let size = self.config.title_font_size;
        let lines = wrap_text(title, self.config.content_width, size, &*canvas);
        self.draw_lines(
            canvas,
            cursor,
            &lines,
            size,
            self.config.title_line_height,
            self.config.style.title_align(),
        )
    }

    fn render_field<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        field: &Field,
        record: &Record,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let answer = record.answer(field.id.as_deref())?;

        let cursor = if self.config.style.uses_field_table() {
            self.draw_table_row(canvas, cursor, &field.label, answer.as_deref(), field.lines, summary)?
        } else {
            let cursor = self.draw_wrapped(canvas, cursor, &field.label)?;
            self.draw_answer(canvas, cursor, answer.as_deref(), field.lines, false, summary)?
        };

        self.flow
            .paginate(canvas, cursor.advance(self.config.field_gap))
    }

    fn render_section<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        section: &Section,
        record: &Record,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let size = self.config.section_font_size;
        let lines = wrap_text(&section.title, self.config.content_width, size, &*canvas);
        let mut cursor = self.draw_lines(
            canvas,
            cursor,
            &lines,
            size,
            self.config.section_line_height,
            TitleAlign::Left,
        )?;

        for question in &section.questions {
            cursor = self.render_question(canvas, cursor, question, record, summary)?;
        }

        self.flow
            .paginate(canvas, cursor.advance(self.config.section_gap))
    }

    fn render_question<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        question: &Question,
        record: &Record,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let text = format!("{}{}", self.config.bullet, question.text);
        let cursor = self.draw_wrapped(canvas, cursor, &text)?;

        let answer = record.answer(question.id.as_deref())?;
        let justify = self.config.style.justifies_answers();
        let cursor = self.draw_answer(canvas, cursor, answer.as_deref(), question.lines, justify, summary)?;

        self.flow
            .paginate(canvas, cursor.advance(self.config.question_gap))
    }

    /// The answer if there is one, otherwise `lines` placeholder lines.
    fn draw_answer<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        answer: Option<&str>,
        lines: u32,
        justify: bool,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        match answer {
            Some(text) => {
                summary.answered_slots += 1;
                if justify {
                    self.draw_justified_paragraph(canvas, cursor, text, summary)
                } else {
                    let wrapped = wrap_text(
                        text,
                        self.config.content_width,
                        self.config.body_font_size,
                        &*canvas,
                    );
                    summary.answer_lines += wrapped.len();
                    self.draw_lines(
                        canvas,
                        cursor,
                        &wrapped,
                        self.config.body_font_size,
                        self.config.body_line_height,
                        TitleAlign::Left,
                    )
                }
            }
            None => {
                summary.empty_slots += 1;
                self.draw_placeholders(canvas, cursor, lines, summary)
            }
        }
    }

    /// Body text wrapped to the content width.
    fn draw_wrapped<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        text: &str,
    ) -> Result<Cursor> {
        let size = self.config.body_font_size;
        let lines = wrap_text(text, self.config.content_width, size, &*canvas);
        self.draw_lines(
            canvas,
            cursor,
            &lines,
            size,
            self.config.body_line_height,
            TitleAlign::Left,
        )
    }

    /// Draw wrapped lines one by one, paginating after each.
    fn draw_lines<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        lines: &[String],
        font_size: f32,
        line_height: f32,
        align: TitleAlign,
    ) -> Result<Cursor> {
        let mut cursor = cursor;
        for line in lines {
            // A page break resets the font; set it again for every line.
            cursor = cursor.with_font_size(font_size);
            match align {
                TitleAlign::Centered => canvas.draw_text_centered(
                    self.config.page_width / 2.0,
                    cursor.y,
                    cursor.font_size,
                    line,
                ),
                TitleAlign::Left => {
                    canvas.draw_text(self.config.margin_left, cursor.y, cursor.font_size, line)
                }
            }
            cursor = self.flow.paginate(canvas, cursor.advance(line_height))?;
        }
        Ok(cursor.with_font_size(self.config.body_font_size))
    }

    fn draw_placeholders<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        count: u32,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let mut cursor = cursor;
        for _ in 0..count {
            draw_dotted_line(
                canvas,
                self.config.margin_left,
                cursor.y,
                self.config.dot_length,
                self.config.dot_spacing,
                self.config.dot_radius,
            );
            summary.placeholder_lines += 1;
            cursor = self
                .flow
                .paginate(canvas, cursor.advance(self.config.placeholder_line_height))?;
        }
        Ok(cursor)
    }

    /// A justified paragraph is placed as one block at its measured height.
    fn draw_justified_paragraph<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        text: &str,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let size = self.config.body_font_size;
        let paragraph = layout_paragraph(
            text,
            self.config.content_width,
            size,
            self.config.body_line_height,
            &*canvas,
        );
        summary.answer_lines += paragraph.lines.len();

        if !self.flow.fits_on_page(paragraph.height) {
            log::debug!(
                "Paragraph of {} lines exceeds a page, setting it line by line",
                paragraph.lines.len()
            );
            let mut cursor = cursor;
            for line in &paragraph.lines {
                canvas.draw_justified(self.config.margin_left, cursor.y, size, line);
                cursor = self.flow.paginate(canvas, cursor.advance(paragraph.leading))?;
            }
            return Ok(cursor);
        }

        let cursor = self.flow.reserve(canvas, cursor, paragraph.height)?;
        for (i, line) in paragraph.lines.iter().enumerate() {
            let y = cursor.y - i as f32 * paragraph.leading;
            canvas.draw_justified(self.config.margin_left, y, size, line);
        }
        self.flow.paginate(canvas, cursor.advance(paragraph.height))
    }

    /// Bordered label | value row. The first text baseline sits at the cursor.
    fn draw_table_row<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: Cursor,
        label: &str,
        answer: Option<&str>,
        lines: u32,
        summary: &mut RenderSummary,
    ) -> Result<Cursor> {
        let config = self.config;
        let pad = config.table_padding;
        let size = config.body_font_size;
        let label_width = config.table_label_width;
        let value_width = config.content_width - label_width;

        let label_lines = wrap_text(label, label_width - 2.0 * pad, size, &*canvas);
        let value_lines = answer.map(|text| wrap_text(text, value_width - 2.0 * pad, size, &*canvas));
        let content_height = match &value_lines {
            Some(wrapped) => wrapped.len() as f32 * config.body_line_height,
            None => lines as f32 * config.placeholder_line_height,
        };
        let label_height = label_lines.len() as f32 * config.body_line_height;
        let height = 2.0 * pad + label_height.max(content_height);

        if !self.flow.fits_on_page(height) {
            log::warn!(
                "Table row for '{}' is taller than a page, drawing it as plain text",
                label
            );
            let cursor = self.draw_wrapped(canvas, cursor, label)?;
            return self.draw_answer(canvas, cursor, answer, lines, false, summary);
        }

        let cursor = self.flow.reserve(canvas, cursor, height)?;
        let top = cursor.y + pad + ASCENT_RATIO * size;
        let bottom = top - height;
        let label_x = config.margin_left;
        let value_x = config.margin_left + label_width;

        canvas.stroke_rect(label_x, bottom, label_width, height, config.table_line_width);
        canvas.stroke_rect(value_x, bottom, value_width, height, config.table_line_width);

        for (i, line) in label_lines.iter().enumerate() {
            let y = cursor.y - i as f32 * config.body_line_height;
            canvas.draw_text(label_x + pad, y, size, line);
        }

        match &value_lines {
            Some(wrapped) => {
                summary.answered_slots += 1;
                summary.answer_lines += wrapped.len();
                for (i, line) in wrapped.iter().enumerate() {
                    let y = cursor.y - i as f32 * config.body_line_height;
                    canvas.draw_text(value_x + pad, y, size, line);
                }
            }
            None => {
                summary.empty_slots += 1;
                let length = config.dot_length.min(value_width - 2.0 * pad);
                for i in 0..lines {
                    let y = cursor.y - i as f32 * config.placeholder_line_height;
                    draw_dotted_line(
                        canvas,
                        value_x + pad,
                        y,
                        length,
                        config.dot_spacing,
                        config.dot_radius,
                    );
                    summary.placeholder_lines += 1;
                }
            }
        }

        self.flow.paginate(canvas, cursor.advance(height))
    }
}

/// Render one record to a PDF file.
pub fn generate_sheet_pdf(
    template: &Template,
    record: &Record,
    config: &SheetConfig,
    font: &FontContext,
    output_path: &Path,
) -> Result<RenderSummary> {
    let mut canvas = PdfCanvas::new(font, config.page_width, config.page_height);
    let summary = SheetRenderer::new(config).render(template, record, &mut canvas)?;
    canvas
        .save(output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    Ok(summary)
}

/// Render one record and return the PDF bytes.
pub fn render_sheet_bytes(
    template: &Template,
    record: &Record,
    config: &SheetConfig,
    font: &FontContext,
) -> Result<(Vec<u8>, RenderSummary)> {
    let mut canvas = PdfCanvas::new(font, config.page_width, config.page_height);
    let summary = SheetRenderer::new(config).render(template, record, &mut canvas)?;
    Ok((canvas.into_bytes()?, summary))
}

/// Lay out one record without producing a document.
pub fn measure_sheet<M: TextMeasure + ?Sized>(
    template: &Template,
    record: &Record,
    config: &SheetConfig,
    measure: &M,
) -> Result<RenderSummary> {
    let mut canvas = RecordingCanvas::new(measure);
    SheetRenderer::new(config).render(template, record, &mut canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::config::PresentationStyle;
    use crate::typography::tests::FixedWidth;

    fn scenario_template() -> Template {
        Template::parse(
            r#"{
                "title": "Visit Sheet",
                "fields": [{ "id": "name", "label": "Name", "lines": 1 }],
                "sections": [
                    { "title": "Notes", "questions": [{ "id": "q1", "text": "Comment", "lines": 2 }] }
                ]
            }"#,
            "inline",
        )
        .unwrap()
    }

    fn render_with(
        config: &SheetConfig,
        template: &Template,
        record: &Record,
    ) -> (RecordingCanvas<'static, FixedWidth>, RenderSummary) {
        let mut canvas = RecordingCanvas::new(&FixedWidth);
        let summary = SheetRenderer::new(config)
            .render(template, record, &mut canvas)
            .unwrap();
        (canvas, summary)
    }

    fn text_op<'c>(canvas: &'c RecordingCanvas<'_, FixedWidth>, text: &str) -> (usize, &'c DrawOp) {
        canvas
            .ops()
            .iter()
            .enumerate()
            .find(|(_, op)| op.text() == Some(text))
            .unwrap_or_else(|| panic!("no text op {:?}", text))
    }

    fn y_of(op: &DrawOp) -> f32 {
        match op {
            DrawOp::Text { y, .. } | DrawOp::Justified { y, .. } | DrawOp::Dot { y, .. } => *y,
            other => panic!("no baseline on {:?}", other),
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let config = SheetConfig::default();
        let template = scenario_template();
        let record = Record::from_pairs([("name", "Anna Kovács")]);
        let (canvas, summary) = render_with(&config, &template, &record);

        assert_eq!(
            canvas.texts(),
            vec!["Visit Sheet", "Name", "Anna Kovács", "Notes", "• Comment", "Oldal 1"]
        );

        let (name_idx, name_op) = text_op(&canvas, "Name");
        let (anna_idx, anna_op) = text_op(&canvas, "Anna Kovács");
        assert!(anna_idx > name_idx);
        assert!(y_of(anna_op) < y_of(name_op));

        let (_, comment_op) = text_op(&canvas, "• Comment");
        let rows = canvas.dotted_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.y < y_of(comment_op)));
        assert!(rows.iter().all(|row| row.dots == 75));

        assert_eq!(summary.pages, 1);
        assert_eq!(summary.answer_lines, 1);
        assert_eq!(summary.placeholder_lines, 2);
        assert_eq!(summary.answered_slots, 1);
        assert_eq!(summary.empty_slots, 1);
        assert!(canvas.is_finished());
    }

    #[test]
    fn test_layout_follows_original_spacing() {
        let config = SheetConfig::default();
        let template = scenario_template();
        let (canvas, _) = render_with(&config, &template, &Record::default());

        let top = config.top_y();
        let (_, title) = text_op(&canvas, "Visit Sheet");
        let (_, name) = text_op(&canvas, "Name");
        let (_, notes) = text_op(&canvas, "Notes");
        assert_eq!(y_of(title), top);
        assert_eq!(y_of(name), top - 20.0);
        // label 14 + one placeholder 16 + field gap 10
        assert_eq!(y_of(notes), top - 20.0 - 14.0 - 16.0 - 10.0);
    }

    #[test]
    fn test_placeholder_law() {
        let config = SheetConfig::default();
        let template = Template::parse(
            r#"{ "fields": [{ "id": "city", "label": "City", "lines": 3 }] }"#,
            "inline",
        )
        .unwrap();
        let record = Record::from_pairs([("city", "   "), ("other", "ignored")]);
        let (canvas, summary) = render_with(&config, &template, &record);

        assert_eq!(canvas.dotted_rows().len(), 3);
        assert_eq!(canvas.texts(), vec!["City", "Oldal 1"]);
        assert_eq!(summary.placeholder_lines, 3);
        assert_eq!(summary.answer_lines, 0);
    }

    #[test]
    fn test_answer_law() {
        let config = SheetConfig::default();
        let template = Template::parse(
            r#"{ "sections": [{ "title": "S", "questions": [{ "id": "q", "text": "Why?", "lines": 4 }] }] }"#,
            "inline",
        )
        .unwrap();
        let record = Record::from_pairs([("q", "Because the lesson went well.")]);
        let (canvas, summary) = render_with(&config, &template, &record);

        assert!(canvas.dotted_rows().is_empty());
        assert!(canvas.texts().contains(&"Because the lesson went well."));
        assert_eq!(summary.placeholder_lines, 0);
        assert_eq!(summary.answer_lines, 1);
    }

    #[test]
    fn test_field_without_id_is_label_only() {
        let config = SheetConfig::default();
        let template = Template::parse(
            r#"{ "fields": [{ "label": "Signature", "lines": 2 }] }"#,
            "inline",
        )
        .unwrap();
        let record = Record::from_pairs([("Signature", "should not appear")]);
        let (canvas, _) = render_with(&config, &template, &record);

        assert_eq!(canvas.dotted_rows().len(), 2);
        assert!(!canvas.texts().contains(&"should not appear"));
    }

    #[test]
    fn test_long_sheet_paginates_with_numbered_footers() {
        let config = SheetConfig::default();
        let questions: Vec<serde_json::Value> = (0..40)
            .map(|i| serde_json::json!({ "id": format!("q{}", i), "text": format!("Question {}", i), "lines": 3 }))
            .collect();
        let template: Template = serde_json::from_value(serde_json::json!({
            "title": "Long",
            "sections": [{ "title": "Many", "questions": questions }]
        }))
        .unwrap();
        let (canvas, summary) = render_with(&config, &template, &Record::default());

        assert!(summary.pages >= 3, "got {} pages", summary.pages);
        assert_eq!(summary.placeholder_lines, 120);

        let footers: Vec<(u32, String)> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { page, text, .. } if text.starts_with("Oldal ") => {
                    Some((*page, text.clone()))
                }
                _ => None,
            })
            .collect();
        let expected: Vec<(u32, String)> = (1..=summary.pages)
            .map(|n| (n, format!("Oldal {}", n)))
            .collect();
        assert_eq!(footers, expected);

        // Nothing but footers below the break threshold.
        for op in canvas.ops() {
            match op {
                DrawOp::Text { y, text, .. } if !text.starts_with("Oldal ") => {
                    assert!(*y >= config.bottom_threshold, "{:?} at {}", text, y)
                }
                DrawOp::Dot { y, .. } => assert!(*y >= config.bottom_threshold),
                _ => {}
            }
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let config = SheetConfig::default().with_style(PresentationStyle::JustifiedParagraph);
        let template = scenario_template();
        let record = Record::from_pairs([("name", "Anna Kovács"), ("q1", "Short note.")]);
        let (first, _) = render_with(&config, &template, &record);
        let (second, _) = render_with(&config, &template, &record);
        assert_eq!(first.ops(), second.ops());
    }

    #[test]
    fn test_title_alignment_follows_style() {
        let template = scenario_template();
        let width = FixedWidth.text_width("Visit Sheet", 16.0);

        let plain = SheetConfig::default();
        let (canvas, _) = render_with(&plain, &template, &Record::default());
        match text_op(&canvas, "Visit Sheet").1 {
            DrawOp::Text { x, .. } => assert!((x - (plain.page_width - width) / 2.0).abs() < 1e-3),
            other => panic!("unexpected op {:?}", other),
        }

        let table = SheetConfig::default().with_style(PresentationStyle::BorderedTable);
        let (canvas, _) = render_with(&table, &template, &Record::default());
        match text_op(&canvas, "Visit Sheet").1 {
            DrawOp::Text { x, .. } => assert_eq!(*x, table.margin_left),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_bordered_table_row_with_answer() {
        let config = SheetConfig::default().with_style(PresentationStyle::BorderedTable);
        let template = scenario_template();
        let record = Record::from_pairs([("name", "Anna Kovács")]);
        let (canvas, summary) = render_with(&config, &template, &record);

        let rects: Vec<&DrawOp> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { .. }))
            .collect();
        assert_eq!(rects.len(), 2);

        let (_, label) = text_op(&canvas, "Name");
        let (_, value) = text_op(&canvas, "Anna Kovács");
        // Same row, value in the right-hand cell
        assert_eq!(y_of(label), y_of(value));
        match value {
            DrawOp::Text { x, .. } => assert!(*x > config.margin_left + config.table_label_width),
            other => panic!("unexpected op {:?}", other),
        }

        // Only the question placeholders remain
        assert_eq!(summary.placeholder_lines, 2);
        assert_eq!(canvas.dotted_rows().len(), 2);
    }

    #[test]
    fn test_bordered_table_row_placeholders_inside_value_cell() {
        let config = SheetConfig::default().with_style(PresentationStyle::BorderedTable);
        let template = Template::parse(
            r#"{ "fields": [{ "id": "school", "label": "School", "lines": 2 }] }"#,
            "inline",
        )
        .unwrap();
        let (canvas, summary) = render_with(&config, &template, &Record::default());

        let value_x = config.margin_left + config.table_label_width;
        let value_right = config.margin_left + config.content_width;
        let rows = canvas.dotted_rows();
        assert_eq!(rows.len(), 2);
        for op in canvas.ops() {
            if let DrawOp::Dot { x, .. } = op {
                assert!(*x > value_x && *x < value_right);
            }
        }
        assert_eq!(summary.placeholder_lines, 2);
        assert_eq!(summary.answer_lines, 0);
    }

    #[test]
    fn test_justified_paragraph_moves_to_next_page_as_a_block() {
        let config = SheetConfig {
            page_height: 300.0,
            top_offset: 30.0,
            bottom_threshold: 70.0,
            ..SheetConfig::default()
        }
        .with_style(PresentationStyle::JustifiedParagraph);
        let template = Template::parse(
            r#"{ "sections": [{ "title": "S", "questions": [
                { "id": "q1", "text": "A", "lines": 8 },
                { "id": "q2", "text": "B", "lines": 1 }
            ] }] }"#,
            "inline",
        )
        .unwrap();
        let answer = vec!["word"; 70].join(" ");
        let record = Record::from_pairs([("q2", answer.as_str())]);
        let (canvas, summary) = render_with(&config, &template, &record);

        let justified: Vec<&DrawOp> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Justified { .. }))
            .collect();
        assert_eq!(justified.len(), 5);
        assert!(justified.iter().all(|op| op.page() == 2));
        assert_eq!(y_of(justified[0]), config.top_y());

        // "• B" stayed on page 1 above the break.
        assert_eq!(text_op(&canvas, "• B").1.page(), 1);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.answer_lines, 5);

        match justified[4] {
            DrawOp::Justified {
                extra_word_spacing, ..
            } => assert_eq!(*extra_word_spacing, 0.0),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_compound_record_value_fails_render() {
        let config = SheetConfig::default();
        let template = scenario_template();
        let record = Record::parse(r#"{ "name": { "first": "Anna" } }"#, "inline").unwrap();
        let mut canvas = RecordingCanvas::new(&FixedWidth);
        let result = SheetRenderer::new(&config).render(&template, &record, &mut canvas);
        assert!(result.is_err());
    }

    #[test]
    fn test_dotted_line_geometry() {
        let mut canvas = RecordingCanvas::new(&FixedWidth);
        draw_dotted_line(&mut canvas, 10.0, 100.0, 30.0, 6.0, 0.6);
        let xs: Vec<f32> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Dot { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![10.0, 16.0, 22.0, 28.0, 34.0]);
    }

    #[test]
    fn test_measure_sheet_counts_pages() {
        let config = SheetConfig::default();
        let summary =
            measure_sheet(&scenario_template(), &Record::default(), &config, &FixedWidth).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.placeholder_lines, 3);
    }

    fn assert_nothing_below_threshold(canvas: &RecordingCanvas<'_, FixedWidth>, config: &SheetConfig) {
        for op in canvas.ops() {
            match op {
                DrawOp::Dot { y, .. } | DrawOp::Rect { y, .. } | DrawOp::Justified { y, .. } => {
                    assert!(*y >= config.bottom_threshold, "{:?}", op)
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_justified_paragraph_taller_than_a_page_is_set_line_by_line() {
        let config = SheetConfig::default().with_style(PresentationStyle::JustifiedParagraph);
        let template = Template::parse(
            r#"{ "sections": [{ "title": "S", "questions": [{ "id": "q1", "text": "A", "lines": 1 }] }] }"#,
            "inline",
        )
        .unwrap();
        // 15 words per line at the default width: 60 lines, more than a page holds
        let answer = vec!["word"; 900].join(" ");
        let record = Record::from_pairs([("q1", answer.as_str())]);
        let (canvas, summary) = render_with(&config, &template, &record);

        let justified: Vec<&DrawOp> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Justified { .. }))
            .collect();
        assert_eq!(justified.len(), 60);
        assert_eq!(summary.answer_lines, 60);
        assert_eq!(summary.pages, 2);

        // Starts right under the question instead of on a fresh page.
        let (_, question) = text_op(&canvas, "• A");
        assert_eq!(justified[0].page(), 1);
        assert_eq!(y_of(justified[0]), y_of(question) - config.body_line_height);
        assert!(justified.iter().any(|op| op.page() == 2));
        assert_nothing_below_threshold(&canvas, &config);
    }

    #[test]
    fn test_table_row_taller_than_a_page_falls_back_to_plain_lines() {
        let config = SheetConfig::default().with_style(PresentationStyle::BorderedTable);
        let label = "Observations made during the whole lesson";
        let template: Template = serde_json::from_value(serde_json::json!({
            "fields": [{ "id": "notes", "label": label, "lines": 60 }]
        }))
        .unwrap();
        let (canvas, summary) = render_with(&config, &template, &Record::default());

        assert!(!canvas.ops().iter().any(|op| matches!(op, DrawOp::Rect { .. })));
        // The label is wrapped to the full content width, not the label cell.
        assert_eq!(canvas.texts()[0], label);
        assert_eq!(summary.placeholder_lines, 60);
        assert_eq!(summary.empty_slots, 1);
        assert_eq!(summary.pages, 2);

        let rows = canvas.dotted_rows();
        assert_eq!(rows.len(), 60);
        assert!(rows.iter().all(|row| row.x == config.margin_left && row.dots == 75));
        assert_nothing_below_threshold(&canvas, &config);
    }

    #[test]
    fn test_table_rows_move_to_next_page_whole() {
        let config = SheetConfig::default().with_style(PresentationStyle::BorderedTable);
        let fields: Vec<serde_json::Value> = (0..40)
            .map(|i| serde_json::json!({ "id": format!("f{}", i), "label": format!("Field {}", i), "lines": 2 }))
            .collect();
        let template: Template =
            serde_json::from_value(serde_json::json!({ "fields": fields })).unwrap();
        let (canvas, summary) = render_with(&config, &template, &Record::default());

        assert!(summary.pages >= 3, "got {} pages", summary.pages);
        assert_eq!(summary.placeholder_lines, 80);

        let rects: Vec<&DrawOp> = canvas
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { .. }))
            .collect();
        assert_eq!(rects.len(), 80);
        // Label and value cells of a row share page and bottom edge.
        for pair in rects.chunks(2) {
            match (pair[0], pair[1]) {
                (
                    DrawOp::Rect { page: p0, y: y0, .. },
                    DrawOp::Rect { page: p1, y: y1, .. },
                ) => {
                    assert_eq!(p0, p1);
                    assert_eq!(y0, y1);
                }
                other => panic!("unexpected ops {:?}", other),
            }
        }

        // Every page after the first starts with a row at the top baseline.
        for page in 2..=summary.pages {
            let first = canvas
                .ops()
                .iter()
                .find(|op| op.page() == page && op.text().map_or(false, |t| t.starts_with("Field ")))
                .unwrap_or_else(|| panic!("no row on page {}", page));
            assert_eq!(y_of(first), config.top_y());
        }
        assert_nothing_below_threshold(&canvas, &config);
    }
}
