//! Visit Sheet PDF Creator
//!
//! Lays out a visit-sheet template (title, header fields, sections of
//! questions) and fills it with one record's answers. Slots without an
//! answer get dotted placeholder lines to write on by hand. Output is an A4
//! PDF with an embedded TrueType font and numbered pages.

pub mod canvas;
pub mod config;
pub mod error;
pub mod fonts;
pub mod page_flow;
pub mod pdf_canvas;
pub mod sheet_generator;
pub mod template;
pub mod typography;

// Re-export commonly used functions and types
pub use canvas::{Canvas, DrawOp, DottedRow, RecordingCanvas};
pub use config::{PresentationStyle, SheetConfig};
pub use error::SheetError;
pub use fonts::{FontContext, TextMeasure};
pub use pdf_canvas::PdfCanvas;
pub use sheet_generator::{
    draw_dotted_line, generate_sheet_pdf, measure_sheet, render_sheet_bytes, RenderSummary,
    SheetRenderer,
};
pub use template::{Field, Question, Record, Section, Template};
