//! Font management for sheet rendering
//!
//! Loads one TrueType font with fontdue. The font measures text during layout
//! and is embedded into every generated PDF, so it has to cover the accented
//! Latin characters found in the records.

use crate::error::SheetError;
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

/// Text measurement capability used by the layout code.
pub trait TextMeasure {
    /// Width of `text` in points when set at `font_size`.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Drawn in place of characters the font cannot show.
pub const REPLACEMENT_CHAR: char = '?';

/// Fonts tried in order when no explicit font path is given.
pub const FONT_CANDIDATES: &[(&str, &str)] = &[
    // Next to the working directory, like the template files.
    ("DejaVu Sans", "DejaVuSans.ttf"),
    ("DejaVu Sans", "fonts/DejaVuSans.ttf"),
    // Linux packaged fonts
    ("DejaVu Sans", "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
    ("DejaVu Sans", "/usr/share/fonts/TTF/DejaVuSans.ttf"),
    ("DejaVu Sans", "/usr/share/fonts/dejavu/DejaVuSans.ttf"),
    ("DejaVu Sans", "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf"),
    ("Liberation Sans", "/usr/share/fonts/truetype/liberation2/LiberationSans-Regular.ttf"),
    ("Liberation Sans", "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
    // macOS / Windows
    ("DejaVu Sans", "/Library/Fonts/DejaVuSans.ttf"),
    ("DejaVu Sans", "C:\\Windows\\Fonts\\DejaVuSans.ttf"),
    ("Arial", "C:\\Windows\\Fonts\\arial.ttf"),
];

/// A loaded font together with the raw data needed for embedding.
#[derive(Clone)]
pub struct FontContext {
    pub font: Font,
    pub font_name: String,
    pub font_path: PathBuf,
    pub font_data: Vec<u8>,
}

impl std::fmt::Debug for FontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontContext")
            .field("font_name", &self.font_name)
            .field("font_path", &self.font_path)
            .field("font_bytes", &self.font_data.len())
            .finish()
    }
}

impl FontContext {
    /// Load the given font file, or the first available candidate.
    pub fn load(path: Option<&Path>) -> Result<Self, SheetError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::discover(),
        }
    }

    /// Load the first candidate font that exists on this machine.
    pub fn discover() -> Result<Self, SheetError> {
        for (font_name, font_path) in FONT_CANDIDATES {
            let path = Path::new(font_path);
            if path.is_file() {
                log::info!("Loading font: {} from {}", font_name, font_path);
                let data = std::fs::read(path).map_err(|e| SheetError::io(path, e))?;
                return Self::from_bytes(font_name, path, data);
            }
        }

        let tried = FONT_CANDIDATES
            .iter()
            .map(|(_, p)| *p)
            .collect::<Vec<_>>()
            .join(", ");
        Err(SheetError::FontNotFound(tried))
    }

    pub fn from_file(path: &Path) -> Result<Self, SheetError> {
        if !path.is_file() {
            return Err(SheetError::FontNotFound(path.display().to_string()));
        }
        let data = std::fs::read(path).map_err(|e| SheetError::io(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "SheetFont".to_string());
        log::info!("Loading font: {} from {}", name, path.display());
        Self::from_bytes(&name, path, data)
    }

    pub fn from_bytes(name: &str, path: &Path, data: Vec<u8>) -> Result<Self, SheetError> {
        let font = Font::from_bytes(data.as_slice(), FontSettings::default()).map_err(|e| {
            SheetError::FontLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            font,
            font_name: name.to_string(),
            font_path: path.to_path_buf(),
            font_data: data,
        })
    }

    /// Glyph index for a character; 0 is the missing glyph.
    pub fn glyph_index(&self, ch: char) -> u16 {
        self.font.lookup_glyph_index(ch)
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyph_index(ch) != 0
    }

    /// The character actually drawn for `ch`. Only BMP characters with a
    /// glyph (and the space) are drawn; the rest become `REPLACEMENT_CHAR`.
    pub fn drawable_char(&self, ch: char) -> char {
        let in_bmp = (ch as u32) <= 0xFFFF;
        if in_bmp && (ch == ' ' || self.has_glyph(ch)) {
            ch
        } else {
            REPLACEMENT_CHAR
        }
    }

    /// Advance width in thousandths of an em, the unit of PDF glyph widths.
    pub fn advance_units(&self, ch: char) -> f32 {
        self.font.metrics(ch, 1000.0).advance_width
    }

    /// PostScript-safe name for the embedded font.
    pub fn pdf_font_name(&self) -> String {
        let mut out = String::with_capacity(self.font_name.len());
        for ch in self.font_name.chars() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                out.push(ch);
            } else if ch.is_whitespace() {
                out.push('-');
            }
        }
        if out.is_empty() {
            "SheetFont".to_string()
        } else {
            out
        }
    }
}

impl TextMeasure for FontContext {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(self.drawable_char(ch), font_size).advance_width)
            .sum()
    }
}
