//! PDF canvas backed by lopdf
//!
//! Text is written with one embedded TrueType font as a composite Type0 font
//! (Identity-H). Character codes are UTF-16 code units of BMP characters; the
//! CIDToGIDMap, the glyph widths and the ToUnicode CMap are built from the
//! characters actually drawn when the document is finished.

use crate::canvas::Canvas;
use crate::error::SheetError;
use crate::fonts::{FontContext, TextMeasure};
use crate::typography::FormattedLine;
use anyhow::{anyhow, Result};
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use std::collections::BTreeSet;
use std::path::Path;

const FONT_RESOURCE: &str = "F1";
/// Bezier control distance for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

pub struct PdfCanvas<'f> {
    font: &'f FontContext,
    page_width: f32,
    page_height: f32,
    document: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    operations: Vec<Operation>,
    used_chars: BTreeSet<char>,
    page_number: u32,
    finished: bool,
}

impl<'f> PdfCanvas<'f> {
    pub fn new(font: &'f FontContext, page_width: f32, page_height: f32) -> Self {
        let mut document = Document::with_version("1.5");
        let font_id = document.new_object_id();
        let mut canvas = Self {
            font,
            page_width,
            page_height,
            document,
            pages_id: (0, 0), // set in initialize_document
            font_id,
            operations: Vec::new(),
            used_chars: BTreeSet::new(),
            page_number: 1,
            finished: false,
        };
        canvas.initialize_document();
        canvas
    }

    /// Pages tree, catalog and document info.
    fn initialize_document(&mut self) {
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Kids", Object::Array(vec![]));
        pages_dict.set("Count", Object::Integer(0));
        let pages_id = self.document.add_object(Object::Dictionary(pages_dict));

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", Object::string_literal("visit-sheet"));
        info_dict.set("Creator", Object::string_literal("visit-sheet"));
        let info_id = self.document.add_object(Object::Dictionary(info_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(pages_id));
        let catalog_id = self.document.add_object(Object::Dictionary(catalog_dict));

        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.trailer.set("Info", Object::Reference(info_id));
        self.pages_id = pages_id;
    }

    /// Number of pages written to the document so far.
    pub fn written_pages(&self) -> Result<usize, SheetError> {
        let pages_obj = self.document.get_object(self.pages_id)?;
        if let Object::Dictionary(ref pages_dict) = pages_obj {
            Ok(pages_dict.get(b"Kids")?.as_array()?.len())
        } else {
            Ok(0)
        }
    }

    /// Finish (if needed) and write the document to `path`.
    pub fn save(self, path: &Path) -> Result<()> {
        let bytes = self.into_bytes()?;
        std::fs::write(path, bytes).map_err(|e| SheetError::io(path, e))?;
        Ok(())
    }

    /// Finish (if needed) and return the serialized document.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.finish()?;
        self.document.compress();
        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Hex string of 2-byte character codes; characters the font cannot
    /// draw are replaced.
    fn encode_text(&mut self, text: &str) -> Object {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let ch = self.drawable(ch);
            self.used_chars.insert(ch);
            // drawable() only returns BMP characters, so this is one code unit.
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    fn drawable(&self, ch: char) -> char {
        let drawn = self.font.drawable_char(ch);
        if drawn != ch {
            log::debug!("No glyph for {:?}, substituting {:?}", ch, drawn);
        }
        drawn
    }

    fn begin_text(&mut self, x: f32, y: f32, font_size: f32) {
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), font_size.into()],
        ));
        self.operations.push(Operation::new(
            "Tm",
            vec![
                1.0f32.into(),
                0.0f32.into(),
                0.0f32.into(),
                1.0f32.into(),
                x.into(),
                y.into(),
            ],
        ));
    }

    /// Write the buffered operations as a page object.
    fn flush_page(&mut self) -> Result<(), SheetError> {
        let page_id = self.document.new_object_id();
        let content = Content {
            operations: std::mem::take(&mut self.operations),
        };

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("Resources", self.create_resources_dict());
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                self.page_width.into(),
                self.page_height.into(),
            ]),
        );

        let content_stream = Stream::new(Dictionary::new(), content.encode()?);
        let content_id = self.document.add_object(content_stream);
        page_dict.set("Contents", Object::Reference(content_id));

        self.document.objects.insert(page_id, Object::Dictionary(page_dict));
        self.add_page_to_tree(page_id)?;

        log::trace!("Wrote page {}", self.page_number);
        Ok(())
    }

    fn create_resources_dict(&self) -> Object {
        let mut font_dict = Dictionary::new();
        font_dict.set(FONT_RESOURCE, Object::Reference(self.font_id));

        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));
        Object::Dictionary(resources)
    }

    fn add_page_to_tree(&mut self, page_id: ObjectId) -> Result<(), SheetError> {
        let pages_obj = self.document.get_object_mut(self.pages_id)?;
        if let Object::Dictionary(ref mut pages_dict) = pages_obj {
            let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
            kids.push(Object::Reference(page_id));
            let count = kids.len() as i64;
            pages_dict.set("Count", Object::Integer(count));
            Ok(())
        } else {
            Err(SheetError::Pdf("Pages object is not a dictionary".to_string()))
        }
    }

    /// Embed the font as Type0 / CIDFontType2 with Identity-H encoding.
    fn embed_font(&mut self) {
        let base_font_name = self.font.pdf_font_name();
        let (ascent, descent) = self
            .font
            .font
            .horizontal_line_metrics(1000.0)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((800.0, -200.0));

        let mut font_file = Dictionary::new();
        font_file.set("Length1", Object::Integer(self.font.font_data.len() as i64));
        let font_file_id = self
            .document
            .add_object(Stream::new(font_file, self.font.font_data.clone()));

        let mut font_descriptor = Dictionary::new();
        font_descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        font_descriptor.set("FontName", Object::Name(base_font_name.clone().into_bytes()));
        font_descriptor.set("Flags", Object::Integer(32));
        font_descriptor.set(
            "FontBBox",
            Object::Array(vec![
                Object::Integer(-1000),
                Object::Integer(descent.round() as i64),
                Object::Integer(2000),
                Object::Integer(ascent.round() as i64),
            ]),
        );
        font_descriptor.set("ItalicAngle", Object::Integer(0));
        font_descriptor.set("Ascent", Object::Integer(ascent.round() as i64));
        font_descriptor.set("Descent", Object::Integer(descent.round() as i64));
        font_descriptor.set("CapHeight", Object::Integer((ascent * 0.9).round() as i64));
        font_descriptor.set("StemV", Object::Integer(80));
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = self.document.add_object(Object::Dictionary(font_descriptor));

        let mut system_info = Dictionary::new();
        system_info.set("Registry", Object::string_literal("Adobe"));
        system_info.set("Ordering", Object::string_literal("Identity"));
        system_info.set("Supplement", Object::Integer(0));

        let cid_to_gid_id = self.document.add_object(self.create_cid_to_gid_map_stream());

        let mut cidfont = Dictionary::new();
        cidfont.set("Type", Object::Name(b"Font".to_vec()));
        cidfont.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
        cidfont.set("BaseFont", Object::Name(base_font_name.clone().into_bytes()));
        cidfont.set("CIDSystemInfo", Object::Dictionary(system_info));
        cidfont.set("FontDescriptor", Object::Reference(font_descriptor_id));
        cidfont.set("DW", Object::Integer(1000));
        cidfont.set("W", self.create_widths_array());
        cidfont.set("CIDToGIDMap", Object::Reference(cid_to_gid_id));
        let cidfont_id = self.document.add_object(Object::Dictionary(cidfont));

        let tounicode_id = self.document.add_object(self.create_tounicode_cmap_stream());

        let mut type0 = Dictionary::new();
        type0.set("Type", Object::Name(b"Font".to_vec()));
        type0.set("Subtype", Object::Name(b"Type0".to_vec()));
        type0.set("BaseFont", Object::Name(base_font_name.into_bytes()));
        type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
        type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cidfont_id)]));
        type0.set("ToUnicode", Object::Reference(tounicode_id));

        self.document
            .objects
            .insert(self.font_id, Object::Dictionary(type0));
    }

    /// `[cid [w] cid [w] ...]` for every drawn character.
    fn create_widths_array(&self) -> Object {
        let mut widths = Vec::with_capacity(self.used_chars.len() * 2);
        for &ch in &self.used_chars {
            widths.push(Object::Integer(ch as i64));
            widths.push(Object::Array(vec![Object::Integer(
                self.font.advance_units(ch).round() as i64,
            )]));
        }
        Object::Array(widths)
    }

    /// CID -> glyph index, two bytes per CID, up to the highest CID used.
    fn create_cid_to_gid_map_stream(&self) -> Stream {
        let max_cid = self.used_chars.iter().next_back().map(|&c| c as usize).unwrap_or(0);
        let mut map = vec![0u8; (max_cid + 1) * 2];
        for &ch in &self.used_chars {
            let gid = self.font.glyph_index(ch);
            let offset = (ch as usize) * 2;
            map[offset..offset + 2].copy_from_slice(&gid.to_be_bytes());
        }
        Stream::new(Dictionary::new(), map)
    }

    fn create_tounicode_cmap_stream(&self) -> Stream {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );

        let chars: Vec<char> = self.used_chars.iter().copied().collect();
        // At most 100 entries per bfchar block.
        for chunk in chars.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &ch in chunk {
                cmap.push_str(&format!("<{:04X}> <{:04X}>\n", ch as u32, ch as u32));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end",
        );
        Stream::new(Dictionary::new(), cmap.into_bytes())
    }
}

impl TextMeasure for PdfCanvas<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.font.text_width(text, font_size)
    }
}

impl Canvas for PdfCanvas<'_> {
    fn draw_text(&mut self, x: f32, y: f32, font_size: f32, text: &str) {
        let encoded = self.encode_text(text);
        self.begin_text(x, y, font_size);
        self.operations.push(Operation::new("Tj", vec![encoded]));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn draw_justified(&mut self, x: f32, y: f32, font_size: f32, line: &FormattedLine) {
        // TJ offsets are in thousandths of text space; negative moves right.
        let adjust = -(line.extra_word_spacing * 1000.0 / font_size);
        let mut tj = Vec::with_capacity(line.words.len() * 2);
        let last = line.words.len().saturating_sub(1);
        for (i, word) in line.words.iter().enumerate() {
            if i < last {
                tj.push(self.encode_text(&format!("{} ", word)));
                if adjust != 0.0 {
                    tj.push(adjust.into());
                }
            } else {
                tj.push(self.encode_text(word));
            }
        }

        self.begin_text(x, y, font_size);
        self.operations.push(Operation::new("TJ", vec![Object::Array(tj)]));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn draw_dot(&mut self, x: f32, y: f32, radius: f32) {
        let r = radius;
        let k = KAPPA * r;
        let point = |px: f32, py: f32| -> Vec<Object> { vec![px.into(), py.into()] };
        let curve = |a: (f32, f32), b: (f32, f32), c: (f32, f32)| -> Vec<Object> {
            vec![
                a.0.into(),
                a.1.into(),
                b.0.into(),
                b.1.into(),
                c.0.into(),
                c.1.into(),
            ]
        };

        self.operations.push(Operation::new("m", point(x + r, y)));
        self.operations.push(Operation::new(
            "c",
            curve((x + r, y + k), (x + k, y + r), (x, y + r)),
        ));
        self.operations.push(Operation::new(
            "c",
            curve((x - k, y + r), (x - r, y + k), (x - r, y)),
        ));
        self.operations.push(Operation::new(
            "c",
            curve((x - r, y - k), (x - k, y - r), (x, y - r)),
        ));
        self.operations.push(Operation::new(
            "c",
            curve((x + k, y - r), (x + r, y - k), (x + r, y)),
        ));
        self.operations.push(Operation::new("s", vec![]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32) {
        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new("w", vec![line_width.into()]));
        self.operations.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.operations.push(Operation::new("S", vec![]));
        self.operations.push(Operation::new("Q", vec![]));
    }

    fn page_number(&self) -> u32 {
        self.page_number
    }

    fn show_page(&mut self) -> Result<()> {
        if self.finished {
            return Err(anyhow!("Cannot start a new page after the document is finished"));
        }
        self.flush_page()?;
        self.page_number += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush_page()?;
        self.embed_font();
        self.finished = true;
        Ok(())
    }
}
