//! lopdf-backed [`TextSurface`] for a single page.
//!
//! # Coordinate System
//!
//! PDF content streams use a **bottom-left origin** (y grows upward), while
//! overlay placement is computed with a **top-left origin** (y grows
//! downward), matching how text extraction reports positions. Each line is
//! converted on the way out:
//! ```text
//! pdf_x = media_box.x0 + x
//! pdf_y = media_box.y1 - y
//! ```
//!
//! # Content Isolation
//!
//! The first insertion wraps the page's existing content streams in `q`/`Q`
//! so a graphics state left dirty by the original page (an unbalanced CTM,
//! invisible OCR text mode) cannot distort the overlay.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::config::TextColor;
use crate::error::{Error, Result};
use super::content::{PageRect, TextSurface};

/// Resource name the overlay font is registered under.
pub const OVERLAY_FONT_NAME: &str = "FOvl";

/// Guard against circular `/Parent` references in the page tree
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Writable view of one page of a [`lopdf::Document`].
pub struct PdfPageCanvas<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
    /// `[x0, y0, x1, y1]` in PDF user space
    media_box: [f32; 4],
    prepared: bool,
}

impl<'a> PdfPageCanvas<'a> {
    pub fn new(doc: &'a mut Document, page_id: ObjectId) -> Result<Self> {
        let page_obj = doc
            .get_object(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))?;
        let media_box = get_media_box(doc, page_obj);

        Ok(Self {
            doc,
            page_id,
            media_box,
            prepared: false,
        })
    }

    /// Register the overlay font and isolate the existing content.
    fn prepare(&mut self) -> Result<()> {
        let font_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));
        self.add_font_to_page(font_id)?;
        self.isolate_existing_content()?;
        self.prepared = true;
        Ok(())
    }

    fn add_font_to_page(&mut self, font_id: ObjectId) -> Result<()> {
        let mut resources = resolve_resources(self.doc, self.page_id)?;

        let mut fonts = match resources.get(b"Font") {
            Ok(font_obj) => resolve_dict_object(self.doc, font_obj).unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        fonts.set(OVERLAY_FONT_NAME, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        // Inline on the page so an inherited or shared dictionary stays untouched
        let page = page_dict_mut(self.doc, self.page_id)?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn isolate_existing_content(&mut self) -> Result<()> {
        let existing = content_references(self.doc, self.page_id)?;
        if existing.is_empty() {
            return Ok(());
        }

        let open_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));

        let page = page_dict_mut(self.doc, self.page_id)?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn line_content(
        &self,
        origin: (f32, f32),
        text: &str,
        font_size: f32,
        color: TextColor,
    ) -> Content {
        let pdf_x = self.media_box[0] + origin.0;
        let pdf_y = self.media_box[3] - origin.1;

        Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![OVERLAY_FONT_NAME.into(), font_size.into()]),
                // Fill mode; OCR text layers leave mode 3 (invisible) behind
                Operation::new("Tr", vec![0.into()]),
                Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
                Operation::new("Td", vec![pdf_x.into(), pdf_y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        }
    }
}

impl TextSurface for PdfPageCanvas<'_> {
    fn page_size(&self) -> PageRect {
        PageRect::new(
            self.media_box[2] - self.media_box[0],
            self.media_box[3] - self.media_box[1],
        )
    }

    fn insert_text(
        &mut self,
        origin: (f32, f32),
        text: &str,
        font_size: f32,
        color: TextColor,
    ) -> Result<()> {
        if !self.prepared {
            self.prepare()?;
        }

        let content = self
            .line_content(origin, text, font_size, color)
            .encode()
            .map_err(|e| Error::PdfOverlay(format!("Failed to encode overlay text: {e}")))?;

        append_content_to_page(self.doc, self.page_id, content)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))
}

/// Append a content stream to a page.
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let mut contents = content_references(doc, page_id)?;
    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));
    contents.push(Object::Reference(content_id));

    let page = page_dict_mut(doc, page_id)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's content streams as a flat list of references.
///
/// `/Contents` may be a single reference, an inline array, or a reference
/// to an array.
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };
    Ok(refs)
}

/// Get media box from page object, walking up the page tree.
fn get_media_box(doc: &Document, page_obj: &Object) -> [f32; 4] {
    let mut node = page_obj.as_dict().ok();

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let Some(dict) = node else {
            break;
        };

        if let Ok(Object::Array(arr)) = dict.get(b"MediaBox")
            && arr.len() == 4
        {
            let values: Vec<f32> = arr
                .iter()
                .filter_map(|o| match o {
                    #[allow(clippy::cast_precision_loss)]
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(r) => Some(*r),
                    _ => None,
                })
                .collect();

            if values.len() == 4 {
                return [values[0], values[1], values[2], values[3]];
            }
        }

        node = parent_of(doc, dict);
    }

    let letter = PageRect::letter();
    [0.0, 0.0, letter.width, letter.height]
}

/// Resolve the Resources dictionary for a page.
///
/// Resources may be inline, an indirect reference, or inherited from an
/// ancestor Pages node. A page without any yields an empty dictionary.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut node = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(res_obj) = node.get(b"Resources")
            && let Some(dict) = resolve_dict_object(doc, res_obj)
        {
            return Ok(dict);
        }

        match parent_of(doc, node) {
            Some(parent) => node = parent,
            None => break,
        }
    }

    Ok(Dictionary::new())
}

fn parent_of<'a>(doc: &'a Document, node: &Dictionary) -> Option<&'a Dictionary> {
    node.get(b"Parent")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_dict)
        .ok()
}

fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok().cloned(),
        _ => None,
    }
}

/// Encode text for a simple font with `WinAnsiEncoding`.
///
/// Latin-1 maps through unchanged; the typographic characters WinAnsi puts
/// in 0x80..0x9F are mapped explicitly. Anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// One-page document whose resources live on the Pages node.
    fn doc_with_inherited_resources() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Original")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "Resources",
                    Object::Dictionary(Dictionary::from_iter([(
                        "Font",
                        Object::Dictionary(Dictionary::from_iter([(
                            "F1",
                            Object::Reference(font_id),
                        )])),
                    )])),
                ),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
                ),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        (doc, page_id)
    }

    fn page_operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
        let bytes = doc.get_page_content(page_id).unwrap();
        Content::decode(&bytes).unwrap().operations
    }

    #[test]
    fn test_page_size_from_inherited_media_box() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        let canvas = PdfPageCanvas::new(&mut doc, page_id).unwrap();
        assert_eq!(canvas.page_size(), PageRect::new(595.0, 842.0));
    }

    #[test]
    fn test_cyclic_parent_chain_terminates() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.new_object_id();
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));

        doc.objects.insert(
            page_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ])),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Parent", Object::Reference(page_id)),
            ])),
        );

        assert!(resolve_resources(&doc, page_id).unwrap().is_empty());

        let mut canvas = PdfPageCanvas::new(&mut doc, page_id).unwrap();
        assert_eq!(canvas.page_size(), PageRect::letter());
        canvas
            .insert_text((10.0, 20.0), "Hallo", 8.0, TextColor::blue())
            .unwrap();
    }

    #[test]
    fn test_insert_keeps_inherited_fonts() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        let mut canvas = PdfPageCanvas::new(&mut doc, page_id).unwrap();
        canvas
            .insert_text((10.0, 20.0), "Hallo", 8.0, TextColor::blue())
            .unwrap();

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let fonts = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(OVERLAY_FONT_NAME.as_bytes()));
    }

    #[test]
    fn test_insert_converts_to_bottom_left_origin() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        let mut canvas = PdfPageCanvas::new(&mut doc, page_id).unwrap();
        canvas
            .insert_text((10.0, 42.0), "Hallo", 8.0, TextColor::blue())
            .unwrap();

        let ops = page_operations(&doc, page_id);
        let td = ops
            .iter()
            .filter(|op| op.operator == "Td")
            .last()
            .unwrap();
        assert_eq!(td.operands[0].as_float().unwrap(), 10.0);
        assert_eq!(td.operands[1].as_float().unwrap(), 800.0);

        let tj = ops.iter().filter(|op| op.operator == "Tj").last().unwrap();
        assert_eq!(tj.operands[0].as_str().unwrap(), b"Hallo");
    }

    #[test]
    fn test_existing_content_is_wrapped_once() {
        let (mut doc, page_id) = doc_with_inherited_resources();
        let mut canvas = PdfPageCanvas::new(&mut doc, page_id).unwrap();
        canvas.insert_text((10.0, 20.0), "one", 8.0, TextColor::blue()).unwrap();
        canvas.insert_text((10.0, 30.0), "two", 8.0, TextColor::blue()).unwrap();

        let ops = page_operations(&doc, page_id);
        assert_eq!(ops.first().unwrap().operator, "q");
        // original text survives
        assert!(ops.iter().any(|op| op.operator == "Tj"
            && op.operands[0].as_str().unwrap() == b"Original"));
        let q_count = ops.iter().filter(|op| op.operator == "q").count();
        let big_q_count = ops.iter().filter(|op| op.operator == "Q").count();
        assert_eq!(q_count, 3);
        assert_eq!(q_count, big_q_count);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Grüße"), vec![b'G', b'r', 0xFC, 0xDF, b'e']);
        assert_eq!(
            encode_win_ansi("€ – “x”"),
            vec![0x80, b' ', 0x96, b' ', 0x93, b'x', 0x94]
        );
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
