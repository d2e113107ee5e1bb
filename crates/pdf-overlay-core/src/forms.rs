//! Interactive form (AcroForm) text-field reading and filling.
//!
//! Only text fields (`/FT /Tx`) take part. Hierarchical fields are addressed
//! by their fully qualified, dot-joined names (`person.first`), and the field
//! type may be inherited from an ancestor node.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Field name to desired value, as supplied by the user
pub type FillData = BTreeMap<String, String>;

/// Field name to current value, as read from a document
pub type FieldMap = BTreeMap<String, String>;

/// Guard against circular `/Kids` references
const MAX_FIELD_DEPTH: usize = 64;

/// `/Ff` bit 1: the field may not be changed
const FIELD_FLAG_READ_ONLY: i64 = 1;

/// Outcome of a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillReport {
    /// Fields written
    pub filled: usize,
    /// Fill-data keys with no matching text field
    pub skipped_unknown: usize,
    /// Matching fields whose write failed
    pub failed: usize,
}

/// A document opened for form filling
pub trait FormDocument {
    /// Current values of all text fields
    fn text_fields(&self) -> Result<FieldMap>;

    /// Set the value of one text field
    fn set_text_field(&mut self, name: &str, value: &str) -> Result<()>;

    /// Write the document to `path`
    fn save(&mut self, path: &Path) -> Result<()>;
}

/// The library that reads and writes form fields
pub trait FormFieldBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FormDocument>>;
}

// =============================================================================
// Backends
// =============================================================================

/// Form backend on top of lopdf.
///
/// Values are written into the field context of the document's last page:
/// a field whose widgets all sit on earlier pages is matched and counted but
/// keeps its value.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfFormBackend;

impl FormFieldBackend for LopdfFormBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FormDocument>> {
        let doc = Document::load(path)
            .map_err(|e| Error::FormRead(format!("Failed to open {}: {e}", path.display())))?;
        Ok(Box::new(LopdfFormDocument::new(doc)))
    }
}

/// Backend for builds/configurations without form support
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFormBackend;

impl FormFieldBackend for UnavailableFormBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn open(&self, _path: &Path) -> Result<Box<dyn FormDocument>> {
        Err(Error::FormBackendUnavailable)
    }
}

/// A terminal text field found in the field tree
#[derive(Debug, Clone)]
struct TextField {
    id: ObjectId,
    value: String,
    read_only: bool,
    /// Widget annotations: the field itself, or its widget-only kids
    widgets: Vec<ObjectId>,
}

struct LopdfFormDocument {
    doc: Document,
    fields: BTreeMap<String, TextField>,
    last_page_annots: BTreeSet<ObjectId>,
}

impl LopdfFormDocument {
    fn new(doc: Document) -> Self {
        let fields = collect_text_fields(&doc);
        let last_page_annots = last_page_annotations(&doc);
        debug!(
            "Found {} text fields, {} annotations on the last page",
            fields.len(),
            last_page_annots.len()
        );
        Self {
            doc,
            fields,
            last_page_annots,
        }
    }

    fn on_last_page(&self, field: &TextField) -> bool {
        field
            .widgets
            .iter()
            .any(|widget| self.last_page_annots.contains(widget))
    }

    /// Ask viewers to regenerate field appearances from `/V`.
    fn set_need_appearances(&mut self) -> Result<()> {
        let catalog_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| Error::FormRead(format!("Missing document catalog: {e}")))?;

        let acroform_ref = self
            .doc
            .get_object(catalog_id)
            .and_then(Object::as_dict)
            .and_then(|catalog| catalog.get(b"AcroForm"))
            .map_err(|e| Error::FormRead(format!("Missing AcroForm: {e}")))?
            .as_reference()
            .ok();

        let acroform = match acroform_ref {
            Some(id) => self.doc.get_object_mut(id).and_then(Object::as_dict_mut),
            None => self
                .doc
                .get_object_mut(catalog_id)
                .and_then(Object::as_dict_mut)
                .and_then(|catalog| catalog.get_mut(b"AcroForm"))
                .and_then(Object::as_dict_mut),
        }
        .map_err(|e| Error::FormRead(format!("Invalid AcroForm: {e}")))?;

        acroform.set("NeedAppearances", Object::Boolean(true));
        Ok(())
    }
}

impl FormDocument for LopdfFormDocument {
    fn text_fields(&self) -> Result<FieldMap> {
        Ok(self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect())
    }

    fn set_text_field(&mut self, name: &str, value: &str) -> Result<()> {
        let field_err = |reason: String| Error::FormField {
            field: name.to_string(),
            reason,
        };

        let field = self
            .fields
            .get(name)
            .ok_or_else(|| field_err("no such text field".to_string()))?;
        if field.read_only {
            return Err(field_err("field is read-only".to_string()));
        }
        if !self.on_last_page(field) {
            debug!("Field '{name}' is not on the last page, leaving it unchanged");
            return Ok(());
        }
        let id = field.id;

        self.doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| field_err(e.to_string()))?
            .set("V", Object::String(encode_text_string(value), StringFormat::Literal));

        self.set_need_appearances().map_err(|e| field_err(e.to_string()))?;

        if let Some(field) = self.fields.get_mut(name) {
            field.value = value.to_string();
        }
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.doc
            .save(path)
            .map_err(|e| Error::PdfSave(format!("Failed to write {}: {e}", path.display())))?;
        Ok(())
    }
}

// =============================================================================
// Field tree
// =============================================================================

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Object ids of the annotations on the document's last page.
fn last_page_annotations(doc: &Document) -> BTreeSet<ObjectId> {
    let Some(page_id) = doc.get_pages().values().next_back().copied() else {
        return BTreeSet::new();
    };

    doc.get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Annots").ok())
        .and_then(|annots| resolve(doc, annots))
        .and_then(|annots| annots.as_array().ok())
        .map(|annots| {
            annots
                .iter()
                .filter_map(|annot| annot.as_reference().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// All terminal text fields of the document's AcroForm, by qualified name.
fn collect_text_fields(doc: &Document) -> BTreeMap<String, TextField> {
    let mut fields = BTreeMap::new();

    let Some(fields_array) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve(doc, root))
        .and_then(|catalog| catalog.as_dict().ok())
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|acroform| resolve(doc, acroform))
        .and_then(|acroform| acroform.as_dict().ok())
        .and_then(|acroform| acroform.get(b"Fields").ok())
        .and_then(|f| resolve(doc, f))
        .and_then(|f| f.as_array().ok())
    else {
        return fields;
    };

    for entry in fields_array {
        if let Object::Reference(id) = entry {
            walk_field_tree(doc, *id, None, None, 0, &mut fields);
        }
    }

    fields
}

/// Recursively walk the field tree, collecting terminal text fields.
///
/// Intermediate nodes carry partial names; a `/Kids` array holding only
/// widget annotations (no `/T`) belongs to a terminal field.
fn walk_field_tree(
    doc: &Document,
    field_id: ObjectId,
    parent_name: Option<&str>,
    inherited_ft: Option<&[u8]>,
    depth: usize,
    fields: &mut BTreeMap<String, TextField>,
) {
    if depth >= MAX_FIELD_DEPTH {
        return;
    }

    let Ok(field_dict) = doc.get_object(field_id).and_then(Object::as_dict) else {
        return;
    };

    let partial_name = match field_dict.get(b"T").ok().and_then(|t| resolve(doc, t)) {
        Some(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    };

    let full_name = match (parent_name, partial_name) {
        (Some(parent), Some(name)) => format!("{parent}.{name}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(name)) => name,
        (None, None) => String::new(),
    };

    let field_type = match field_dict.get(b"FT") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => inherited_ft,
    };

    let kids = field_dict
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve(doc, k))
        .and_then(|k| k.as_array().ok());

    if let Some(kids) = kids {
        let has_child_fields = kids.iter().any(|kid| {
            resolve(doc, kid)
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.has(b"T"))
        });

        if has_child_fields {
            for kid in kids {
                if let Object::Reference(kid_id) = kid {
                    walk_field_tree(doc, *kid_id, Some(&full_name), field_type, depth + 1, fields);
                }
            }
            return;
        }
    }

    if field_type != Some(b"Tx".as_slice()) || full_name.is_empty() {
        return;
    }

    let value = match field_dict.get(b"V").ok().and_then(|v| resolve(doc, v)) {
        Some(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => String::new(),
    };

    let read_only = matches!(
        field_dict.get(b"Ff"),
        Ok(Object::Integer(flags)) if flags & FIELD_FLAG_READ_ONLY != 0
    );

    let widgets = match kids {
        Some(kids) if !kids.is_empty() => kids
            .iter()
            .filter_map(|kid| kid.as_reference().ok())
            .collect(),
        _ => vec![field_id],
    };

    fields.insert(
        full_name,
        TextField {
            id: field_id,
            value,
            read_only,
            widgets,
        },
    );
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with BOM, otherwise
/// single-byte (Latin-1 covers the printable PDFDocEncoding range).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(utf8).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}

/// Encode a PDF text string: plain bytes for ASCII, UTF-16BE with BOM
/// otherwise.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

// =============================================================================
// Filler
// =============================================================================

/// Writes fill data into the matching text fields of a PDF.
#[derive(Clone)]
pub struct FormFiller {
    backend: Arc<dyn FormFieldBackend>,
}

impl Default for FormFiller {
    fn default() -> Self {
        Self::new(Arc::new(LopdfFormBackend))
    }
}

impl FormFiller {
    pub fn new(backend: Arc<dyn FormFieldBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current text-field values of the PDF at `path`.
    pub fn existing_fields(&self, path: &Path) -> Result<FieldMap> {
        if !self.backend.is_available() {
            return Err(Error::FormBackendUnavailable);
        }
        self.backend.open(path)?.text_fields()
    }

    /// Fill `input`'s text fields from `data` and write the result to `output`.
    ///
    /// Keys without a matching text field are skipped; a field that cannot be
    /// written is logged and counted. Succeeds once the output is written,
    /// even when nothing matched.
    pub fn fill(&self, input: &Path, output: &Path, data: &FillData) -> Result<FillReport> {
        if data.is_empty() {
            return Err(Error::FormFillEmpty);
        }
        if !self.backend.is_available() {
            return Err(Error::FormBackendUnavailable);
        }

        let mut doc = self.backend.open(input)?;
        let existing = doc.text_fields()?;
        let mut report = FillReport::default();

        for (name, value) in data {
            if !existing.contains_key(name) {
                debug!("No text field named '{name}', skipping");
                report.skipped_unknown += 1;
                continue;
            }

            match doc.set_text_field(name, value) {
                Ok(()) => {
                    info!("Filled field '{name}'");
                    report.filled += 1;
                }
                Err(e) => {
                    warn!("Could not fill field '{name}': {e}");
                    report.failed += 1;
                }
            }
        }

        doc.save(output)?;
        info!(
            "Form fill: {} filled, {} unknown, {} failed",
            report.filled, report.skipped_unknown, report.failed
        );
        Ok(report)
    }
}

impl std::fmt::Debug for FormFiller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFiller")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Read a fill-data file: a flat JSON object of string values.
pub fn load_fill_data(path: &Path) -> Result<FillData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::FillData(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| {
            Error::FillData(format!("{} is not a JSON object of strings: {e}", path.display()))
        })
}
