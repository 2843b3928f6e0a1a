//! Export pipeline: burn annotations into a PDF's page content
//!
//! Takes the original document bytes plus an ordered annotation collection
//! and produces a new, standalone PDF with every annotation drawn into its
//! target page. The source bytes are never mutated in place. Annotation
//! geometry is already in PDF point space, so no coordinate transform happens
//! here; the pipeline only translates annotations into content-stream
//! operators and appends them after each page's existing content.
//!
//! Failure semantics: a source document that does not parse is fatal and
//! surfaces to the caller. A single bad annotation (page out of range, empty
//! text, strokes too short to draw) is skipped with a warning so it cannot
//! block recovery of the rest of the draft.

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ExportError;
use crate::model::{
    Annotation, AnnotationKind, Point, DEFAULT_FONT_SIZE_PT, DEFAULT_INK_THICKNESS_PT,
};

/// Name under which the embedded font is registered in each touched page's
/// resources. Chosen to be unlikely to collide with fonts the source
/// document already names.
const FONT_RESOURCE: &str = "FAnnot";

/// Ink strokes default to red, matching the editor's pen.
const DEFAULT_INK_COLOR: (f32, f32, f32) = (1.0, 0.0, 0.0);

#[derive(Default)]
struct PageBatch {
    ops: String,
    has_text: bool,
}

/// Render `annotations` onto `source_pdf` and return the flattened document.
///
/// Deterministic for a fixed input pair. Paint order is the slice order:
/// later annotations draw over earlier ones on the same page.
pub fn export(source_pdf: &[u8], annotations: &[Annotation]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::load_mem(source_pdf)
        .map_err(|e| ExportError::MalformedDocument(e.to_string()))?;

    // get_pages is keyed by 1-based page number and iterates in order.
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut batches: BTreeMap<usize, PageBatch> = BTreeMap::new();
    let mut skipped = 0usize;

    for ann in annotations {
        // Negative indices can arrive from corrupt persisted drafts; they
        // are skipped the same way as indices past the last page.
        let Some(page_index) = usize::try_from(ann.page_index)
            .ok()
            .filter(|i| *i < pages.len())
        else {
            tracing::warn!(
                id = %ann.id,
                page_index = ann.page_index,
                page_count = pages.len(),
                "annotation page out of range, skipped"
            );
            skipped += 1;
            continue;
        };

        match &ann.kind {
            AnnotationKind::Text {
                text, font_size_pt, ..
            } => {
                if text.trim().is_empty() {
                    tracing::warn!(id = %ann.id, "text annotation is empty, skipped");
                    skipped += 1;
                    continue;
                }
                let batch = batches.entry(page_index).or_default();
                batch.ops.push_str(&text_ops(
                    ann.x_pt,
                    ann.y_pt,
                    text,
                    font_size_pt.unwrap_or(DEFAULT_FONT_SIZE_PT),
                ));
                batch.has_text = true;
            }
            AnnotationKind::Ink {
                strokes,
                color,
                thickness_pt,
            } => {
                match ink_ops(
                    strokes,
                    color.as_deref(),
                    thickness_pt.unwrap_or(DEFAULT_INK_THICKNESS_PT),
                ) {
                    Some(ops) => batches.entry(page_index).or_default().ops.push_str(&ops),
                    None => {
                        tracing::warn!(id = %ann.id, "ink annotation has no drawable stroke, skipped");
                        skipped += 1;
                    }
                }
            }
        }
    }

    // One standard font object serves every text annotation in the export.
    let font_id = batches
        .values()
        .any(|b| b.has_text)
        .then(|| doc.add_object(Object::Dictionary(helvetica())));

    for (page_index, batch) in &batches {
        let page_id = pages[*page_index];
        if let (true, Some(font_id)) = (batch.has_text, font_id) {
            ensure_font_resource(&mut doc, page_id, font_id)?;
        }
        append_page_content(&mut doc, page_id, &batch.ops)?;
    }

    if skipped > 0 {
        tracing::debug!(skipped, total = annotations.len(), "export skipped annotations");
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;
    Ok(output)
}

/// Content ops for a text annotation. The anchor is the text's visual top,
/// so the baseline shifts down by one font size to land the glyph top where
/// the user clicked. Text is always black.
fn text_ops(x_pt: f64, y_pt: f64, text: &str, font_size: f64) -> String {
    let baseline = y_pt - font_size;
    format!(
        "q\nBT\n/{FONT_RESOURCE} {font_size} Tf\n0 0 0 rg\n{x_pt} {baseline} Td\n({}) Tj\nET\nQ\n",
        escape_pdf_text(text)
    )
}

/// Content ops for an ink annotation: one connected straight-segment path
/// per stroke, stroked unfilled with round caps and joins. Strokes with
/// fewer than 2 points have no drawable line and are dropped; returns `None`
/// when nothing at all is drawable.
fn ink_ops(strokes: &[Vec<Point>], color: Option<&str>, thickness: f64) -> Option<String> {
    let mut path = String::new();
    for stroke in strokes {
        if stroke.len() < 2 {
            continue;
        }
        path.push_str(&format!("{} {} m\n", stroke[0].x, stroke[0].y));
        for p in &stroke[1..] {
            path.push_str(&format!("{} {} l\n", p.x, p.y));
        }
        path.push_str("S\n");
    }
    if path.is_empty() {
        return None;
    }

    let (r, g, b) = color.and_then(parse_css_color).unwrap_or(DEFAULT_INK_COLOR);
    Some(format!("q\n{r} {g} {b} RG\n{thickness} w\n1 J\n1 j\n{path}Q\n"))
}

/// Escape special characters for a PDF string literal. Non-ASCII input is
/// replaced; the standard 14 fonts cannot encode it anyway.
fn escape_pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Parse a CSS-style color ("#RRGGBB", "#RGB", or a basic named color) into
/// RGB floats in the 0-1 range. Unparseable input yields `None` so the
/// caller's default applies.
fn parse_css_color(color: &str) -> Option<(f32, f32, f32)> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        return match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some((
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                ))
            }
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some((
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                ))
            }
            _ => None,
        };
    }

    match color.to_ascii_lowercase().as_str() {
        "black" => Some((0.0, 0.0, 0.0)),
        "white" => Some((1.0, 1.0, 1.0)),
        "red" => Some((1.0, 0.0, 0.0)),
        "green" => Some((0.0, 0.5, 0.0)),
        "blue" => Some((0.0, 0.0, 1.0)),
        "yellow" => Some((1.0, 1.0, 0.0)),
        "orange" => Some((1.0, 0.647, 0.0)),
        "purple" => Some((0.5, 0.0, 0.5)),
        "gray" | "grey" => Some((0.5, 0.5, 0.5)),
        _ => None,
    }
}

/// The single standard font embedded per export.
fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    }
}

fn page_dict<'a>(doc: &'a Document, page_id: ObjectId) -> Result<&'a Dictionary, ExportError> {
    doc.get_object(page_id)
        .map_err(|e| ExportError::MalformedDocument(e.to_string()))?
        .as_dict()
        .map_err(|_| ExportError::MalformedDocument("page is not a dictionary".into()))
}

fn page_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
) -> Result<&'a mut Dictionary, ExportError> {
    doc.get_object_mut(page_id)
        .map_err(|e| ExportError::MalformedDocument(e.to_string()))?
        .as_dict_mut()
        .map_err(|_| ExportError::MalformedDocument("page is not a dictionary".into()))
}

/// Append drawing ops after a page's existing content.
///
/// The original content is bracketed in `q`/`Q` so the appended ops run in
/// the page's initial coordinate system even when earlier streams leave the
/// graphics state modified. `Contents` may be a single stream reference, a
/// reference to an array, an inline array, or absent.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: &str,
) -> Result<(), ExportError> {
    let guard_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        b"q\n".to_vec(),
    )));
    let body = format!("Q\n{ops}");
    let body_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        body.into_bytes(),
    )));

    let existing = page_dict(doc, page_id)?.get(b"Contents").ok().cloned();
    let mut contents = match existing {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(other) => vec![other],
        None => Vec::new(),
    };
    contents.insert(0, Object::Reference(guard_id));
    contents.push(Object::Reference(body_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Register the embedded font in the page's `Resources/Font` dictionary,
/// resolving references where the source document uses them.
fn ensure_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), ExportError> {
    let resources_ref = page_dict(doc, page_id)?
        .get(b"Resources")
        .ok()
        .and_then(|o| o.as_reference().ok());

    if let Some(res_id) = resources_ref {
        let font_dict_ref = doc
            .get_object(res_id)
            .map_err(|e| ExportError::MalformedDocument(e.to_string()))?
            .as_dict()
            .map_err(|_| ExportError::MalformedDocument("Resources is not a dictionary".into()))?
            .get(b"Font")
            .ok()
            .and_then(|o| o.as_reference().ok());

        if let Some(fonts_id) = font_dict_ref {
            set_font_entry_at(doc, fonts_id, font_id)?;
        } else {
            let res = doc
                .get_object_mut(res_id)
                .map_err(|e| ExportError::MalformedDocument(e.to_string()))?
                .as_dict_mut()
                .map_err(|_| {
                    ExportError::MalformedDocument("Resources is not a dictionary".into())
                })?;
            set_font_entry(res, font_id);
        }
        return Ok(());
    }

    // Inline (or absent) resources on the page itself; Font may still be a
    // reference inside the inline dictionary.
    let font_dict_ref = match page_dict(doc, page_id)?.get(b"Resources") {
        Ok(Object::Dictionary(res)) => res.get(b"Font").ok().and_then(|o| o.as_reference().ok()),
        _ => None,
    };

    if let Some(fonts_id) = font_dict_ref {
        set_font_entry_at(doc, fonts_id, font_id)?;
    } else {
        // Writing a page-level Resources shadows anything inherited from the
        // Pages tree, so start from the effective dictionary rather than an
        // empty one or the existing content's fonts become unresolvable.
        let mut res = effective_resources(doc, page_id);
        match res.get(b"Font").ok().and_then(|o| o.as_reference().ok()) {
            Some(fonts_id) => set_font_entry_at(doc, fonts_id, font_id)?,
            None => set_font_entry(&mut res, font_id),
        }
        page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(res));
    }
    Ok(())
}

/// The resources a page actually sees: its own entry if it has one,
/// otherwise the nearest entry up the Pages tree (Resources is inheritable).
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut node_id = Some(page_id);
    while let Some(id) = node_id {
        let Ok(node) = doc.get_object(id).and_then(|o| o.as_dict()) else {
            break;
        };
        match node.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return d.clone(),
            Ok(Object::Reference(res_id)) => {
                return doc
                    .get_object(*res_id)
                    .and_then(|o| o.as_dict())
                    .map(Clone::clone)
                    .unwrap_or_else(|_| Dictionary::new());
            }
            _ => {}
        }
        node_id = node.get(b"Parent").ok().and_then(|o| o.as_reference().ok());
    }
    Dictionary::new()
}

fn set_font_entry(resources: &mut Dictionary, font_id: ObjectId) {
    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
}

fn set_font_entry_at(
    doc: &mut Document,
    fonts_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), ExportError> {
    let fonts = doc
        .get_object_mut(fonts_id)
        .map_err(|e| ExportError::MalformedDocument(e.to_string()))?
        .as_dict_mut()
        .map_err(|_| ExportError::MalformedDocument("Font is not a dictionary".into()))?;
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    Ok(())
}
