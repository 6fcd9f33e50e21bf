//! PDF-variant annotation editor
//!
//! The source is a PDF's first page only. The page is presented to the user
//! as a raster preview sized by the render-scale policy; annotations live in
//! that raster's pixel space. Save re-parses the original byte buffer and
//! draws each rectangle and label as native vector content onto the real
//! page at rescaled, Y-flipped coordinates, producing a new PDF.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::annotation::{parse_hex_color, Annotation, DrawingToolConfig, LabelFont, BADGE_PADDING};
use crate::coords::{self, Point};
use crate::editor::{ChangeListener, DragOutcome, EditorSession, SaveOutput, SessionState, MIME_PDF};
use crate::error::AnnotateError;

/// The raster preview is sized so the longer-fitting dimension reaches 95%
/// of the container.
const RENDER_FILL: f64 = 0.95;

/// US Letter, used when a document carries no resolvable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

const LABEL_FONT_KEY: &str = "AnnotLabel";

pub struct PdfEditor {
    session: EditorSession,
    /// Original document bytes, kept since load; save re-parses these so the
    /// output is always original-plus-annotations, never a re-save of a
    /// re-save.
    original: Option<Vec<u8>>,
    page_size: (f64, f64),
    /// Raster preview size; the annotation coordinate space.
    display_size: (f64, f64),
    render_scale: f64,
    tool: DrawingToolConfig,
    label_font: Option<LabelFont>,
    prefer_bold_labels: bool,
}

impl PdfEditor {
    pub fn new(read_only: bool) -> Self {
        Self {
            session: EditorSession::new(read_only),
            original: None,
            page_size: (0.0, 0.0),
            display_size: (0.0, 0.0),
            render_scale: 1.0,
            tool: DrawingToolConfig::default(),
            label_font: None,
            prefer_bold_labels: true,
        }
    }

    pub fn set_tool(&mut self, tool: DrawingToolConfig) {
        self.tool = tool;
    }

    /// Font used only to measure badge labels for the preview geometry; the
    /// PDF output uses a standard-14 font.
    pub fn set_label_font(&mut self, font: LabelFont) {
        self.label_font = Some(font);
    }

    /// Label face for the PDF output: Helvetica-Bold by default, plain
    /// Helvetica when bold is not wanted.
    pub fn set_prefer_bold_labels(&mut self, prefer_bold: bool) {
        self.prefer_bold_labels = prefer_bold;
    }

    pub fn set_on_changes(&mut self, listener: ChangeListener) {
        self.session.set_on_changes(listener);
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.session.annotations()
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    pub fn page_size(&self) -> (f64, f64) {
        self.page_size
    }

    pub fn display_size(&self) -> (f64, f64) {
        self.display_size
    }

    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    /// Parse the document, read the first page's size, and pick the preview
    /// render scale for the given container. Parse failures and zero-page
    /// documents put the editor into the load-error state.
    pub fn load(&mut self, bytes: &[u8], container: (f64, f64)) -> Result<(), AnnotateError> {
        let token = self.session.begin_load();
        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "pdf parse failed");
                self.session.fail_load(token, e.to_string());
                self.original = None;
                return Err(AnnotateError::PdfParseError(e.to_string()));
            }
        };
        let pages = doc.get_pages();
        let Some((_, first_page)) = pages.into_iter().next() else {
            self.session.fail_load(token, "document has no pages".to_string());
            self.original = None;
            return Err(AnnotateError::EmptyDocument);
        };
        let media_box = page_media_box(&doc, first_page);
        let page_size = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

        if !self.session.complete_load(token) {
            return Ok(());
        }
        self.page_size = page_size;
        self.render_scale = if container.0 > 0.0 && container.1 > 0.0 {
            RENDER_FILL * (container.0 / page_size.0).min(container.1 / page_size.1)
        } else {
            1.0
        };
        self.display_size = (page_size.0 * self.render_scale, page_size.1 * self.render_scale);
        self.original = Some(bytes.to_vec());
        debug!(
            page_width = page_size.0,
            page_height = page_size.1,
            render_scale = self.render_scale,
            "pdf loaded"
        );
        Ok(())
    }

    // ---- gestures (delegated to the session) -----------------------------

    pub fn begin_drag(&mut self, pointer: Point) {
        self.session.begin_drag(pointer, &self.tool);
    }

    pub fn update_drag(&mut self, pointer: Point) {
        self.session.update_drag(pointer);
    }

    pub fn finish_drag(&mut self) -> DragOutcome {
        self.session.finish_drag()
    }

    pub fn commit_label(&mut self, label: &str) -> bool {
        self.session.commit_label(label, self.label_font.as_ref())
    }

    pub fn cancel_pending(&mut self) {
        self.session.cancel_pending();
    }

    pub fn undo(&mut self) {
        self.session.undo();
    }

    pub fn redo(&mut self) {
        self.session.redo();
    }

    pub fn wheel_zoom(&mut self, pointer: Point, zoom_in: bool) {
        self.session.wheel_zoom(pointer, zoom_in);
    }

    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    // ---- save -------------------------------------------------------------

    /// Re-parse the original document and draw every annotation as vector
    /// content onto the first page. Session state is left untouched on any
    /// failure so the user can retry without redrawing.
    pub fn save(&mut self) -> Result<SaveOutput, AnnotateError> {
        if let SessionState::LoadError(msg) = self.session.state() {
            return Err(AnnotateError::LoadErrorState(msg.clone()));
        }
        let original = self.original.as_ref().ok_or(AnnotateError::NoAsset)?;

        let mut doc = Document::load_mem(original)
            .map_err(|e| AnnotateError::PdfParseError(e.to_string()))?;
        let Some((_, page_id)) = doc.get_pages().into_iter().next() else {
            return Err(AnnotateError::EmptyDocument);
        };

        if !self.session.annotations().is_empty() {
            let font_ref = register_label_font(&mut doc, self.prefer_bold_labels);
            ensure_page_font(&mut doc, page_id, LABEL_FONT_KEY, font_ref)?;

            let mut ops = String::new();
            for annotation in self.session.annotations() {
                ops.push_str(&annotation_ops(
                    annotation,
                    self.display_size,
                    self.page_size,
                    &self.tool,
                ));
            }
            append_page_content(&mut doc, page_id, ops.into_bytes())?;
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AnnotateError::RenderError(e.to_string()))?;

        self.session.mark_saved();
        debug!(
            annotations = self.session.annotations().len(),
            size = bytes.len(),
            "pdf annotated and serialized"
        );
        Ok(SaveOutput {
            bytes,
            annotations: self.session.annotations().to_vec(),
            mime: MIME_PDF,
        })
    }
}

/// Standard-14 label face. Bold is preferred; the plain variant is the
/// fallback when bold is not selectable.
fn label_base_font(prefer_bold: bool) -> &'static str {
    if prefer_bold {
        "Helvetica-Bold"
    } else {
        "Helvetica"
    }
}

fn register_label_font(doc: &mut Document, prefer_bold: bool) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set(
        "BaseFont",
        Object::Name(label_base_font(prefer_bold).as_bytes().to_vec()),
    );
    doc.add_object(Object::Dictionary(font))
}

/// Resolve the first page's MediaBox, walking the Parent chain for inherited
/// boxes. Falls back to US Letter when nothing resolves.
fn page_media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let mut current = page_id;
    for _ in 0..16 {
        let Ok(dict) = doc.get_object(current).and_then(Object::as_dict) else {
            break;
        };
        if let Ok(obj) = dict.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(resolved) => resolved,
                    Err(_) => break,
                },
                other => other,
            };
            if let Object::Array(arr) = obj {
                if arr.len() == 4 {
                    let mut bx = [0.0f64; 4];
                    let mut ok = true;
                    for (i, value) in arr.iter().enumerate() {
                        match value {
                            Object::Real(v) => bx[i] = *v as f64,
                            Object::Integer(v) => bx[i] = *v as f64,
                            _ => ok = false,
                        }
                    }
                    if ok {
                        return bx;
                    }
                }
            }
            break;
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => current = *id,
            _ => break,
        }
    }
    warn!("no resolvable MediaBox; assuming US Letter");
    DEFAULT_MEDIA_BOX
}

/// Escape special characters for PDF string literals.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Content-stream operators for one annotation: stroked rectangle, then a
/// filled badge with white label text when the annotation carries a label.
fn annotation_ops(
    annotation: &Annotation,
    display_size: (f64, f64),
    page_size: (f64, f64),
    tool: &DrawingToolConfig,
) -> String {
    let (x, y, w, h) = annotation.normalized();
    let rect = coords::to_pdf_space(x, y, w, h, display_size, page_size);
    let scale = coords::source_scale(display_size, page_size);
    let (r, g, b) = parse_hex_color(&annotation.color);
    let (r, g, b) = (
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
    );
    let stroke_width = tool.stroke_width * scale;

    let mut ops = format!(
        "q\n{r:.3} {g:.3} {b:.3} RG\n{sw:.2} w\n{x:.2} {y:.2} {w:.2} {h:.2} re\nS\nQ\n",
        r = r,
        g = g,
        b = b,
        sw = stroke_width,
        x = rect.x,
        y = rect.y,
        w = rect.width,
        h = rect.height,
    );

    if !annotation.label.is_empty() {
        let badge = coords::to_pdf_space(
            annotation.badge_x,
            annotation.badge_y,
            annotation.label_width,
            annotation.label_height,
            display_size,
            page_size,
        );
        let font_size = tool.font_size * scale;
        let text_x = badge.x + (BADGE_PADDING / 2.0) * scale;
        // Approximate baseline placement inside the fixed-height badge
        let text_y = badge.y + badge.height / 2.0 - font_size / 3.0;
        ops.push_str(&format!(
            "q\n{r:.3} {g:.3} {b:.3} rg\n{bx:.2} {by:.2} {bw:.2} {bh:.2} re\nf\nBT\n/{key} {fs:.2} Tf\n1 1 1 rg\n{tx:.2} {ty:.2} Td\n({label}) Tj\nET\nQ\n",
            r = r,
            g = g,
            b = b,
            bx = badge.x,
            by = badge.y,
            bw = badge.width,
            bh = badge.height,
            key = LABEL_FONT_KEY,
            fs = font_size,
            tx = text_x,
            ty = text_y,
            label = escape_pdf_string(&annotation.label),
        ));
    }
    ops
}

/// Make the label font reachable from the page's Resources/Font dictionary,
/// tolerating inline dictionaries, references, and missing entries.
fn ensure_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    key: &str,
    font_ref: ObjectId,
) -> Result<(), AnnotateError> {
    enum Slot {
        Missing,
        Inline,
        Ref(ObjectId),
    }

    let resources_slot = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Slot::Ref(*id),
            Ok(Object::Dictionary(_)) => Slot::Inline,
            _ => Slot::Missing,
        }
    };

    let fonts_ref = match resources_slot {
        Slot::Missing => {
            let mut fonts = Dictionary::new();
            fonts.set(key, Object::Reference(font_ref));
            let mut resources = Dictionary::new();
            resources.set("Font", Object::Dictionary(fonts));
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
            page.set("Resources", Object::Dictionary(resources));
            None
        }
        Slot::Inline => {
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
            let resources = page
                .get_mut(b"Resources")
                .and_then(Object::as_dict_mut)
                .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
            set_font_entry(resources, key, font_ref)
        }
        Slot::Ref(id) => {
            let resources = doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
            set_font_entry(resources, key, font_ref)
        }
    };

    // A Font entry stored behind its own reference needs one more hop.
    if let Some(fonts_id) = fonts_ref {
        let fonts = doc
            .get_object_mut(fonts_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
        fonts.set(key, Object::Reference(font_ref));
    }
    Ok(())
}

fn set_font_entry(resources: &mut Dictionary, key: &str, font_ref: ObjectId) -> Option<ObjectId> {
    match resources.get_mut(b"Font") {
        Ok(Object::Dictionary(fonts)) => {
            fonts.set(key, Object::Reference(font_ref));
            None
        }
        Ok(Object::Reference(id)) => Some(*id),
        _ => {
            let mut fonts = Dictionary::new();
            fonts.set(key, Object::Reference(font_ref));
            resources.set("Font", Object::Dictionary(fonts));
            None
        }
    }
}

/// Append a content stream after the page's existing Contents so the
/// annotations draw on top of the page.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), AnnotateError> {
    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    let mut contents: Vec<Object> = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
        match page.get(b"Contents") {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(reference @ Object::Reference(_)) => vec![reference.clone()],
            _ => Vec::new(),
        }
    };
    contents.push(Object::Reference(stream_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| AnnotateError::RenderError(e.to_string()))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        });
        if let Ok(page) = doc.get_object_mut(page_id) {
            if let Ok(dict) = page.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Container sized so the render scale works out to exactly 1.0 and the
    /// display raster matches the page point grid.
    fn native_container() -> (f64, f64) {
        (612.0 / RENDER_FILL, 792.0 / RENDER_FILL)
    }

    fn draw_rect(editor: &mut PdfEditor, from: (f64, f64), to: (f64, f64), label: &str) -> bool {
        editor.begin_drag(Point::new(from.0, from.1));
        editor.update_drag(Point::new(to.0, to.1));
        match editor.finish_drag() {
            DragOutcome::NeedsLabel => editor.commit_label(label),
            _ => false,
        }
    }

    /// Concatenated plain-text content of every content stream on page 1.
    fn page_content_text(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn test_load_reads_page_size() {
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert_eq!(editor.page_size(), (612.0, 792.0));
        assert!((editor.render_scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_garbage_enters_load_error_state() {
        let mut editor = PdfEditor::new(false);
        let err = editor.load(b"not a pdf at all", (800.0, 600.0));
        assert!(matches!(err, Err(AnnotateError::PdfParseError(_))));
        assert!(matches!(editor.state(), SessionState::LoadError(_)));
        assert!(matches!(editor.save(), Err(AnnotateError::LoadErrorState(_))));
    }

    #[test]
    fn test_save_produces_valid_pdf() {
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert!(draw_rect(&mut editor, (100.0, 100.0), (250.0, 180.0), "Sig"));

        let output = editor.save().unwrap();
        assert!(output.bytes.starts_with(b"%PDF-"));
        assert_eq!(output.mime, MIME_PDF);
        assert_eq!(output.annotations.len(), 1);
        assert!(!editor.is_dirty());

        let doc = Document::load_mem(&output.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_rectangle_y_is_flipped_into_page_space() {
        // Page height 792pt, display equals native: a rect at display y=100
        // with height 50 must land at pdf_y = 792 - 150 = 642
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert!(draw_rect(&mut editor, (60.0, 100.0), (140.0, 150.0), "Sig"));

        let output = editor.save().unwrap();
        let content = page_content_text(&output.bytes);
        assert!(
            content.contains("60.00 642.00 80.00 50.00 re"),
            "content stream missing flipped rect: {content}"
        );
    }

    #[test]
    fn test_label_text_and_font_are_emitted() {
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert!(draw_rect(&mut editor, (60.0, 100.0), (140.0, 150.0), "Sig (A)"));

        let output = editor.save().unwrap();
        let content = page_content_text(&output.bytes);
        // Parens in the label must be escaped in the string literal
        assert!(content.contains("(Sig \\(A\\)) Tj"));
        assert!(content.contains("/AnnotLabel"));

        let text = String::from_utf8_lossy(&output.bytes).into_owned();
        assert!(text.contains("Helvetica-Bold"));
    }

    #[test]
    fn test_save_without_annotations_keeps_document_loadable() {
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        let output = editor.save().unwrap();
        let doc = Document::load_mem(&output.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_render_scale_fills_container_to_95_percent() {
        let mut editor = PdfEditor::new(false);
        editor.load(&create_test_pdf(), (612.0, 792.0)).unwrap();
        assert!((editor.render_scale() - RENDER_FILL).abs() < 1e-9);
        let (dw, dh) = editor.display_size();
        assert!((dw - 612.0 * RENDER_FILL).abs() < 1e-9);
        assert!((dh - 792.0 * RENDER_FILL).abs() < 1e-9);
    }

    #[test]
    fn test_plain_label_face_is_selectable() {
        let mut editor = PdfEditor::new(false);
        editor.set_prefer_bold_labels(false);
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert!(draw_rect(&mut editor, (60.0, 100.0), (140.0, 150.0), "Sig"));

        let output = editor.save().unwrap();
        let text = String::from_utf8_lossy(&output.bytes).into_owned();
        assert!(text.contains("Helvetica"));
        assert!(!text.contains("Helvetica-Bold"));
    }

    #[test]
    fn test_malformed_tool_color_saves_as_black() {
        let mut editor = PdfEditor::new(false);
        editor.set_tool(DrawingToolConfig {
            color: "é€xx".to_string(),
            ..DrawingToolConfig::default()
        });
        editor.load(&create_test_pdf(), native_container()).unwrap();
        assert!(draw_rect(&mut editor, (60.0, 100.0), (140.0, 150.0), "Sig"));

        let output = editor.save().unwrap();
        let content = page_content_text(&output.bytes);
        assert!(content.contains("0.000 0.000 0.000 RG"));
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("naïve"), "na?ve");
    }

    #[test]
    fn test_bold_font_fallback() {
        assert_eq!(label_base_font(true), "Helvetica-Bold");
        assert_eq!(label_base_font(false), "Helvetica");
    }
}
