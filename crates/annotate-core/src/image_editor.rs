//! Image-variant annotation editor
//!
//! Loads an image byte buffer, hosts the drawing session, and on save
//! flattens the annotations onto the original bitmap at native resolution,
//! producing a PNG blob plus the annotation list for the caller to persist.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tracing::{debug, warn};

use crate::annotation::{Annotation, DrawingToolConfig, LabelFont};
use crate::coords::{self, Point};
use crate::editor::{ChangeListener, DragOutcome, EditorSession, SaveOutput, SessionState, MIME_PNG};
use crate::error::AnnotateError;
use crate::raster;

/// Symmetric padding used when fitting the asset into the container.
const FIT_PADDING: f64 = 20.0;

pub struct ImageEditor {
    session: EditorSession,
    bitmap: Option<RgbaImage>,
    /// Size at which the asset is displayed; annotations live in this space.
    display_size: (f64, f64),
    tool: DrawingToolConfig,
    label_font: Option<LabelFont>,
}

impl ImageEditor {
    pub fn new(read_only: bool) -> Self {
        Self {
            session: EditorSession::new(read_only),
            bitmap: None,
            display_size: (0.0, 0.0),
            tool: DrawingToolConfig::default(),
            label_font: None,
        }
    }

    pub fn set_tool(&mut self, tool: DrawingToolConfig) {
        self.tool = tool;
    }

    /// Font used to measure and rasterize badge labels. Without one the
    /// badge geometry falls back to approximate metrics and no glyphs are
    /// drawn into the PNG.
    pub fn set_label_font(&mut self, font: LabelFont) {
        self.label_font = Some(font);
    }

    pub fn set_on_changes(&mut self, listener: ChangeListener) {
        self.session.set_on_changes(listener);
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.session.annotations()[..]
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    /// Decode the image and reset the session. On failure the editor enters
    /// the load-error state (no annotation surface, no saving) and the error
    /// is returned for the caller's own reporting.
    pub fn load(&mut self, bytes: &[u8], container: (f64, f64)) -> Result<(), AnnotateError> {
        let token = self.session.begin_load();
        let decoded = match image::load_from_memory(bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                warn!(error = %e, "image decode failed");
                self.session.fail_load(token, e.to_string());
                self.bitmap = None;
                return Err(AnnotateError::DecodeError(e.to_string()));
            }
        };
        if !self.session.complete_load(token) {
            // A newer load superseded this one; drop the stale bitmap.
            return Ok(());
        }
        let native = (decoded.width() as f64, decoded.height() as f64);
        debug!(width = native.0, height = native.1, "image loaded");
        self.bitmap = Some(decoded);
        // Images are displayed at native size; the viewport scale does the
        // fitting, so annotation space stays stable across zoom changes.
        self.display_size = native;
        self.session.fit_viewport(native, container, FIT_PADDING);
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

    /// Render the original bitmap plus every annotation at the asset's
    /// native resolution, serialize to PNG, and mark the session clean.
    /// Session state is left untouched on any failure so the user can retry.
    pub fn save(&mut self) -> Result<SaveOutput, AnnotateError> {
        if let SessionState::LoadError(msg) = self.session.state() {
            return Err(AnnotateError::LoadErrorState(msg.clone()));
        }
        let bitmap = self.bitmap.as_ref().ok_or(AnnotateError::NoAsset)?;

        let native = (bitmap.width() as f64, bitmap.height() as f64);
        let scale = coords::source_scale(self.display_size, native);
        let rescaled: Vec<Annotation> = self
            .session
            .annotations()
            .iter()
            .map(|a| coords::to_source_space(a, self.display_size, native))
            .collect();

        let mut flattened = bitmap.clone();
        raster::flatten_annotations(
            &mut flattened,
            &rescaled,
            self.tool.stroke_width * scale,
            self.tool.font_size * scale,
            self.label_font.as_ref(),
        );

        let mut bytes = Vec::new();
        flattened
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| AnnotateError::RenderError(e.to_string()))?;

        self.session.mark_saved();
        debug!(
            annotations = self.session.annotations().len(),
            size = bytes.len(),
            "image flattened to png"
        );
        Ok(SaveOutput {
            bytes,
            annotations: self.session.annotations().to_vec(),
            mime: MIME_PNG,
        })
    }
}
