//! Evidence annotation core
//!
//! Headless rectangle/label annotation editors for audit evidence documents.
//! Two variants share one gesture state machine: the image editor flattens
//! annotations into a PNG at the asset's native resolution, and the PDF
//! editor draws them as vector content onto the first page of the original
//! document. Callers own asset fetching, the label dialog, and persistence
//! of the produced blob; the editors communicate outward only through the
//! save output and the dirty-flag change callback.

pub mod annotation;
pub mod coords;
pub mod editor;
pub mod error;
pub mod history;
pub mod image_editor;
pub mod pdf_editor;
pub mod raster;

pub use annotation::{Annotation, DrawingToolConfig, LabelFont, MIN_RECT_SIZE};
pub use coords::{Point, Viewport};
pub use editor::{ChangeListener, DragOutcome, EditorSession, SaveOutput, SessionState};
pub use error::AnnotateError;
pub use history::History;
pub use image_editor::ImageEditor;
pub use pdf_editor::PdfEditor;
