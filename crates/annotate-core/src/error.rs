use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to parse PDF: {0}")]
    PdfParseError(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Render failed: {0}")]
    RenderError(String),

    #[error("No source asset is loaded")]
    NoAsset,

    #[error("Editor is in a load-error state: {0}")]
    LoadErrorState(String),
}
