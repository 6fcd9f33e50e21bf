use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Workbook write failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
