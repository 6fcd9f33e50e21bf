//! Test report export
//!
//! Assembles a three-sheet workbook (Overview, Test of Design, Interim)
//! from a risk-control-matrix record, one test execution, the attribute
//! and evidence lists, and the per-document AI evaluation results, then
//! serializes it to xlsx bytes ready to serve as a download.

pub mod builders;
pub mod error;
pub mod model;
pub mod sheet;
pub mod workbook;

pub use builders::{build_interim_sheet, build_overview_sheet, build_test_of_design_sheet};
pub use error::ExportError;
pub use model::{
    parse_attribute_results, AiDocumentResult, AttributeResult, EvidenceDocument, RcmRecord,
    TestAttribute, TestExecution,
};
pub use sheet::{Cell, Row, RowKind, Sheet};
pub use workbook::{export_workbook, report_filename, write_sheet, Report};
