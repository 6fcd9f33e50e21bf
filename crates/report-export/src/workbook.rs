//! Workbook assembly and styling
//!
//! Takes the three built sheets and renders them with rust_xlsxwriter.
//! Styling is keyed off each row's `RowKind` tag: section headers merge
//! across the sheet's width on a dark fill, sub-headers on a lighter fill,
//! column headers get bold bordered cells, data rows are written plain.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

use crate::builders::{build_interim_sheet, build_overview_sheet, build_test_of_design_sheet};
use crate::error::ExportError;
use crate::model::{AiDocumentResult, EvidenceDocument, RcmRecord, TestAttribute, TestExecution};
use crate::sheet::{Cell, RowKind, Sheet};

const FIRST_COLUMN_WIDTH: f64 = 42.0;
const COLUMN_WIDTH: f64 = 18.0;

/// A finished report: the workbook bytes and the filename to serve it as.
#[derive(Debug)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn section_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x1F_4E_78))
        .set_align(FormatAlign::Left)
}

fn sub_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9_E1_F2))
        .set_align(FormatAlign::Left)
}

fn column_format() -> Format {
    Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xF2_F2_F2))
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: Option<&Format>,
) -> Result<(), ExportError> {
    match (cell, format) {
        (Cell::Text(s), Some(f)) => worksheet.write_string_with_format(row, col, s, f)?,
        (Cell::Text(s), None) => worksheet.write_string(row, col, s)?,
        (Cell::Number(n), Some(f)) => worksheet.write_number_with_format(row, col, *n, f)?,
        (Cell::Number(n), None) => worksheet.write_number(row, col, *n)?,
    };
    Ok(())
}

fn write_header_band(
    worksheet: &mut Worksheet,
    row: u32,
    title: &str,
    width: usize,
    format: &Format,
) -> Result<(), ExportError> {
    // merge_range needs at least two cells; single-column sheets fall back
    // to a plain formatted write.
    if width > 1 {
        worksheet.merge_range(row, 0, row, (width - 1) as u16, title, format)?;
    } else {
        worksheet.write_string_with_format(row, 0, title, format)?;
    }
    Ok(())
}

/// Render one built sheet onto a worksheet.
pub fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), ExportError> {
    worksheet.set_name(&sheet.name)?;

    let width = sheet.max_columns();
    worksheet.set_column_width(0, FIRST_COLUMN_WIDTH)?;
    for col in 1..width {
        worksheet.set_column_width(col as u16, COLUMN_WIDTH)?;
    }

    let section = section_format();
    let sub = sub_format();
    let column = column_format();

    for (r, row) in sheet.rows.iter().enumerate() {
        let r = r as u32;
        match row.kind {
            RowKind::SectionHeader => write_header_band(worksheet, r, row.title(), width, &section)?,
            RowKind::SubHeader => write_header_band(worksheet, r, row.title(), width, &sub)?,
            RowKind::ColumnHeader => {
                for (c, cell) in row.cells.iter().enumerate() {
                    write_cell(worksheet, r, c as u16, cell, Some(&column))?;
                }
            }
            RowKind::Data => {
                for (c, cell) in row.cells.iter().enumerate() {
                    write_cell(worksheet, r, c as u16, cell, None)?;
                }
            }
        }
    }

    Ok(())
}

/// "{control_id}_{year}_{quarter}_Test_Report.xlsx", spaces replaced so the
/// name survives content-disposition headers.
pub fn report_filename(control_id: &str, year: i32, quarter: &str) -> String {
    let name = format!("{control_id}_{year}_{quarter}_Test_Report.xlsx");
    name.replace(' ', "_")
}

/// Build the full three-sheet report and serialize it to bytes.
pub fn export_workbook(
    rcm: &RcmRecord,
    execution: &TestExecution,
    attributes: &[TestAttribute],
    documents: &[EvidenceDocument],
    results: &[AiDocumentResult],
) -> Result<Report, ExportError> {
    let sheets = [
        build_overview_sheet(rcm, execution, documents),
        build_test_of_design_sheet(attributes, documents, results),
        build_interim_sheet(rcm, execution, attributes),
    ];

    let mut workbook = Workbook::new();
    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }

    let bytes = workbook.save_to_buffer()?;
    let filename = report_filename(&rcm.control_id, execution.year, &execution.quarter);
    debug!(
        filename = %filename,
        bytes = bytes.len(),
        documents = documents.len(),
        "report workbook assembled"
    );

    Ok(Report { filename, bytes })
}
