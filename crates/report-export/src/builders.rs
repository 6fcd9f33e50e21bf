//! The three report sheet builders
//!
//! Row order and header literals are contractual: they define the printed
//! report layout. Data rows zip the RCM record, test execution, attribute
//! list, evidence documents, and per-document AI results together.

use crate::model::{
    parse_attribute_results, AiDocumentResult, AttributeResult, EvidenceDocument, RcmRecord,
    TestAttribute, TestExecution,
};
use crate::sheet::{Cell, Row, Sheet};

const NOT_AVAILABLE: &str = "N/A";

fn verdict(results: Option<&[AttributeResult]>, attribute: &str) -> String {
    let Some(results) = results else {
        return NOT_AVAILABLE.to_string();
    };
    match results.iter().find(|r| r.attribute_name == attribute) {
        Some(r) if r.result => "Pass".to_string(),
        Some(_) => "Fail".to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn testing_period(execution: &TestExecution) -> String {
    format!("{} {}", execution.year, execution.quarter)
}

fn label_value(label: &str, value: &str) -> Row {
    Row::data(vec![Cell::from(label), Cell::from(value)])
}

/// "Overview": control metadata, test information, and the evidence list.
pub fn build_overview_sheet(
    rcm: &RcmRecord,
    execution: &TestExecution,
    documents: &[EvidenceDocument],
) -> Sheet {
    let mut sheet = Sheet::new("Overview");

    sheet.push(Row::section("Control Overview"));
    sheet.push(label_value("Control ID", &rcm.control_id));
    sheet.push(label_value("Control Name", &rcm.control_name));
    sheet.push(label_value("Control Description", &rcm.control_description));
    sheet.push(label_value("Control Owner", &rcm.control_owner));
    sheet.push(label_value("Frequency", &rcm.frequency));
    sheet.push(label_value("Risk Description", &rcm.risk_description));

    sheet.push(Row::section("Test Information"));
    sheet.push(label_value("Testing Period", &testing_period(execution)));
    sheet.push(label_value("Tester", &execution.tester));
    sheet.push(label_value("Test Date", &execution.test_date));
    sheet.push(label_value("Conclusion", &execution.conclusion));

    sheet.push(Row::section("Evidence Provided"));
    sheet.push(Row::columns(&["#", "Document Name", "Reference"]));
    for (i, doc) in documents.iter().enumerate() {
        sheet.push(Row::data(vec![
            Cell::from(i + 1),
            Cell::from(doc.name.as_str()),
            Cell::from(doc.reference.as_str()),
        ]));
    }

    sheet
}

/// "Test of Design": one verdict column per attribute, one row per evidence
/// document, followed by the explanations and attribute definitions.
/// Documents and results zip by position; a result that is missing or
/// unparseable renders "N/A" in every attribute column of its row.
pub fn build_test_of_design_sheet(
    attributes: &[TestAttribute],
    documents: &[EvidenceDocument],
    results: &[AiDocumentResult],
) -> Sheet {
    let mut sheet = Sheet::new("Test of Design");

    sheet.push(Row::section("Test of Design"));
    sheet.push(Row::sub("Attribute Results by Evidence Document"));

    let mut header = vec!["Document Name"];
    header.extend(attributes.iter().map(|a| a.name.as_str()));
    sheet.push(Row::columns(&header));

    let parsed: Vec<Option<Vec<AttributeResult>>> = documents
        .iter()
        .enumerate()
        .map(|(i, _)| {
            results
                .get(i)
                .and_then(|r| parse_attribute_results(r.result.as_ref()))
        })
        .collect();

    for (i, doc) in documents.iter().enumerate() {
        let mut cells = vec![Cell::from(doc.name.as_str())];
        let doc_results = parsed[i].as_deref();
        for attribute in attributes {
            cells.push(Cell::from(verdict(doc_results, &attribute.name)));
        }
        sheet.push(Row::data(cells));
    }

    sheet.push(Row::sub("Result Explanations"));
    sheet.push(Row::columns(&["Document Name", "Attribute", "Explanation"]));
    for (i, doc) in documents.iter().enumerate() {
        let Some(doc_results) = parsed[i].as_deref() else {
            continue;
        };
        for result in doc_results {
            let explanation = result
                .explanation
                .as_deref()
                .or(result.details.as_deref())
                .unwrap_or(NOT_AVAILABLE);
            sheet.push(Row::data(vec![
                Cell::from(doc.name.as_str()),
                Cell::from(result.attribute_name.as_str()),
                Cell::from(explanation),
            ]));
        }
    }

    sheet.push(Row::section("Attribute Definitions"));
    sheet.push(Row::columns(&["#", "Attribute", "Description"]));
    for (i, attribute) in attributes.iter().enumerate() {
        sheet.push(Row::data(vec![
            Cell::from(i + 1),
            Cell::from(attribute.name.as_str()),
            Cell::from(attribute.description.as_str()),
        ]));
    }

    sheet
}

/// "Interim": the abbreviated periodic view.
pub fn build_interim_sheet(
    rcm: &RcmRecord,
    execution: &TestExecution,
    attributes: &[TestAttribute],
) -> Sheet {
    let mut sheet = Sheet::new("Interim");

    sheet.push(Row::section("Interim Testing"));
    sheet.push(label_value("Control ID", &rcm.control_id));
    sheet.push(label_value("Control Name", &rcm.control_name));
    sheet.push(label_value("Testing Period", &testing_period(execution)));
    sheet.push(label_value("Tester", &execution.tester));
    sheet.push(label_value("Conclusion", &execution.conclusion));

    sheet.push(Row::sub("Attributes Tested"));
    sheet.push(Row::columns(&["#", "Attribute", "Description"]));
    for (i, attribute) in attributes.iter().enumerate() {
        sheet.push(Row::data(vec![
            Cell::from(i + 1),
            Cell::from(attribute.name.as_str()),
            Cell::from(attribute.description.as_str()),
        ]));
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::RowKind;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn rcm() -> RcmRecord {
        RcmRecord {
            control_id: "FIN-01".to_string(),
            control_name: "Bank reconciliation review".to_string(),
            control_description: "Monthly reconciliations are reviewed and signed off".to_string(),
            control_owner: "Controller".to_string(),
            frequency: "Monthly".to_string(),
            risk_description: "Unreconciled differences go undetected".to_string(),
        }
    }

    fn execution() -> TestExecution {
        TestExecution {
            year: 2024,
            quarter: "Q2".to_string(),
            tester: "A. Auditor".to_string(),
            test_date: "2024-06-30".to_string(),
            conclusion: "Effective".to_string(),
        }
    }

    fn attributes() -> Vec<TestAttribute> {
        vec![
            TestAttribute {
                name: "Signature present".to_string(),
                description: "Reviewer signature exists".to_string(),
            },
            TestAttribute {
                name: "Dated".to_string(),
                description: "Sign-off is dated within the period".to_string(),
            },
        ]
    }

    fn documents() -> Vec<EvidenceDocument> {
        vec![
            EvidenceDocument {
                name: "recon_april.pdf".to_string(),
                reference: "PBC-12".to_string(),
            },
            EvidenceDocument {
                name: "recon_may.pdf".to_string(),
                reference: "PBC-13".to_string(),
            },
        ]
    }

    fn result_for(doc: &str, payload: Value) -> AiDocumentResult {
        AiDocumentResult {
            document_name: doc.to_string(),
            result: Some(payload),
        }
    }

    #[test]
    fn test_overview_layout_contract() {
        let sheet = build_overview_sheet(&rcm(), &execution(), &documents());
        assert_eq!(sheet.name, "Overview");
        assert_eq!(sheet.rows[0].kind, RowKind::SectionHeader);
        assert_eq!(sheet.rows[0].title(), "Control Overview");
        assert_eq!(sheet.rows[1].cells[1], Cell::Text("FIN-01".to_string()));
        assert_eq!(sheet.rows[7].title(), "Test Information");
        assert_eq!(sheet.rows[8].cells[1], Cell::Text("2024 Q2".to_string()));
        assert_eq!(sheet.rows[12].title(), "Evidence Provided");
        assert_eq!(sheet.rows[13].kind, RowKind::ColumnHeader);
        // Two evidence rows, numbered from 1
        assert_eq!(sheet.rows[14].cells[0], Cell::Number(1.0));
        assert_eq!(sheet.rows[15].cells[0], Cell::Number(2.0));
    }

    #[test]
    fn test_test_of_design_verdicts() {
        let results = vec![
            result_for(
                "recon_april.pdf",
                json!({"attributes_results": [
                    {"attribute_name": "Signature present", "result": true},
                    {"attribute_name": "Dated", "result": false, "reason": "undated"},
                ]}),
            ),
            result_for(
                "recon_may.pdf",
                json!({"attributes_results": [
                    {"attribute_name": "Signature present", "result": true},
                ]}),
            ),
        ];
        let sheet = build_test_of_design_sheet(&attributes(), &documents(), &results);

        // Row 2 is the column header, rows 3-4 the verdict rows
        assert_eq!(sheet.rows[2].cells[1], Cell::Text("Signature present".to_string()));
        assert_eq!(sheet.rows[3].cells[1], Cell::Text("Pass".to_string()));
        assert_eq!(sheet.rows[3].cells[2], Cell::Text("Fail".to_string()));
        assert_eq!(sheet.rows[4].cells[1], Cell::Text("Pass".to_string()));
        // Attribute missing from the payload degrades to N/A
        assert_eq!(sheet.rows[4].cells[2], Cell::Text("N/A".to_string()));
    }

    #[test]
    fn test_export_resilience_on_malformed_result() {
        // One record whose result is the literal string "not valid json{"
        let results = vec![
            result_for("recon_april.pdf", Value::String("not valid json{".to_string())),
        ];
        let docs = vec![documents().remove(0)];
        let sheet = build_test_of_design_sheet(&attributes(), &docs, &results);

        let verdict_row = &sheet.rows[3];
        assert_eq!(verdict_row.cells[0], Cell::Text("recon_april.pdf".to_string()));
        for cell in &verdict_row.cells[1..] {
            assert_eq!(*cell, Cell::Text("N/A".to_string()));
        }
    }

    #[test]
    fn test_missing_result_record_renders_na() {
        // Fewer results than documents: second document has no record at all
        let results = vec![result_for(
            "recon_april.pdf",
            json!({"attributes_results": []}),
        )];
        let sheet = build_test_of_design_sheet(&attributes(), &documents(), &results);
        assert_eq!(sheet.rows[4].cells[1], Cell::Text("N/A".to_string()));
        assert_eq!(sheet.rows[4].cells[2], Cell::Text("N/A".to_string()));
    }

    #[test]
    fn test_explanations_prefer_explanation_then_details() {
        let results = vec![result_for(
            "recon_april.pdf",
            json!({"attributes_results": [
                {"attribute_name": "Signature present", "result": true, "details": "sig on p2"},
            ]}),
        )];
        let docs = vec![documents().remove(0)];
        let sheet = build_test_of_design_sheet(&attributes(), &docs, &results);
        let explanations: Vec<&Row> = sheet
            .rows
            .iter()
            .skip_while(|r| r.title() != "Result Explanations")
            .skip(2)
            .take_while(|r| r.kind == RowKind::Data)
            .collect();
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[0].cells[2], Cell::Text("sig on p2".to_string()));
    }

    #[test]
    fn test_interim_layout_contract() {
        let sheet = build_interim_sheet(&rcm(), &execution(), &attributes());
        assert_eq!(sheet.name, "Interim");
        assert_eq!(sheet.rows[0].title(), "Interim Testing");
        assert_eq!(sheet.rows[6].kind, RowKind::SubHeader);
        assert_eq!(sheet.rows[6].title(), "Attributes Tested");
        assert_eq!(sheet.rows[8].cells[1], Cell::Text("Signature present".to_string()));
        assert_eq!(sheet.max_columns(), 3);
    }
}
