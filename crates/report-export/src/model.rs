//! Input records for report assembly
//!
//! These mirror the shapes the caller already fetched from the audit API:
//! one RCM record, one test execution, ordered attribute and evidence lists,
//! and one AI evaluation result per evidence document. The AI result payload
//! is untrusted: it may arrive as a JSON object, as a JSON-encoded string,
//! or not at all, and a malformed payload must never abort the export.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One row of the risk-control matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcmRecord {
    pub control_id: String,
    pub control_name: String,
    #[serde(default)]
    pub control_description: String,
    #[serde(default)]
    pub control_owner: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub risk_description: String,
}

/// One periodic test of a control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecution {
    pub year: i32,
    pub quarter: String,
    #[serde(default)]
    pub tester: String,
    #[serde(default)]
    pub test_date: String,
    #[serde(default)]
    pub conclusion: String,
}

/// An attribute the evidence is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttribute {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// An uploaded evidence document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceDocument {
    pub name: String,
    #[serde(default)]
    pub reference: String,
}

/// The AI evaluation payload for one evidence document. `result` may be a
/// JSON object or a JSON-encoded string; both carry an `attributes_results`
/// array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDocumentResult {
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub result: Option<Value>,
}

/// One attribute's verdict inside an AI result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeResult {
    pub attribute_name: String,
    pub result: bool,
    /// Some payloads call this `reason`.
    #[serde(default, alias = "reason")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttributeResultsEnvelope {
    attributes_results: Vec<AttributeResult>,
}

/// Extract the per-attribute verdicts from an AI result payload. Absent or
/// malformed payloads yield `None` (the report renders "N/A"); they never
/// propagate an error out of the export path.
pub fn parse_attribute_results(result: Option<&Value>) -> Option<Vec<AttributeResult>> {
    let value = result?;
    let envelope: Result<AttributeResultsEnvelope, _> = match value {
        Value::String(encoded) => serde_json::from_str(encoded),
        other => serde_json::from_value(other.clone()),
    };
    match envelope {
        Ok(envelope) => Some(envelope.attributes_results),
        Err(e) => {
            warn!(error = %e, "unparseable AI result payload; treating as absent");
            None
        }
    }
}
