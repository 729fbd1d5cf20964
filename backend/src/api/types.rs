//! REST API types for frontend integration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{DocumentType, PreviewRow};
use crate::transform::order::SkippedRow;
use crate::transform::pipeline::PipelineOutput;

/// Response sent to the frontend after an order upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    pub document_type: DocumentType,
    pub suggested_filename: String,
    pub total_weight_kg: f64,

    /// The seven computed columns, one row per order line
    pub rows: Vec<PreviewRow>,

    /// Rounding notices, e.g. "Poprawiono +3 szt. przy EAN 111"
    pub adjustments: Vec<String>,

    pub metadata: PreviewMetadata,
}

/// How the upload was interpreted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMetadata {
    /// 1-based row of the detected header
    pub header_row: usize,
    /// `symbol→Kod EAN, ilość→Ilość` style mapping
    pub header_mapping: String,
    pub unmatched: Vec<String>,
    pub skipped_rows: Vec<SkippedRowInfo>,
    pub lossy_encoding: bool,
}

/// A dropped order row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRowInfo {
    pub row: usize,
    pub reason: String,
}

impl From<SkippedRow> for SkippedRowInfo {
    fn from(skipped: SkippedRow) -> Self {
        Self {
            row: skipped.row,
            reason: skipped.reason,
        }
    }
}

impl PreviewResponse {
    pub fn new(document_type: DocumentType, output: PipelineOutput) -> Self {
        let clean = output.unmatched.is_empty() && output.skipped.is_empty() && !output.lossy_encoding;

        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if clean { "ready" } else { "warning" }.to_string(),
            document_type,
            suggested_filename: output.export.suggested_filename,
            total_weight_kg: output.export.total_weight_kg,
            rows: output.preview,
            adjustments: output.adjustments.iter().map(ToString::to_string).collect(),
            metadata: PreviewMetadata {
                header_row: output.header.row + 1,
                header_mapping: output.header.describe(),
                unmatched: output.unmatched,
                skipped_rows: output.skipped.into_iter().map(SkippedRowInfo::from).collect(),
                lossy_encoding: output.lossy_encoding,
            },
        }
    }
}

/// Parse a boolean form field (`true`/`false`, `tak`/`nie`, `1`/`0`).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "tak" | "1" | "yes" | "on" => Some(true),
        "false" | "nie" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Create an error response
pub fn error_response(kind: &str, error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "kind": kind,
        "error": error,
        "rows": [],
    })
}
