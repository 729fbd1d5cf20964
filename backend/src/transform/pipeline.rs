//! High-level pipeline API: uploaded order to EPP document.
//!
//! Combines every step for one invocation: sheet parsing, header
//! detection, order cleaning, catalog reconciliation, rendering and
//! Windows-1250 encoding. Any failure aborts the run and nothing is
//! produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use eppgen::config::{AppConfig, ReferenceData};
//! use eppgen::models::ExportOptions;
//! use eppgen::transform::pipeline::run_file;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reference = ReferenceData::load(&AppConfig::from_env()?)?;
//!     let output = run_file(&reference, "order.xlsx".as_ref(), &ExportOptions::default(), reference.now())?;
//!     std::fs::write(&output.export.suggested_filename, &output.bytes)?;
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

use super::header::{detect_header, HeaderMatch};
use super::order::{normalize_order, SkippedRow};
use super::reconcile::reconcile;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::ReferenceData;
use crate::epp::{encode_windows_1250, export, RenderContext, TemplateDocument};
use crate::error::{PipelineResult, SheetError};
use crate::models::{Adjustment, ExportOptions, ExportResult, PreviewRow};
use crate::parser::{read_grid, RawGrid};

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// Rendered document, filename and total weight.
    pub export: ExportResult,
    /// Document encoded as Windows-1250, ready to be written.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub header: HeaderMatch,
    pub adjustments: Vec<Adjustment>,
    pub preview: Vec<PreviewRow>,
    /// Identifiers not present in the catalog.
    pub unmatched: Vec<String>,
    pub skipped: Vec<SkippedRow>,
    /// Some characters could not be represented in Windows-1250.
    pub lossy_encoding: bool,
}

/// Read an uploaded order and locate its header row.
pub fn detect(bytes: &[u8], file_name: Option<&str>) -> PipelineResult<(RawGrid, HeaderMatch)> {
    log_info("📖 Reading order sheet...");
    let grid = read_grid(bytes, file_name)?;
    log_success(format!("Read {} rows", grid.len()));

    log_info("🔎 Detecting header row...");
    let header = detect_header(&grid)?;
    log_success(format!("Header at row {}: {}", header.row + 1, header.describe()));

    Ok((grid, header))
}

/// Run the full pipeline on an order file on disk.
pub fn run_file<Tz>(
    reference: &ReferenceData,
    path: &Path,
    options: &ExportOptions,
    now: DateTime<Tz>,
) -> PipelineResult<PipelineOutput>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let bytes = std::fs::read(path).map_err(SheetError::from)?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    run(reference, &bytes, file_name, options, now)
}

/// Run the full pipeline on uploaded bytes.
///
/// `now` is the document instant in the business timezone.
pub fn run<Tz>(
    reference: &ReferenceData,
    bytes: &[u8],
    file_name: Option<&str>,
    options: &ExportOptions,
    now: DateTime<Tz>,
) -> PipelineResult<PipelineOutput>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    // Template problems are deployment errors; check before touching the upload.
    let template = TemplateDocument::parse(reference.templates.get(options.document_type)?.to_vec())?;

    let (grid, header) = detect(bytes, file_name)?;

    log_info("🧹 Cleaning order lines...");
    let order = normalize_order(&grid, &header)?;
    log_success(format!("{} order lines", order.lines.len()));
    if !order.skipped.is_empty() {
        log_warning(format!("{} rows skipped", order.skipped.len()));
        for skipped in order.skipped.iter().take(5) {
            log_info_indent(format!("row {}: {}", skipped.row, skipped.reason), 1);
        }
    }

    log_info("📦 Reconciling with catalog...");
    let reconciliation = reconcile(&order.lines, &reference.catalog, options.round_to_packages);
    for identifier in &reconciliation.unmatched {
        log_warning(format!("{} not in catalog, exported with zero weight", identifier));
    }
    for adjustment in &reconciliation.adjustments {
        log_info_indent(adjustment.to_string(), 1);
    }

    log_info(format!("📝 Rendering {} document...", options.document_type));
    let ctx = RenderContext {
        document_type: options.document_type,
        label: &options.label,
        location: &reference.location,
        now,
    };
    let result = export(&template, &reconciliation.lines, &ctx);

    let (encoded, lossy_encoding) = encode_windows_1250(&result.content);
    if lossy_encoding {
        log_warning("Some characters were replaced during Windows-1250 encoding");
    }
    log_success(format!(
        "{} ({:.2} kg)",
        result.suggested_filename, result.total_weight_kg
    ));

    Ok(PipelineOutput {
        preview: reconciliation.lines.iter().map(PreviewRow::from).collect(),
        export: result,
        bytes: encoded,
        header,
        adjustments: reconciliation.adjustments,
        unmatched: reconciliation.unmatched,
        skipped: order.skipped,
        lossy_encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::epp::TemplateSet;
    use crate::error::{OrderError, PipelineError};
    use crate::models::{CatalogEntry, DocumentType};
    use chrono_tz::Europe::Warsaw;

    const TEMPLATE: &[&str] = &[
        "[INFO]",
        "\"1.05\",3,1250",
        "",
        "[NAGLOWEK]",
        "\"<typ_dokumentu>\",<tu_miejscowosc>,<tu_data>",
        "",
        "[ZAWARTOSC]",
        "",
        "[NAGLOWEK]",
        "\"TOWARY\"",
        "[ZAWARTOSC]",
        "",
        "[NAGLOWEK]",
        "\"CENNIK\"",
        "[ZAWARTOSC]",
    ];

    fn reference() -> ReferenceData {
        let mut templates = TemplateSet::default();
        for doc_type in DocumentType::ALL {
            templates.insert(doc_type, TEMPLATE.iter().map(|s| s.to_string()).collect());
        }
        ReferenceData {
            catalog: Catalog::from_entries(vec![CatalogEntry {
                identifier: "111".into(),
                packaging_count: 5,
                unit_weight_kg: 2.0,
            }]),
            templates,
            location: "\"Wrocław\"".into(),
            timezone: Warsaw,
        }
    }

    fn order_xlsx(rows: &[(&str, f64)]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Zamówienie nr 17").unwrap();
        sheet.write_string(2, 0, "Lp.").unwrap();
        sheet.write_string(2, 1, "Kod EAN").unwrap();
        sheet.write_string(2, 2, "Ilość sztuk zamówiona").unwrap();
        for (i, (id, qty)) in rows.iter().enumerate() {
            let row = 3 + i as u32;
            sheet.write_number(row, 0, (i + 1) as f64).unwrap();
            sheet.write_number(row, 1, id.parse::<f64>().unwrap()).unwrap();
            sheet.write_number(row, 2, *qty).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    fn options(round: bool) -> ExportOptions {
        ExportOptions {
            document_type: DocumentType::Zk,
            label: "sklep 5".into(),
            round_to_packages: round,
        }
    }

    #[test]
    fn test_end_to_end_rounding() {
        let now = Warsaw.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let bytes = order_xlsx(&[("111", 12.0)]);

        let output = run(&reference(), &bytes, Some("order.xlsx"), &options(true), now).unwrap();

        assert_eq!(output.header.row, 2);
        assert_eq!(output.preview.len(), 1);
        assert_eq!(output.preview[0].identifier, "111");
        assert_eq!(output.preview[0].quantity, 15.0);
        assert_eq!(output.preview[0].vat_rate, 8.0);
        assert_eq!(output.export.total_weight_kg, 30.0);
        assert_eq!(output.adjustments.len(), 1);
        assert_eq!(output.adjustments[0].to_string(), "Poprawiono +3 szt. przy EAN 111");
        assert!(output.unmatched.is_empty());

        assert_eq!(output.export.suggested_filename, "ZK_sklep_5_20240301_143000.epp");
        assert!(output.export.content.contains("\"ZK\",\"Wrocław\",20240301143000\r\n"));
        assert!(output.export.content.contains("1,1,\"111\",0,0,0,0,0.0000,0.0000,\"szt.\",15.0000,15.0000,"));
        assert!(!output.lossy_encoding);
        assert!(output.bytes.windows(7).any(|w| w == b"Wroc\xB3aw"));
    }

    #[test]
    fn test_unmatched_and_no_rounding() {
        let now = Warsaw.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let bytes = order_xlsx(&[("111", 12.0), ("222", 4.0)]);

        let output = run(&reference(), &bytes, Some("order.xlsx"), &options(false), now).unwrap();

        assert!(output.adjustments.is_empty());
        assert_eq!(output.preview[0].quantity, 12.0);
        assert_eq!(output.unmatched, vec!["222".to_string()]);
        assert_eq!(output.preview[1].total_weight_kg, 0.0);
        assert_eq!(output.export.total_weight_kg, 24.0);
    }

    #[test]
    fn test_missing_header_produces_nothing() {
        let now = Warsaw.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let csv = "Produkt;Sztuki\n111;3\n";

        let err = run(&reference(), csv.as_bytes(), Some("order.csv"), &options(true), now).unwrap_err();
        assert!(matches!(err, PipelineError::Order(OrderError::HeaderNotFound { .. })));
        assert_eq!(err.kind(), "header_not_found");
    }

    #[test]
    fn test_missing_template_is_configuration_error() {
        let now = Warsaw.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let mut reference = reference();
        reference.templates = TemplateSet::default();

        let err = run(&reference, b"symbol;ilosc\n111;1\n", None, &options(false), now).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(!err.is_client_error());
    }
}
