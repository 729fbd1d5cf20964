//! Domain models for the EPP export pipeline.
//!
//! - [`DocumentType`] - Kind of EPP document (customer order or stock transfer)
//! - [`CatalogEntry`] - Packaging and weight metadata for one product
//! - [`OrderLine`] - One cleaned line of an uploaded order
//! - [`ReconciledLine`] - Order line joined with catalog data and derived fields
//! - [`Adjustment`] - Notice that a quantity was rounded up to full packages
//! - [`PreviewRow`] - The seven computed columns shown to the user
//! - [`ExportResult`] - Rendered EPP text with its filename and total weight

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Document Type
// =============================================================================

/// EPP document type, selects the template and fills `<typ_dokumentu>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Zamówienie od Klienta (customer order).
    #[default]
    #[serde(rename = "ZK")]
    Zk,
    /// Przesunięcie Międzymagazynowe (inter-warehouse transfer).
    #[serde(rename = "MM")]
    Mm,
}

impl DocumentType {
    /// All supported document types.
    pub const ALL: [DocumentType; 2] = [DocumentType::Zk, DocumentType::Mm];

    /// Code written into the export and the filename.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Zk => "ZK",
            DocumentType::Mm => "MM",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            DocumentType::Zk => "Zamówienie od Klienta",
            DocumentType::Mm => "Przesunięcie Międzymagazynowe",
        }
    }

    /// Template file expected in the template directory.
    pub fn template_file_name(&self) -> String {
        format!("template_{}.epp", self.code())
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ZK" => Ok(DocumentType::Zk),
            "MM" => Ok(DocumentType::Mm),
            other => Err(format!("unknown document type '{}' (expected ZK or MM)", other)),
        }
    }
}

// =============================================================================
// Catalog and Order
// =============================================================================

/// Packaging and weight metadata for one product of the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub identifier: String,
    /// Units per package; 0 when unknown.
    pub packaging_count: u32,
    pub unit_weight_kg: f64,
}

/// One order line after cleaning. `quantity` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub identifier: String,
    pub quantity: f64,
}

/// Order line joined with catalog data.
///
/// Catalog fields are zero when the product is not in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledLine {
    pub identifier: String,
    /// Quantity as ordered.
    pub quantity: f64,
    /// Quantity after optional packaging rounding; this is what gets exported.
    pub adjusted_quantity: f64,
    pub packaging_count: u32,
    pub unit_weight_kg: f64,
    pub total_weight_kg: f64,
    pub vat_rate: f64,
    pub name: String,
    pub net_price: f64,
    /// Whether the identifier was found in the catalog.
    pub in_catalog: bool,
}

impl ReconciledLine {
    /// Net price plus VAT.
    pub fn gross_price(&self) -> f64 {
        self.net_price * (1.0 + self.vat_rate / 100.0)
    }
}

/// Informational notice: a quantity was rounded up to full packages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub identifier: String,
    pub delta: f64,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Poprawiono +{} szt. przy EAN {}",
            format_quantity(self.delta),
            self.identifier
        )
    }
}

/// Quantity for messages: at most four decimals, trailing zeros dropped.
pub fn format_quantity(value: f64) -> String {
    let fixed = format!("{:.4}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Preview and Export
// =============================================================================

/// The seven computed columns of one line, as shown in the preview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub identifier: String,
    pub name: String,
    pub quantity: f64,
    pub unit_weight_kg: f64,
    pub total_weight_kg: f64,
    pub net_price: f64,
    pub vat_rate: f64,
}

impl From<&ReconciledLine> for PreviewRow {
    fn from(line: &ReconciledLine) -> Self {
        PreviewRow {
            identifier: line.identifier.clone(),
            name: line.name.clone(),
            quantity: line.adjusted_quantity,
            unit_weight_kg: line.unit_weight_kg,
            total_weight_kg: line.total_weight_kg,
            net_price: line.net_price,
            vat_rate: line.vat_rate,
        }
    }
}

/// Rendered EPP document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    /// Text with CRLF line endings, terminated by CRLF.
    pub content: String,
    pub suggested_filename: String,
    pub total_weight_kg: f64,
}

/// User-selected options for one export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub document_type: DocumentType,
    /// Free-text label inserted into the filename.
    #[serde(default)]
    pub label: String,
    /// Round quantities up to full packages.
    #[serde(default)]
    pub round_to_packages: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_parse() {
        assert_eq!("zk".parse::<DocumentType>(), Ok(DocumentType::Zk));
        assert_eq!(" MM ".parse::<DocumentType>(), Ok(DocumentType::Mm));
        assert!("WZ".parse::<DocumentType>().is_err());
        assert_eq!(DocumentType::Mm.template_file_name(), "template_MM.epp");
    }

    #[test]
    fn test_document_type_serde() {
        let json = serde_json::to_string(&DocumentType::Zk).unwrap();
        assert_eq!(json, "\"ZK\"");
        let parsed: DocumentType = serde_json::from_str("\"MM\"").unwrap();
        assert_eq!(parsed, DocumentType::Mm);
    }

    #[test]
    fn test_adjustment_message() {
        let adj = Adjustment {
            identifier: "111".into(),
            delta: 3.0,
        };
        assert_eq!(adj.to_string(), "Poprawiono +3 szt. przy EAN 111");
    }

    #[test]
    fn test_adjustment_message_hides_float_noise() {
        let adj = Adjustment {
            identifier: "5901234123457".into(),
            delta: 15.0 - 12.1,
        };
        assert_ne!(adj.delta, 2.9);
        assert_eq!(adj.to_string(), "Poprawiono +2.9 szt. przy EAN 5901234123457");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(10.0), "10");
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(2.9000000000000004), "2.9");
        assert_eq!(format_quantity(0.12345), "0.1235");
        assert_eq!(format_quantity(0.0), "0");
    }

    #[test]
    fn test_gross_price() {
        let line = ReconciledLine {
            identifier: "A".into(),
            quantity: 1.0,
            adjusted_quantity: 1.0,
            packaging_count: 0,
            unit_weight_kg: 0.0,
            total_weight_kg: 0.0,
            vat_rate: 8.0,
            name: String::new(),
            net_price: 10.0,
            in_catalog: false,
        };
        assert!((line.gross_price() - 10.8).abs() < 1e-9);
    }
}
