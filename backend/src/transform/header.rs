//! Header row detection for arbitrarily shaped order sheets.
//!
//! Orders arrive with titles, addresses and blank rows above the actual
//! table. The header row is the first row that contains a label for every
//! required field, compared after [`clean_label`] normalization.
//!
//! ```text
//! row 0 │ Zamówienie nr 17/2024 │          │       │
//! row 1 │                       │          │       │
//! row 2 │ Lp.                   │ Kod EAN  │ Ilość │  ← header (symbol, ilość)
//! row 3 │ 1                     │ 590...   │ 12    │
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{OrderError, OrderResult};
use crate::parser::RawGrid;

/// Logical columns an order must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    Identifier,
    Quantity,
}

impl OrderField {
    /// Fields that must all be present in the header row.
    pub const REQUIRED: [OrderField; 2] = [OrderField::Identifier, OrderField::Quantity];

    /// Short name used in messages.
    pub fn key(&self) -> &'static str {
        match self {
            OrderField::Identifier => "symbol",
            OrderField::Quantity => "ilość",
        }
    }

    /// Accepted column labels, highest priority first.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            OrderField::Identifier => &["kod ean", "symbol", "ean", "kod produktu"],
            OrderField::Quantity => &["ilość", "ilosc", "qty", "ilość sztuk zamówiona"],
        }
    }
}

static NON_LABEL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\sąćęłńóśźż]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleaned synonyms per field, in [`OrderField::REQUIRED`] order.
static SYNONYM_TABLE: Lazy<Vec<(OrderField, Vec<String>)>> = Lazy::new(|| {
    OrderField::REQUIRED
        .iter()
        .map(|field| {
            let cleaned = field.synonyms().iter().map(|s| clean_label(s)).collect();
            (*field, cleaned)
        })
        .collect()
});

/// Normalize a label for comparison: lowercase, punctuation removed
/// (diacritics kept), whitespace runs collapsed.
pub fn clean_label(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = NON_LABEL_CHARS.replace_all(lowered.trim(), "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// A matched source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedColumn {
    /// Original cell text, trimmed.
    pub label: String,
    /// Zero-based column index.
    pub index: usize,
}

/// Result of header detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatch {
    /// Zero-based row index of the header row.
    pub row: usize,
    pub columns: BTreeMap<OrderField, MatchedColumn>,
}

impl HeaderMatch {
    pub fn column(&self, field: OrderField) -> Option<&MatchedColumn> {
        self.columns.get(&field)
    }

    /// `symbol→Kod EAN, ilość→Ilość` style summary.
    pub fn describe(&self) -> String {
        self.columns
            .iter()
            .map(|(field, col)| format!("{}→{}", field.key(), col.label))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Find the first row labelling every required field.
pub fn detect_header(grid: &RawGrid) -> OrderResult<HeaderMatch> {
    for (row_idx, row) in grid.rows.iter().enumerate() {
        let originals: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        let cleaned: Vec<String> = originals.iter().map(|c| clean_label(c)).collect();

        let mut columns = BTreeMap::new();
        for (field, synonyms) in SYNONYM_TABLE.iter() {
            let hit = synonyms
                .iter()
                .find_map(|syn| cleaned.iter().position(|c| c == syn));
            if let Some(index) = hit {
                columns.insert(
                    *field,
                    MatchedColumn {
                        label: originals[index].trim().to_string(),
                        index,
                    },
                );
            }
        }

        if columns.len() == SYNONYM_TABLE.len() {
            return Ok(HeaderMatch {
                row: row_idx,
                columns,
            });
        }
    }

    Err(OrderError::HeaderNotFound {
        fields: OrderField::REQUIRED
            .iter()
            .map(|f| f.key().to_string())
            .collect(),
        rows_scanned: grid.len(),
    })
}
