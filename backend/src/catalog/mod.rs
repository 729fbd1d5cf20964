//! Reference catalog - packaging and weight metadata per product.
//!
//! Loaded once from the reference spreadsheet (first sheet, first row is the
//! header) and looked up by normalized identifier.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};
use crate::models::CatalogEntry;
use crate::parser::{normalize_identifier, read_excel_file, Cell, RawGrid};

/// Default reference file name (relative to current dir).
pub const DEFAULT_CATALOG_FILE: &str = "excel_informacyjny.xlsx";

/// Accepted header names for the product identifier, in priority order.
pub const IDENTIFIER_COLUMNS: &[&str] = &["Kod EAN", "Symbol"];
/// Accepted header names for the unit weight in kg, in priority order.
pub const WEIGHT_COLUMNS: &[&str] = &["Waga, kg", "Waga"];
/// Accepted header names for the units-per-package count.
pub const PACKAGING_COLUMNS: &[&str] = &["Ilość w opakowaniu"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse whitespace and newlines in a header cell.
fn clean_header(cell: &Cell) -> String {
    WHITESPACE
        .replace_all(&cell.to_string(), " ")
        .trim()
        .to_string()
}

/// Product lookup keyed by normalized identifier.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from entries; later entries replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.identifier.clone(), e))
            .collect();
        Self { entries }
    }

    /// Load the reference spreadsheet from disk.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::MissingFile(display));
        }
        let grid = read_excel_file(path).map_err(|source| ConfigError::Unreadable {
            path: display.clone(),
            source,
        })?;
        Self::from_grid(&grid, &display)
    }

    /// Parse a grid whose first row holds the column names.
    ///
    /// `source` only appears in error messages.
    pub fn from_grid(grid: &RawGrid, source: &str) -> ConfigResult<Self> {
        let headers: Vec<String> = grid
            .rows
            .first()
            .map(|row| row.iter().map(clean_header).collect())
            .unwrap_or_default();

        let find = |accepted: &[&str]| -> ConfigResult<usize> {
            accepted
                .iter()
                .find_map(|name| headers.iter().position(|h| h == name))
                .ok_or_else(|| ConfigError::MissingColumn {
                    file: source.to_string(),
                    accepted: accepted.iter().map(|s| s.to_string()).collect(),
                })
        };

        let id_col = find(IDENTIFIER_COLUMNS)?;
        let weight_col = find(WEIGHT_COLUMNS)?;
        let pack_col = find(PACKAGING_COLUMNS)?;

        let mut entries = HashMap::new();
        for row_idx in 1..grid.len() {
            let identifier = normalize_identifier(&grid.cell(row_idx, id_col).to_string());
            if identifier.is_empty() {
                continue;
            }

            let packaging_count = grid
                .cell(row_idx, pack_col)
                .as_number()
                .map(|n| n.trunc().max(0.0) as u32)
                .unwrap_or(0);
            let unit_weight_kg = grid.cell(row_idx, weight_col).as_number().unwrap_or(0.0);

            entries.insert(
                identifier.clone(),
                CatalogEntry {
                    identifier,
                    packaging_count,
                    unit_weight_kg,
                },
            );
        }

        Ok(Self { entries })
    }

    /// Look up a product by normalized identifier.
    pub fn get(&self, identifier: &str) -> Option<&CatalogEntry> {
        self.entries.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by identifier.
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut list: Vec<_> = self.entries.values().collect();
        list.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_grid_primary_headers() {
        let grid = RawGrid::new(vec![
            vec![
                Cell::Text("Kod\nEAN".into()),
                Cell::Text("Nazwa".into()),
                Cell::Text("Waga,  kg".into()),
                Cell::Text(" Ilość w\nopakowaniu ".into()),
            ],
            vec![
                Cell::Number(111.0),
                Cell::Text("Olej".into()),
                Cell::Number(2.0),
                Cell::Number(5.0),
            ],
            vec![
                Cell::Text("222.0".into()),
                Cell::Empty,
                Cell::Text("brak".into()),
                Cell::Text("x".into()),
            ],
        ]);

        let catalog = Catalog::from_grid(&grid, "test.xlsx").unwrap();
        assert_eq!(catalog.len(), 2);

        let first = catalog.get("111").unwrap();
        assert_eq!(first.packaging_count, 5);
        assert_eq!(first.unit_weight_kg, 2.0);

        let second = catalog.get("222").unwrap();
        assert_eq!(second.packaging_count, 0);
        assert_eq!(second.unit_weight_kg, 0.0);
    }

    #[test]
    fn test_from_grid_alternative_headers() {
        let grid = RawGrid::from_strings(vec![
            vec!["Symbol", "Waga", "Ilość w opakowaniu"],
            vec!["A1", "0,5", "12.7"],
        ]);
        let catalog = Catalog::from_grid(&grid, "test.xlsx").unwrap();
        let entry = catalog.get("A1").unwrap();
        assert_eq!(entry.packaging_count, 12);
        assert_eq!(entry.unit_weight_kg, 0.5);
    }

    #[test]
    fn test_duplicate_identifier_last_wins() {
        let grid = RawGrid::from_strings(vec![
            vec!["Symbol", "Waga", "Ilość w opakowaniu"],
            vec!["A1", "1", "2"],
            vec!["A1", "3", "4"],
        ]);
        let catalog = Catalog::from_grid(&grid, "test.xlsx").unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("A1").unwrap().packaging_count, 4);
    }

    #[test]
    fn test_missing_column() {
        let grid = RawGrid::from_strings(vec![vec!["Symbol", "Ilość w opakowaniu"]]);
        let err = Catalog::from_grid(&grid, "ref.xlsx").unwrap_err();
        assert!(matches!(err, ConfigError::MissingColumn { .. }));
        assert!(err.to_string().contains("'Waga, kg' or 'Waga'"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Catalog::load(dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_load_xlsx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CATALOG_FILE);

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Kod EAN").unwrap();
        sheet.write_string(0, 1, "Waga, kg").unwrap();
        sheet.write_string(0, 2, "Ilość w opakowaniu").unwrap();
        sheet.write_number(1, 0, 9120004635976.0).unwrap();
        sheet.write_number(1, 1, 0.25).unwrap();
        sheet.write_number(1, 2, 6.0).unwrap();
        workbook.save(&path).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        let entry = catalog.get("9120004635976").unwrap();
        assert_eq!(entry.packaging_count, 6);
        assert_eq!(entry.unit_weight_kg, 0.25);
    }
}
