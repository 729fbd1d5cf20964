//! Spreadsheet reader producing a raw cell grid.
//!
//! Excel workbooks are read from their first sheet; CSV uploads go through
//! encoding and delimiter auto-detection. No header row is assumed here.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::error::{SheetError, SheetResult};

// =============================================================================
// Cells and Grid
// =============================================================================

/// A single raw cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Whether the cell holds nothing (or only whitespace).
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion: numbers pass through, text is parsed (decimal comma
    /// accepted), everything else fails.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => parse_number(s)?,
            Cell::Empty | Cell::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::Error(_) => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

/// `1,000` / `12,500,000`: a comma here may be a thousands separator, so the
/// value is ambiguous and coercion fails.
static COMMA_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+$").expect("valid regex"));

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if COMMA_GROUPED.is_match(&compact) {
        return None;
    }
    compact
        .parse::<f64>()
        .ok()
        .or_else(|| compact.replace(',', ".").parse::<f64>().ok())
}

/// Rows of raw cells, top to bottom. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid of text cells; empty strings become [`Cell::Empty`].
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| text_cell(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, column); missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

fn text_cell(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

// =============================================================================
// Identifier Normalization
// =============================================================================

static TRAILING_ZEROS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.0+$").expect("valid regex"));

/// Normalize a product identifier: text form, trailing `.0` runs removed
/// (numeric-as-text import artifact), whitespace trimmed.
///
/// Applied until nothing changes, so `normalize(normalize(x)) == normalize(x)`.
pub fn normalize_identifier(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = TRAILING_ZEROS.replace(&current, "").trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Excel,
    Csv,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Pick the format from the file extension, falling back to magic bytes.
pub fn detect_format(bytes: &[u8], file_name: Option<&str>) -> SheetFormat {
    let ext = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => SheetFormat::Excel,
        Some("csv" | "txt") => SheetFormat::Csv,
        _ if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) => SheetFormat::Excel,
        _ => SheetFormat::Csv,
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Read uploaded bytes into a raw grid, choosing the reader by format.
pub fn read_grid(bytes: &[u8], file_name: Option<&str>) -> SheetResult<RawGrid> {
    if bytes.is_empty() {
        return Err(SheetError::EmptyFile);
    }
    match detect_format(bytes, file_name) {
        SheetFormat::Excel => read_excel_bytes(bytes),
        SheetFormat::Csv => read_csv_bytes(bytes),
    }
}

/// Read the first sheet of an in-memory workbook.
pub fn read_excel_bytes(bytes: &[u8]) -> SheetResult<RawGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Workbook(e.to_string()))?;
    first_sheet(&mut workbook)
}

/// Read the first sheet of a workbook on disk.
pub fn read_excel_file<P: AsRef<Path>>(path: P) -> SheetResult<RawGrid> {
    let mut workbook =
        open_workbook_auto(path.as_ref()).map_err(|e| SheetError::Workbook(e.to_string()))?;
    first_sheet(&mut workbook)
}

fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> SheetResult<RawGrid> {
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoSheets)?
        .map_err(|e| SheetError::Workbook(e.to_string()))?;
    Ok(range_to_grid(&range))
}

/// Convert a calamine range, padding so that indices match sheet rows/columns.
fn range_to_grid(range: &Range<Data>) -> RawGrid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(data_row.iter().map(Cell::from));
        rows.push(row);
    }
    RawGrid::new(rows)
}

// =============================================================================
// CSV
// =============================================================================

/// Code page assumed for non-UTF-8 single-byte uploads.
pub const LEGACY_ENCODING: &str = "windows-1250";

/// Below this chardet confidence a non-Latin guess is ignored.
const MIN_FOREIGN_CONFIDENCE: f32 = 0.9;

/// Detect the encoding of raw bytes using chardet.
///
/// Valid UTF-8 is taken as-is. chardet cannot tell the Latin code pages
/// apart on short Polish text (it reports cp1250 as latin-1), so every
/// single-byte Latin guess resolves to [`LEGACY_ENCODING`].
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let (charset, confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" | "iso-8859-2"
        | "latin2" | "windows-1250" | "cp1250" | "windows-1252" | "cp1252" => {
            LEGACY_ENCODING.to_string()
        }
        "utf-8" | "utf8" => LEGACY_ENCODING.to_string(),
        _ if confidence < MIN_FOREIGN_CONFIDENCE => LEGACY_ENCODING.to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the given encoding label. Never fails;
/// undecodable bytes become U+FFFD.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" | "" => encoding_rs::UTF_8.decode(bytes).0.into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn read_csv_bytes(bytes: &[u8]) -> SheetResult<RawGrid> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_csv_str(&content, delimiter)
}

/// Parse CSV text with an explicit delimiter. Every record becomes a row.
pub fn parse_csv_str(content: &str, delimiter: char) -> SheetResult<RawGrid> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| SheetError::Csv(format!("unsupported delimiter '{}'", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SheetError::Csv(format!("line {}: {}", idx + 1, e)))?;
        rows.push(record.iter().map(|v| text_cell(v.trim())).collect());
    }

    if rows.is_empty() {
        return Err(SheetError::EmptyFile);
    }
    Ok(RawGrid::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("5901234123457.0"), "5901234123457");
        assert_eq!(normalize_identifier("  111.00 "), "111");
        assert_eq!(normalize_identifier("100"), "100");
        assert_eq!(normalize_identifier("10.5"), "10.5");
        assert_eq!(normalize_identifier("ABC-1"), "ABC-1");
    }

    #[test]
    fn test_normalize_identifier_idempotent() {
        for raw in ["1.0.0", "5.0 ", " 7.000 .0", "abc", "", "12.30", "0.0"] {
            let once = normalize_identifier(raw);
            assert_eq!(normalize_identifier(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_cell_as_number() {
        assert_eq!(Cell::Number(12.0).as_number(), Some(12.0));
        assert_eq!(Cell::Text(" 12 ".into()).as_number(), Some(12.0));
        assert_eq!(Cell::Text("2,5".into()).as_number(), Some(2.5));
        assert_eq!(Cell::Text("abc".into()).as_number(), None);
        assert_eq!(Cell::Text("nan".into()).as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
        assert_eq!(Cell::Bool(true).as_number(), None);
    }

    #[test]
    fn test_comma_grouped_numbers_fail_coercion() {
        assert_eq!(Cell::Text("1,000".into()).as_number(), None);
        assert_eq!(Cell::Text("12,500,000".into()).as_number(), None);
        assert_eq!(Cell::Text("-1,000".into()).as_number(), None);
        assert_eq!(Cell::Text("1 000".into()).as_number(), Some(1000.0));
        assert_eq!(Cell::Text("1,5".into()).as_number(), Some(1.5));
        assert_eq!(Cell::Text("1000,25".into()).as_number(), Some(1000.25));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(9120004635976.0).to_string(), "9120004635976");
        assert_eq!(Cell::Number(0.5).to_string(), "0.5");
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::Text("Kod EAN".into()).to_string(), "Kod EAN");
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"a;b", Some("order.xlsx")), SheetFormat::Excel);
        assert_eq!(detect_format(b"a;b", Some("ORDER.CSV")), SheetFormat::Csv);
        assert_eq!(detect_format(b"PK\x03\x04rest", None), SheetFormat::Excel);
        assert_eq!(detect_format(b"a;b\n1;2", None), SheetFormat::Csv);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_parse_csv_keeps_all_rows() {
        let csv = "Zamówienie nr 5;;\n;;\nKod EAN;Nazwa;Ilość\n111;Olej;12\n";
        let grid = parse_csv_str(csv, ';').unwrap();

        assert_eq!(grid.len(), 4);
        assert_eq!(grid.cell(0, 0), &Cell::Text("Zamówienie nr 5".into()));
        assert!(grid.cell(1, 0).is_blank());
        assert_eq!(grid.cell(2, 2), &Cell::Text("Ilość".into()));
        assert_eq!(grid.cell(3, 2).as_number(), Some(12.0));
        assert_eq!(grid.cell(3, 9), &Cell::Empty);
    }

    #[test]
    fn test_read_csv_bytes_windows_1250() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1250.encode("Symbol;Ilość\n111;3\n");
        let grid = read_csv_bytes(&bytes).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.cell(0, 1), &Cell::Text("Ilość".into()));
        assert_eq!(grid.cell(1, 0), &Cell::Text("111".into()));
    }

    #[test]
    fn test_windows_1250_csv_headers_are_detected() {
        use crate::transform::header::{detect_header, OrderField};

        let orders = [
            "Symbol;Ilość\n111;3\n",
            "Kod EAN;Nazwa;Ilość\n5901234123457;Olej rzepakowy;12\n",
            "Lp;Kod produktu;Ilość sztuk zamówiona\n1;ABC-1;4\n",
        ];
        for text in orders {
            let (bytes, _, _) = encoding_rs::WINDOWS_1250.encode(text);
            assert!(std::str::from_utf8(&bytes).is_err());
            assert_eq!(detect_encoding(&bytes), LEGACY_ENCODING);

            let grid = read_grid(&bytes, Some("order.csv")).unwrap();
            let header = detect_header(&grid).unwrap();
            assert_eq!(header.row, 0, "input {:?}", text);
            assert!(header.column(OrderField::Quantity).unwrap().label.starts_with("Ilość"));
        }
    }

    #[test]
    fn test_detect_encoding_utf8() {
        assert_eq!(detect_encoding("Symbol;Ilość\n".as_bytes()), "utf-8");
        assert_eq!(detect_encoding(b"Symbol;Qty\n"), "utf-8");
    }

    #[test]
    fn test_read_grid_empty() {
        assert!(matches!(read_grid(b"", None), Err(SheetError::EmptyFile)));
    }

    #[test]
    fn test_read_excel_bytes() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 1, "Kod EAN").unwrap();
        sheet.write_string(2, 2, "Ilość").unwrap();
        sheet.write_number(3, 1, 5901234123457.0).unwrap();
        sheet.write_number(3, 2, 4.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let grid = read_grid(&bytes, Some("order.xlsx")).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.cell(2, 1), &Cell::Text("Kod EAN".into()));
        assert_eq!(grid.cell(3, 1).to_string(), "5901234123457");
        assert_eq!(grid.cell(3, 2).as_number(), Some(4.0));
    }
}
