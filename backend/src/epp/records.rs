//! Record formatters for the three EPP content sections.
//!
//! All three sections emit one comma-separated line per reconciled line;
//! they differ only in field layout. Numbers use exactly four decimals.

use crate::models::ReconciledLine;

/// Unit of measure written into every item.
pub const UNIT_OF_MEASURE: &str = "szt.";
/// Price list every item is listed in.
pub const PRICE_LIST_NAME: &str = "Detaliczna";

/// Fields per item-master line.
pub const ITEM_MASTER_FIELDS: usize = 42;

const ITEM_MASTER_DECIMAL_ZERO: [usize; 5] = [14, 15, 23, 29, 30];
const ITEM_MASTER_INTEGER_ZERO: [usize; 7] = [17, 20, 24, 27, 32, 34, 35];

/// Content section of an EPP document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSection {
    /// Document positions: sequence, identifier, quantities, VAT.
    Quantity,
    /// Item master data (`TOWARY`), 42 positional fields.
    ItemMaster,
    /// Price list (`CENNIK`): net and gross prices.
    PriceList,
}

impl RecordSection {
    /// Sections in output order.
    pub const ALL: [RecordSection; 3] = [
        RecordSection::Quantity,
        RecordSection::ItemMaster,
        RecordSection::PriceList,
    ];

    /// Format one line; `seq` is 1-based.
    pub fn format_line(&self, seq: usize, line: &ReconciledLine) -> String {
        let fields = match self {
            RecordSection::Quantity => quantity_fields(seq, line),
            RecordSection::ItemMaster => item_master_fields(seq, line),
            RecordSection::PriceList => price_list_fields(line),
        };
        fields.join(",")
    }

    /// Format a whole block, numbering lines from 1 in input order.
    pub fn format_block(&self, lines: &[ReconciledLine]) -> Vec<String> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| self.format_line(i + 1, line))
            .collect()
    }
}

/// Four-decimal number.
pub fn decimal(value: f64) -> String {
    format!("{:.4}", value)
}

/// Double-quoted text field.
pub fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}

fn quantity_fields(seq: usize, line: &ReconciledLine) -> Vec<String> {
    let zero = || "0".to_string();
    let decimal_zero = || decimal(0.0);

    let mut fields = vec![seq.to_string(), "1".to_string(), quoted(&line.identifier)];
    fields.extend(std::iter::repeat_with(zero).take(4));
    fields.extend(std::iter::repeat_with(decimal_zero).take(2));
    fields.push(quoted(UNIT_OF_MEASURE));
    fields.push(decimal(line.adjusted_quantity));
    fields.push(decimal(line.adjusted_quantity));
    fields.extend(std::iter::repeat_with(decimal_zero).take(3));
    fields.push(decimal(line.vat_rate));
    fields.extend(std::iter::repeat_with(decimal_zero).take(4));
    fields.push(String::new());
    fields.push(String::new());
    fields
}

fn item_master_fields(seq: usize, line: &ReconciledLine) -> Vec<String> {
    let mut fields = vec![String::new(); ITEM_MASTER_FIELDS];

    let vat_label = quoted(&(line.vat_rate as i64).to_string());
    let vat_value = decimal(line.vat_rate);

    fields[0] = seq.to_string();
    fields[1] = quoted(&line.identifier);
    fields[4] = quoted(&line.name);
    fields[6] = quoted(&line.name);
    fields[9] = quoted(UNIT_OF_MEASURE);
    fields[10] = vat_label.clone();
    fields[11] = vat_value.clone();
    fields[12] = vat_label;
    fields[13] = vat_value;
    for pos in ITEM_MASTER_DECIMAL_ZERO {
        fields[pos] = decimal(0.0);
    }
    for pos in ITEM_MASTER_INTEGER_ZERO {
        fields[pos] = "0".to_string();
    }
    fields[28] = quoted(UNIT_OF_MEASURE);
    fields
}

fn price_list_fields(line: &ReconciledLine) -> Vec<String> {
    vec![
        quoted(&line.identifier),
        quoted(PRICE_LIST_NAME),
        decimal(0.0),
        decimal(0.0),
        decimal(line.net_price),
        decimal(line.gross_price()),
        decimal(0.0),
    ]
}
