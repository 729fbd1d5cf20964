//! Order table extraction below a detected header row.

use serde::Serialize;

use super::header::{HeaderMatch, OrderField};
use crate::error::{OrderError, OrderResult};
use crate::models::OrderLine;
use crate::parser::{normalize_identifier, RawGrid};

/// A data row that was dropped during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based sheet row number.
    pub row: usize,
    pub reason: String,
}

/// Cleaned order lines plus the rows that were dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedOrder {
    pub lines: Vec<OrderLine>,
    pub skipped: Vec<SkippedRow>,
}

/// Slice the grid below the header and keep rows with a positive quantity.
///
/// Blank rows are ignored silently; rows whose quantity is not numeric or not
/// positive are reported in [`NormalizedOrder::skipped`].
pub fn normalize_order(grid: &RawGrid, header: &HeaderMatch) -> OrderResult<NormalizedOrder> {
    let (id_col, qty_col) = match (
        header.column(OrderField::Identifier),
        header.column(OrderField::Quantity),
    ) {
        (Some(id), Some(qty)) => (id.index, qty.index),
        _ => return Err(OrderError::EmptyOrder),
    };

    let mut order = NormalizedOrder::default();

    for row_idx in (header.row + 1)..grid.len() {
        let id_cell = grid.cell(row_idx, id_col);
        let qty_cell = grid.cell(row_idx, qty_col);
        if id_cell.is_blank() && qty_cell.is_blank() {
            continue;
        }

        let quantity = match qty_cell.as_number() {
            Some(q) if q > 0.0 => q,
            Some(q) => {
                order.skipped.push(SkippedRow {
                    row: row_idx + 1,
                    reason: format!("quantity {} is not positive", q),
                });
                continue;
            }
            None => {
                order.skipped.push(SkippedRow {
                    row: row_idx + 1,
                    reason: format!("quantity '{}' is not a number", qty_cell),
                });
                continue;
            }
        };

        order.lines.push(OrderLine {
            identifier: normalize_identifier(&id_cell.to_string()),
            quantity,
        });
    }

    if order.lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    Ok(order)
}
