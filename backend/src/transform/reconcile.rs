//! Reconciliation of order lines against the reference catalog.
//!
//! Each line is joined with its catalog entry (if any), optionally rounded up
//! to full packages, and given its weight and VAT rate. Output order follows
//! input order.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{Adjustment, OrderLine, ReconciledLine};

/// VAT rate for everything not in [`REDUCED_VAT_IDENTIFIERS`].
pub const DEFAULT_VAT_RATE: f64 = 8.0;
/// VAT rate for the reduced-rate products.
pub const REDUCED_VAT_RATE: f64 = 5.0;
/// Products taxed at [`REDUCED_VAT_RATE`].
pub const REDUCED_VAT_IDENTIFIERS: [&str; 2] = ["9120004635976", "9120004635990"];

/// VAT rate for an identifier; trailing dots are ignored.
pub fn vat_rate_for(identifier: &str) -> f64 {
    let key = identifier.trim_end_matches('.');
    if REDUCED_VAT_IDENTIFIERS.contains(&key) {
        REDUCED_VAT_RATE
    } else {
        DEFAULT_VAT_RATE
    }
}

/// Round `quantity` up to the next multiple of `packaging_count`.
///
/// Returns the new quantity and the added amount, or `None` when nothing
/// changed (package size 0 or 1, or already a full multiple).
pub fn round_up_to_package(quantity: f64, packaging_count: u32) -> Option<(f64, f64)> {
    if packaging_count <= 1 {
        return None;
    }
    let pack = f64::from(packaging_count);
    let remainder = quantity % pack;
    if remainder == 0.0 {
        return None;
    }
    let delta = pack - remainder;
    Some((quantity + delta, delta))
}

/// All reconciled lines plus the notices produced along the way.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub lines: Vec<ReconciledLine>,
    pub adjustments: Vec<Adjustment>,
    /// Identifiers not found in the catalog, in order of appearance.
    pub unmatched: Vec<String>,
    pub total_weight_kg: f64,
}

/// Join order lines with the catalog and compute derived fields.
pub fn reconcile(order: &[OrderLine], catalog: &Catalog, round_to_packages: bool) -> Reconciliation {
    let mut result = Reconciliation::default();

    for line in order {
        let entry = catalog.get(&line.identifier);
        let packaging_count = entry.map(|e| e.packaging_count).unwrap_or(0);
        let unit_weight_kg = entry.map(|e| e.unit_weight_kg).unwrap_or(0.0);
        if entry.is_none() {
            result.unmatched.push(line.identifier.clone());
        }

        let rounded = if round_to_packages {
            round_up_to_package(line.quantity, packaging_count)
        } else {
            None
        };
        let adjusted_quantity = match rounded {
            Some((adjusted, delta)) => {
                result.adjustments.push(Adjustment {
                    identifier: line.identifier.clone(),
                    delta,
                });
                adjusted
            }
            None => line.quantity,
        };

        let total_weight_kg = unit_weight_kg * adjusted_quantity;
        result.total_weight_kg += total_weight_kg;

        result.lines.push(ReconciledLine {
            identifier: line.identifier.clone(),
            quantity: line.quantity,
            adjusted_quantity,
            packaging_count,
            unit_weight_kg,
            total_weight_kg,
            vat_rate: vat_rate_for(&line.identifier),
            name: String::new(),
            net_price: 0.0,
            in_catalog: entry.is_some(),
        });
    }

    result
}
