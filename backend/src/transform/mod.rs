//! Transformation module.
//!
//! This module turns a raw order grid into reconciled EPP lines:
//! - Header: fuzzy detection of the header row and its columns
//! - Order: cleaning of the rows below the header
//! - Reconcile: catalog join, package rounding, VAT, weights
//! - Pipeline: the whole upload-to-document run

pub mod header;
pub mod order;
pub mod pipeline;
pub mod reconcile;

pub use header::{clean_label, detect_header, HeaderMatch, MatchedColumn, OrderField};
pub use order::{normalize_order, NormalizedOrder, SkippedRow};
pub use pipeline::{detect, run, run_file, PipelineOutput};
pub use reconcile::{reconcile, round_up_to_package, vat_rate_for, Reconciliation};
