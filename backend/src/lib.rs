//! # eppgen - Spreadsheet orders to EPP flat files
//!
//! eppgen turns customer order spreadsheets of arbitrary layout into EPP
//! documents (ZK customer orders, MM warehouse transfers) ready for import
//! into the ERP system.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Order sheet │────▶│   Parser    │────▶│  Transform  │────▶│  EPP file   │
//! │ (xlsx/csv)  │     │ (raw grid)  │     │ (header +   │     │ (cp1250,    │
//! └─────────────┘     └─────────────┘     │  catalog)   │     │  CRLF)      │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eppgen::{AppConfig, ExportOptions, ReferenceData, run_file};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reference = ReferenceData::load(&AppConfig::from_env()?)?;
//!     let output = run_file(&reference, "order.xlsx".as_ref(), &ExportOptions::default(), reference.now())?;
//!     println!("{} ({:.2} kg)", output.export.suggested_filename, output.export.total_weight_kg);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (DocumentType, CatalogEntry, ReconciledLine)
//! - [`parser`] - Spreadsheet and CSV reading into a raw grid
//! - [`catalog`] - Reference catalog loading
//! - [`config`] - Environment configuration and reference data
//! - [`transform`] - Header detection, order cleaning, reconciliation, pipeline
//! - [`epp`] - Template handling and EPP rendering
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Input
pub mod catalog;
pub mod config;
pub mod parser;

// Processing
pub mod epp;
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, OrderError, PipelineError, PipelineResult, ServerError, SheetError,
    TemplateError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Adjustment, CatalogEntry, DocumentType, ExportOptions, ExportResult, OrderLine, PreviewRow,
    ReconciledLine,
};

// =============================================================================
// Re-exports - Parsing and reference data
// =============================================================================

pub use catalog::Catalog;
pub use config::{AppConfig, ReferenceData};
pub use parser::{normalize_identifier, read_grid, Cell, RawGrid};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{detect, run, run_file, PipelineOutput};
pub use transform::{detect_header, normalize_order, reconcile, HeaderMatch};

// =============================================================================
// Re-exports - Rendering
// =============================================================================

pub use epp::{export, render_document, TemplateDocument, TemplateSet};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
