//! Error types for the EPP export pipeline.
//!
//! Every failure is fatal to the current invocation; nothing is written when
//! one of these is returned.
//!
//! - [`SheetError`] - Upload cannot be read as a spreadsheet
//! - [`ConfigError`] - Reference catalog or template files missing/malformed
//! - [`OrderError`] - No header row found, or no usable order lines
//! - [`TemplateError`] - Template lacks the required marker sequence
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Sheet Parsing Errors
// =============================================================================

/// Errors while turning uploaded bytes into a raw grid.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The workbook container could not be opened.
    #[error("Cannot open workbook: {0}")]
    Workbook(String),

    /// Workbook without any worksheet.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(String),

    /// Empty upload.
    #[error("File is empty")]
    EmptyFile,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Reference data problems: the catalog, the templates, or the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reference file does not exist.
    #[error("Reference file not found: {0}")]
    MissingFile(String),

    /// Reference file could not be parsed.
    #[error("Cannot read reference file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: SheetError,
    },

    /// A required catalog column is absent under every accepted name.
    #[error("'{file}' must have a column named {}", quote_alternatives(.accepted))]
    MissingColumn { file: String, accepted: Vec<String> },

    /// No template file for the requested document type.
    #[error("Template not found: {0}")]
    MissingTemplate(String),

    /// Invalid environment/CLI setting.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// IO error.
    #[error("Configuration IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn quote_alternatives(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(" or ")
}

// =============================================================================
// Order Errors
// =============================================================================

/// Errors in the uploaded order itself.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No row carries every required column label.
    #[error("No header row with columns {} found in {rows_scanned} rows", .fields.join(", "))]
    HeaderNotFound {
        fields: Vec<String>,
        rows_scanned: usize,
    },

    /// Header found, but nothing with a positive quantity below it.
    #[error("No order lines with quantity > 0")]
    EmptyOrder,
}

// =============================================================================
// Template Errors
// =============================================================================

/// Malformed EPP template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A marker is missing after its required predecessor.
    #[error("Template is missing marker {marker} #{occurrence}")]
    MissingMarker {
        marker: &'static str,
        occurrence: usize,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reference data error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Upload parsing error.
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Order content error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Template error.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

impl PipelineError {
    /// Short machine-readable category, used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "configuration",
            PipelineError::Sheet(_) => "sheet",
            PipelineError::Order(OrderError::HeaderNotFound { .. }) => "header_not_found",
            PipelineError::Order(OrderError::EmptyOrder) => "empty_order",
            PipelineError::Template(_) => "template_format",
        }
    }

    /// Whether the caller's upload (rather than the deployment) is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Sheet(_) | PipelineError::Order(_))
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for sheet parsing.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for reference data loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for order processing.
pub type OrderResult<T> = Result<T, OrderError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
