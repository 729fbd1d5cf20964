//! EPP flat-file rendering.
//!
//! - `template`: marker-delimited template parsing and placeholder substitution
//! - `records`: the three record formatters (quantity, item master, price list)
//! - `export`: final assembly, blank-line collapsing, encoding, filename
//!
//! ## Document Layout
//!
//! ```text
//! [INFO] ... [NAGLOWEK] (preamble)      ← template part 1
//! [ZAWARTOSC]  quantity lines            ← generated
//! [NAGLOWEK] "TOWARY" ...                ← template part 2
//! [ZAWARTOSC]  item-master lines         ← generated
//! [NAGLOWEK] "CENNIK" ...                ← template part 3
//! [ZAWARTOSC]  price-list lines          ← generated
//! ```

pub mod export;
pub mod records;
pub mod template;

pub use export::{
    collapse_blank_lines, encode_windows_1250, export, render_document, suggested_filename,
    RenderContext,
};
pub use records::RecordSection;
pub use template::{TemplateDocument, TemplateParts, TemplateSet};
