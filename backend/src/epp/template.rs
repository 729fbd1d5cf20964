//! EPP template parsing and placeholder substitution.
//!
//! A template is a Windows-1250 text file with three `[NAGLOWEK]` /
//! `[ZAWARTOSC]` pairs. The first pair frames the file preamble, the second
//! and third frame the item-master and price-list section headers.

use std::collections::HashMap;
use std::path::Path;

use crate::api::logs::log_warning;
use crate::error::{ConfigError, ConfigResult, TemplateError};
use crate::models::DocumentType;

/// Section header marker.
pub const HEADER_MARKER: &str = "[NAGLOWEK]";
/// Section content marker.
pub const CONTENT_MARKER: &str = "[ZAWARTOSC]";

/// Replaced with the document type code (preamble only).
pub const DOCUMENT_TYPE_PLACEHOLDER: &str = "<typ_dokumentu>";
/// Replaced with the location literal (preamble only).
pub const LOCATION_PLACEHOLDER: &str = "<tu_miejscowosc>";
/// Replaced with the compact timestamp (all parts).
pub const DATE_PLACEHOLDER: &str = "<tu_data>";

/// Decode template bytes (Windows-1250, lossy) into lines.
pub fn decode_template(bytes: &[u8]) -> Vec<String> {
    let (text, _, _) = encoding_rs::WINDOWS_1250.decode(bytes);
    text.lines().map(str::to_string).collect()
}

/// Values substituted into the template.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    pub document_type: DocumentType,
    pub location: &'a str,
    /// `YYYYMMDDHHMMSS`
    pub timestamp: &'a str,
}

/// The three fixed parts of a template, placeholders already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParts {
    /// Lines before the first content marker.
    pub info: Vec<String>,
    /// Second header marker up to the second content marker.
    pub item_header: Vec<String>,
    /// Third header marker up to the third content marker.
    pub price_header: Vec<String>,
}

/// A template whose marker sequence has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    lines: Vec<String>,
    /// Positions of header(1), content(1), header(2), content(2), header(3), content(3).
    markers: [usize; 6],
}

impl TemplateDocument {
    /// Locate the six markers in order; each is searched after its predecessor.
    pub fn parse(lines: Vec<String>) -> Result<Self, TemplateError> {
        let tags: Vec<String> = lines.iter().map(|l| l.trim().to_uppercase()).collect();

        let mut markers = [0usize; 6];
        let mut from = 0;
        for (slot, position) in markers.iter_mut().enumerate() {
            let marker = if slot % 2 == 0 { HEADER_MARKER } else { CONTENT_MARKER };
            let found = tags[from.min(tags.len())..]
                .iter()
                .position(|t| t == marker)
                .map(|offset| from + offset)
                .ok_or(TemplateError::MissingMarker {
                    marker,
                    occurrence: slot / 2 + 1,
                })?;
            *position = found;
            from = found + 1;
        }

        Ok(Self { lines, markers })
    }

    /// Extract the fixed parts and fill in the placeholders.
    pub fn parts(&self, values: &Placeholders<'_>) -> TemplateParts {
        let [_, content1, header2, content2, header3, content3] = self.markers;

        let info = self.lines[..content1]
            .iter()
            .map(|line| {
                line.replace(DOCUMENT_TYPE_PLACEHOLDER, values.document_type.code())
                    .replace(LOCATION_PLACEHOLDER, values.location)
                    .replace(DATE_PLACEHOLDER, values.timestamp)
            })
            .collect();

        let with_date = |range: &[String]| -> Vec<String> {
            range
                .iter()
                .map(|line| line.replace(DATE_PLACEHOLDER, values.timestamp))
                .collect()
        };

        TemplateParts {
            info,
            item_header: with_date(&self.lines[header2..content2]),
            price_header: with_date(&self.lines[header3..content3]),
        }
    }
}

/// Raw template lines per document type, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<DocumentType, Vec<String>>,
}

impl TemplateSet {
    /// Load `template_<CODE>.epp` for every document type found in `dir`.
    ///
    /// Missing files are only logged; asking for them later is an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let dir = dir.as_ref();
        let mut set = Self::default();
        for doc_type in DocumentType::ALL {
            let path = dir.join(doc_type.template_file_name());
            if !path.exists() {
                log_warning(format!("Template not found: {}", path.display()));
                continue;
            }
            let bytes = std::fs::read(&path)?;
            set.insert(doc_type, decode_template(&bytes));
        }
        Ok(set)
    }

    pub fn insert(&mut self, doc_type: DocumentType, lines: Vec<String>) {
        self.templates.insert(doc_type, lines);
    }

    /// Raw lines of the template for a document type.
    pub fn get(&self, doc_type: DocumentType) -> ConfigResult<&[String]> {
        self.templates
            .get(&doc_type)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigError::MissingTemplate(doc_type.template_file_name()))
    }

    pub fn contains(&self, doc_type: DocumentType) -> bool {
        self.templates.contains_key(&doc_type)
    }
}
