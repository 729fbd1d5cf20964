//! Final EPP assembly, encoding and filename.

use chrono::{DateTime, TimeZone};
use encoding_rs::EncoderResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

use super::records::RecordSection;
use super::template::{Placeholders, TemplateDocument, CONTENT_MARKER};
use crate::models::{DocumentType, ExportResult, ReconciledLine};

/// Timestamp format written into the document.
pub const DOCUMENT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
/// Timestamp format used in the suggested filename.
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Extension of generated files.
pub const EPP_EXTENSION: &str = "epp";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Everything needed to render one document besides the lines themselves.
#[derive(Debug, Clone)]
pub struct RenderContext<'a, Tz: TimeZone> {
    pub document_type: DocumentType,
    /// Free-text filename label.
    pub label: &'a str,
    /// Location literal for `<tu_miejscowosc>`, quotes included.
    pub location: &'a str,
    pub now: DateTime<Tz>,
}

/// Drop every blank line that directly follows another blank line.
pub fn collapse_blank_lines(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().is_some_and(|prev| prev.trim().is_empty()) {
            continue;
        }
        out.push(line.clone());
    }
    out
}

/// Join lines with CRLF, terminating the last one too.
pub fn join_crlf(lines: &[String]) -> String {
    let mut content = lines.join("\r\n");
    content.push_str("\r\n");
    content
}

/// Assemble the full document text from a template and reconciled lines.
pub fn render_document(
    template: &TemplateDocument,
    lines: &[ReconciledLine],
    document_type: DocumentType,
    location: &str,
    timestamp: &str,
) -> String {
    let parts = template.parts(&Placeholders {
        document_type,
        location,
        timestamp,
    });

    let [quantity, items, prices] = RecordSection::ALL.map(|section| section.format_block(lines));

    let mut assembled = parts.info;
    assembled.push(String::new());
    assembled.push(CONTENT_MARKER.to_string());
    assembled.extend(quantity);
    assembled.push(String::new());
    assembled.extend(parts.item_header);
    assembled.push(CONTENT_MARKER.to_string());
    assembled.extend(items);
    assembled.push(String::new());
    assembled.extend(parts.price_header);
    assembled.push(CONTENT_MARKER.to_string());
    assembled.extend(prices);

    join_crlf(&collapse_blank_lines(&assembled))
}

/// `ZK_my_label_20240102_030405.epp`; the label part is omitted when empty.
pub fn suggested_filename(document_type: DocumentType, label: &str, timestamp: impl Display) -> String {
    let safe_label = WHITESPACE.replace_all(label.trim(), "_");
    let label_part = if safe_label.is_empty() {
        String::new()
    } else {
        format!("{}_", safe_label)
    };
    format!(
        "{}_{}{}.{}",
        document_type.code(),
        label_part,
        timestamp,
        EPP_EXTENSION
    )
}

/// Byte written for characters Windows-1250 cannot represent.
pub const REPLACEMENT_BYTE: u8 = b'?';

/// Encode to Windows-1250. Unmappable characters become `?`; the flag
/// reports whether that happened.
pub fn encode_windows_1250(content: &str) -> (Vec<u8>, bool) {
    let mut encoder = encoding_rs::WINDOWS_1250.new_encoder();
    let mut out = Vec::with_capacity(content.len());
    let mut lossy = false;
    let mut remaining = content;

    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(remaining, &mut out, true);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => out.reserve(remaining.len().max(16)),
            EncoderResult::Unmappable(_) => {
                out.push(REPLACEMENT_BYTE);
                lossy = true;
            }
        }
    }

    (out, lossy)
}

/// Render the document and derive its filename and total weight.
pub fn export<Tz>(
    template: &TemplateDocument,
    lines: &[ReconciledLine],
    ctx: &RenderContext<'_, Tz>,
) -> ExportResult
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = ctx.now.format(DOCUMENT_TIMESTAMP_FORMAT).to_string();
    let content = render_document(template, lines, ctx.document_type, ctx.location, &stamp);

    ExportResult {
        content,
        suggested_filename: suggested_filename(
            ctx.document_type,
            ctx.label,
            ctx.now.format(FILENAME_TIMESTAMP_FORMAT),
        ),
        total_weight_kg: lines.iter().map(|l| l.total_weight_kg).sum(),
    }
}
