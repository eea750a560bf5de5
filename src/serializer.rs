//! Regenerating header lines for a [`Part`] when it's re-emitted.
//!
//! If `header_lines` is `Some`, it is authoritative and
//! [`build_header_lines`] returns it verbatim — this is what keeps an
//! untouched, re-emitted part byte-faithful to the original wire headers.
//! A part that came back from a transform callback has its fixed fields
//! (`name`, `filename`, `content_type`, ...) win instead: the re-emit
//! pipeline clears `header_lines` on any transform output before handing
//! it here, so this module regenerates lines from the fixed fields and
//! `extra_headers`.

use crate::part::Part;

/// Returns the header lines (without trailing CRLF) that should precede
/// a part's body on re-emission.
pub fn build_header_lines(part: &Part) -> Vec<String> {
    if let Some(lines) = &part.header_lines {
        return lines.clone();
    }

    let mut lines = Vec::new();

    let mut disposition = format!("form-data; name=\"{}\"", escape_quoted(&part.name));
    if let Some(filename) = &part.filename {
        disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
    }
    lines.push(format!("Content-Disposition: {}", disposition));

    if let Some(content_type) = &part.content_type {
        lines.push(format!("Content-Type: {}", content_type));
    }

    if let Some(cte) = part.content_transfer_encoding {
        lines.push(format!(
            "Content-Transfer-Encoding: {}",
            transfer_encoding_str(cte)
        ));
    }

    for (name, value) in &part.extra_headers {
        lines.push(format!("{}: {}", canonical_header_name(name), value));
    }

    if let Some(content_length) = &part.content_length {
        lines.push(format!("Content-Length: {}", content_length));
    }

    lines
}

fn transfer_encoding_str(cte: crate::header_parse::TransferEncoding) -> &'static str {
    use crate::header_parse::TransferEncoding::*;
    match cte {
        Binary => "binary",
        EightBit => "8bit",
        QuotedPrintable => "quoted-printable",
        Base64 => "base64",
        SevenBit => "7bit",
    }
}

/// Escapes `\` and `"` for embedding in a quoted header parameter value.
pub fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Title-cases a lowercased, hyphen-separated header name for display,
/// e.g. `x-custom-id` -> `X-Custom-Id`. Cosmetic only — header names are
/// matched case-insensitively everywhere else in this crate.
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
