//! Header-line parsing: splitting a raw header line on `:`, and
//! parsing `Content-Disposition`'s `;`-separated, optionally-quoted
//! parameter list.

use crate::Error;

/// `Content-Transfer-Encoding` values the descriptor recognizes. Anything
/// else is left as `None` on the descriptor but the header line survives
/// verbatim in `header_lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Binary,
    EightBit,
    QuotedPrintable,
    Base64,
    SevenBit,
}

impl TransferEncoding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binary" => Some(TransferEncoding::Binary),
            "8bit" => Some(TransferEncoding::EightBit),
            "quoted-printable" => Some(TransferEncoding::QuotedPrintable),
            "base64" => Some(TransferEncoding::Base64),
            "7bit" => Some(TransferEncoding::SevenBit),
            _ => None,
        }
    }
}

/// Splits a raw header line into `(name, value)`, both trimmed. Errors if
/// there's no `:`.
pub fn split_header_line(line: &str) -> Result<(&str, &str), Error> {
    let idx = line
        .find(':')
        .ok_or_else(|| Error::malformed_header(format!("header line has no ':': {:?}", line)))?;
    Ok((line[..idx].trim(), line[idx + 1..].trim()))
}

/// Splits a header value on `;`, honoring double-quoted segments in which
/// `\` escapes the following character (only `\` and `"` are meaningful
/// escapes; any other escaped byte reproduces verbatim). Each returned
/// token is trimmed; quote delimiters are preserved in the token so a
/// later parameter parse can tell a quoted value from a bare one.
pub fn split_params(value: &str) -> Result<Vec<String>, Error> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => cur.push(escaped),
                    None => cur.push('\\'),
                },
                '"' => {
                    in_quotes = false;
                    cur.push('"');
                }
                other => cur.push(other),
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    cur.push('"');
                }
                ';' => {
                    tokens.push(cur.trim().to_string());
                    cur.clear();
                }
                other => cur.push(other),
            }
        }
    }

    if in_quotes {
        return Err(Error::malformed_header(format!(
            "unterminated quoted parameter in: {:?}",
            value
        )));
    }

    tokens.push(cur.trim().to_string());
    Ok(tokens)
}

/// Parses one `key=value` parameter token (as produced by
/// [`split_params`]) into a lowercased key and an unescaped value.
pub fn parse_param(token: &str) -> Result<(String, String), Error> {
    let eq = token
        .find('=')
        .ok_or_else(|| Error::malformed_header(format!("parameter missing '=': {:?}", token)))?;
    let key = token[..eq].trim().to_ascii_lowercase();
    let mut val = token[eq + 1..].trim();
    if let Some(stripped) = val.strip_prefix('"') {
        if !stripped.ends_with('"') {
            return Err(Error::malformed_header(format!(
                "mismatched quotes in parameter: {:?}",
                token
            )));
        }
        val = &stripped[..stripped.len() - 1];
    }
    Ok((key, val.to_string()))
}

/// Parses a `Content-Disposition` value into `(name, filename)`. The
/// first token must be exactly `form-data` (case-sensitive, trimmed);
/// `name` is required and must be non-empty.
pub fn parse_content_disposition(value: &str) -> Result<(String, Option<String>), Error> {
    let mut tokens = split_params(value)?.into_iter();

    let disposition = tokens
        .next()
        .ok_or_else(|| Error::malformed_header("empty Content-Disposition value"))?;
    if disposition.trim() != "form-data" {
        return Err(Error::malformed_header(format!(
            "unsupported Content-Disposition type: {:?}",
            disposition
        )));
    }

    let mut name = None;
    let mut filename = None;
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let (key, val) = parse_param(&token)?;
        match key.as_str() {
            "name" => name = Some(val),
            "filename" => filename = Some(val),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| Error::malformed_header("Content-Disposition missing name"))?;
    if name.is_empty() {
        return Err(Error::malformed_header(
            "Content-Disposition name parameter is empty",
        ));
    }

    Ok((name, filename))
}
