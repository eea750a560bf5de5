//! Byte utilities: concatenation, equality, and the text conversion used
//! for header lines.

use bytes::{Bytes, BytesMut};

/// Concatenates a run of chunks into a single owned buffer. Returns a
/// cheap clone when there's only one chunk to begin with.
pub fn merge(chunks: &[Bytes]) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks[0].clone(),
        _ => {
            let total: usize = chunks.iter().map(Bytes::len).sum();
            let mut out = BytesMut::with_capacity(total);
            for c in chunks {
                out.extend_from_slice(c);
            }
            out.freeze()
        }
    }
}

/// Byte-for-byte equality, spelled out for parity with the rest of this
/// module rather than making callers reach for `==` on slices directly.
pub fn equals(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Converts arbitrary bytes to a `String` by mapping each byte directly to
/// the Unicode scalar value of the same number (Latin-1 transcription).
/// Unlike UTF-8 decoding this never fails and never substitutes a
/// replacement character, so header text that isn't valid UTF-8 still
/// round-trips exactly through [`string_to_bytes`].
pub fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`bytes_to_string`]. Only lossless for strings built from
/// `bytes_to_string` (or containing only characters in `U+0000..=U+00FF`);
/// characters outside that range are truncated to their low byte.
pub fn string_to_bytes(s: &str) -> Bytes {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        out.push(ch as u32 as u8);
    }
    Bytes::from(out)
}
