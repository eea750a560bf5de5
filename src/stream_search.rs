//! Streaming Boyer-Moore-Horspool scanner.
//!
//! [`StreamSearch`] splits an arbitrarily chunked byte stream on a literal
//! needle without ever buffering more than `needle.len() - 1` bytes across
//! calls. Each `feed()` call is synchronous, allocation-light, and
//! emits tokens in stream order; no match that straddles two `feed()`
//! calls is ever missed.
//!
//! The occurrence table and the per-call scan are classic BMH. What's
//! specific to streaming is the lookbehind: instead of the zero-copy
//! negative-indexing cursor a single-threaded implementation without a
//! GC might reach for, this version concatenates the retained lookbehind
//! with the new chunk once per `feed()` call and runs a single BMH pass
//! over that. Same token sequence, same `O(needle.len())` lookbehind
//! bound, same amortized linear-time complexity — just a buffer copy
//! instead of a two-phase cursor. See DESIGN.md for the tradeoff.

use bytes::{Bytes, BytesMut};

/// A token emitted by [`StreamSearch::feed`] or materialized from
/// [`StreamSearch::end`]'s residual.
///
/// `Data` is never emitted empty — a zero-length non-match run carries no
/// information and is simply omitted, so a caller asking "what ran between
/// these two matches" sees no `Data` token when the answer is "nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A non-empty run of bytes that does not contain the needle.
    Data(Bytes),
    /// The needle occurred at this position. Its bytes are consumed and
    /// not reported.
    Match,
}

impl Token {
    pub fn is_match(&self) -> bool {
        matches!(self, Token::Match)
    }

    pub fn as_data(&self) -> Option<&Bytes> {
        match self {
            Token::Data(b) => Some(b),
            Token::Match => None,
        }
    }
}

/// Streaming needle scanner. One instance owns one needle and the
/// lookbehind required to detect matches that straddle `feed()` calls.
pub struct StreamSearch {
    needle: Bytes,
    table: [usize; 256],
    lookbehind: BytesMut,
}

impl StreamSearch {
    /// Builds the 256-entry bad-character occurrence table and allocates
    /// an empty lookbehind. Panics if `needle` is empty — a zero-length
    /// needle matches everywhere and isn't a meaningful scan target.
    pub fn new(needle: impl Into<Bytes>) -> Self {
        let needle = needle.into();
        assert!(!needle.is_empty(), "StreamSearch needle must not be empty");

        let mut table = [needle.len(); 256];
        for (i, &b) in needle.iter().enumerate().take(needle.len() - 1) {
            table[b as usize] = needle.len() - 1 - i;
        }

        StreamSearch {
            needle,
            table,
            lookbehind: BytesMut::new(),
        }
    }

    pub fn needle_len(&self) -> usize {
        self.needle.len()
    }

    /// Feeds one more chunk of the stream. Deterministic, no I/O, no
    /// suspension. Every byte appears in exactly one of: a returned
    /// `Data` token, a consumed `Match`, or the lookbehind retained for
    /// the next call.
    pub fn feed(&mut self, chunk: Bytes) -> Vec<Token> {
        let m = self.needle.len();

        let data: Bytes = if self.lookbehind.is_empty() {
            chunk
        } else {
            let mut buf = BytesMut::with_capacity(self.lookbehind.len() + chunk.len());
            buf.extend_from_slice(&self.lookbehind);
            buf.extend_from_slice(&chunk);
            buf.freeze()
        };
        self.lookbehind.clear();

        let n = data.len();
        if n < m {
            self.lookbehind.extend_from_slice(&data);
            return Vec::new();
        }

        let mut tokens = Vec::new();
        let mut pos = 0usize; // start of the not-yet-emitted run
        let mut i = 0usize; // BMH candidate window start

        while i + m <= n {
            if data[i + m - 1] == self.needle[m - 1] && data[i..i + m] == self.needle[..] {
                if i > pos {
                    tokens.push(Token::Data(data.slice(pos..i)));
                }
                tokens.push(Token::Match);
                i += m;
                pos = i;
            } else {
                let bad = data[i + m - 1];
                i += self.table[bad as usize];
            }
        }

        // Tail: look for the earliest start >= pos whose remaining bytes
        // are a potential prefix of the needle; that suffix becomes the
        // new lookbehind. Only positions within `m - 1` of the end can
        // possibly qualify (a full window would already have been
        // examined by the loop above).
        let tail_floor = pos.max(n.saturating_sub(m - 1));
        let mut lb_start = n;
        for start in tail_floor..n {
            let tail_len = n - start;
            if data[start..] == self.needle[..tail_len] {
                lb_start = start;
                break;
            }
        }

        if lb_start > pos {
            tokens.push(Token::Data(data.slice(pos..lb_start)));
        }
        self.lookbehind.extend_from_slice(&data[lb_start..]);

        tokens
    }

    /// Flushes and returns whatever's left in the lookbehind — bytes that
    /// were never confirmed as a match and never confirmed as safe to
    /// emit because the stream ended first.
    pub fn end(&mut self) -> Bytes {
        if self.lookbehind.is_empty() {
            Bytes::new()
        } else {
            std::mem::take(&mut self.lookbehind).freeze()
        }
    }
}
