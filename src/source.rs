//! Byte-source adapter.
//!
//! [`ByteSource`] unifies whatever platform-specific byte stream an
//! environment adapter hands us into a single pull-based trait: call
//! `next_chunk()`, get the next owned chunk, `None` signals EOF. No
//! `Send` bound — the whole parser is single-threaded cooperative (see
//! the module docs on [`crate::multipart`]), so there's no reason to pay
//! for a bound nothing here needs.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

use crate::Error;

#[async_trait(?Send)]
pub trait ByteSource {
    /// Pulls the next owned chunk. `Ok(None)` is EOF. Zero-length chunks
    /// from a well-behaved producer shouldn't happen, but every consumer
    /// downstream tolerates them anyway.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error>;
}

/// An in-memory [`ByteSource`] that hands out a pre-sliced sequence of
/// chunks. Used by the test matrix to exercise chunking invariance.
pub struct SliceSource {
    chunks: VecDeque<Bytes>,
}

impl SliceSource {
    /// The whole payload as a single chunk.
    pub fn whole(payload: &[u8]) -> Self {
        Self::chunked(payload, payload.len().max(1))
    }

    /// The payload split into fixed-size chunks (the last one short if it
    /// doesn't divide evenly).
    pub fn chunked(payload: &[u8], chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks = payload
            .chunks(chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        SliceSource { chunks }
    }

    /// One byte per chunk — the worst case for straddling matches.
    pub fn bytewise(payload: &[u8]) -> Self {
        Self::chunked(payload, 1)
    }
}

#[async_trait(?Send)]
impl ByteSource for SliceSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        Ok(self.chunks.pop_front())
    }
}
