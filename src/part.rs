//! Part descriptor — the value yielded once a part's header block has
//! been fully read.

use bytes::Bytes;
use std::collections::BTreeMap;

use crate::header_parse::TransferEncoding;
use crate::multipart::PartBody;
use crate::Error;

/// Either the body has already been collected into one buffer (collected
/// mode), or it's a lazy, single-consumer, non-restartable chunk sequence
/// driven by the same underlying byte source as the enclosing part
/// iterator (streaming mode).
pub enum PartData {
    Eager(Bytes),
    Lazy(PartBody),
}

/// One named section of a multipart payload: its parsed metadata plus its
/// body, in whichever mode the caller asked for.
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub content_transfer_encoding: Option<TransferEncoding>,
    /// Exact header lines as received, minus the terminating CRLF, in
    /// wire order. Authoritative for re-emission when present.
    pub header_lines: Option<Vec<String>>,
    /// Any header beyond the fixed fields above, lowercased name -> raw
    /// value. A `BTreeMap` so regenerating header lines (see
    /// [`crate::serializer::build_header_lines`]) is deterministic.
    pub extra_headers: BTreeMap<String, String>,
    pub data: PartData,
}

impl Part {
    /// Reads the body to completion and returns it as one buffer,
    /// consuming whichever mode the part was in.
    pub async fn collect_body(self) -> Result<Bytes, Error> {
        match self.data {
            PartData::Eager(b) => Ok(b),
            PartData::Lazy(mut body) => {
                let mut chunks = Vec::new();
                while let Some(chunk) = body.next_chunk().await? {
                    chunks.push(chunk);
                }
                Ok(crate::bytes_util::merge(&chunks))
            }
        }
    }

    /// Drains and discards the body without collecting it. Used when a
    /// part is filtered out but its bytes still need to be consumed so
    /// the underlying driver can advance to the next part.
    pub async fn drain_body(self) -> Result<(), Error> {
        match self.data {
            PartData::Eager(_) => Ok(()),
            PartData::Lazy(mut body) => {
                while body.next_chunk().await?.is_some() {}
                Ok(())
            }
        }
    }
}
