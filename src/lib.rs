//! Streaming `multipart/form-data` parser and re-emitter (RFC 7578 /
//! RFC 2046 §5.1.1).
//!
//! Two layers: a streaming Boyer-Moore-Horspool scanner ([`stream_search`])
//! that splits a chunked byte stream on a literal needle, and a state
//! machine ([`multipart`]) layered on it that tracks prologue, header, and
//! body transitions and yields [`Part`] values with lazy bodies. A re-emit
//! pipeline ([`reemit`]) filters, transforms, and reserializes parts as
//! another pull-based [`ByteSource`].
//!
//! HTTP request/response framing, transfer-encoding decoding, charset
//! negotiation, and size/rate limiting are deliberately out of scope —
//! callers wire an HTTP body (or any other byte producer) into
//! [`ByteSource`] themselves.

mod bytes_util;
mod error;
mod header_parse;
mod multipart;
mod part;
mod reemit;
mod serializer;
mod source;
mod stream_search;

pub use error::Error;
pub use header_parse::TransferEncoding;
pub use multipart::{PartBody, PartIterator};
pub use part::{Part, PartData};
pub use reemit::{FilterFn, FilterOutcome, ReemitOptions, ReemitSource, TransformFn, TransformOutcome};
pub use source::{ByteSource, SliceSource};
pub use stream_search::{StreamSearch, Token};

use log::debug;

/// Begins streaming over `source`'s parts, delimited by `boundary` (the
/// raw token, without the leading `--`). Each [`Part`]'s body stays lazy
/// until the caller reads it, or is drained automatically the next time
/// [`PartIterator::next_part`] is called.
pub fn stream_multipart(source: Box<dyn ByteSource>, boundary: &str) -> PartIterator {
    debug!("starting multipart stream with boundary {:?}", boundary);
    PartIterator::new(source, boundary)
}

/// Reads one part's metadata eagerly and collects its body into a single
/// buffer, replacing the part's lazy `data` with an eager one.
async fn collect_eagerly(part: Part) -> Result<Part, Error> {
    let name = part.name.clone();
    let filename = part.filename.clone();
    let content_type = part.content_type.clone();
    let content_length = part.content_length.clone();
    let content_transfer_encoding = part.content_transfer_encoding;
    let header_lines = part.header_lines.clone();
    let extra_headers = part.extra_headers.clone();
    let body = part.collect_body().await?;
    Ok(Part {
        name,
        filename,
        content_type,
        content_length,
        content_transfer_encoding,
        header_lines,
        extra_headers,
        data: PartData::Eager(body),
    })
}

/// A [`PartIterator`] wrapper that yields one part at a time, each with
/// its body already collected, rather than a lazy [`PartBody`] handle.
/// Unlike [`parse_multipart`], this does not wait for the whole payload
/// to arrive before handing back the first part.
pub struct MultipartIterator {
    inner: PartIterator,
}

impl MultipartIterator {
    /// Pulls the next part, collecting its body eagerly. `Ok(None)` once
    /// the closing delimiter has been seen.
    pub async fn next(&mut self) -> Result<Option<Part>, Error> {
        match self.inner.next_part().await? {
            Some(part) => Ok(Some(collect_eagerly(part).await?)),
            None => Ok(None),
        }
    }
}

/// Begins streaming over `source`'s parts, delimited by `boundary`, each
/// yielded with its body already collected into one buffer. This is the
/// middle ground between [`stream_multipart`] (lazy bodies, one part at a
/// time) and [`parse_multipart`] (eager bodies, whole payload at once).
pub fn iterate_multipart(source: Box<dyn ByteSource>, boundary: &str) -> MultipartIterator {
    MultipartIterator {
        inner: stream_multipart(source, boundary),
    }
}

/// Reads every part to completion eagerly and returns them in order. Not
/// suitable for payloads whose parts you want to start acting on before
/// the whole request has arrived; see [`stream_multipart`] or
/// [`iterate_multipart`] for that.
pub async fn parse_multipart(
    source: Box<dyn ByteSource>,
    boundary: &str,
) -> Result<Vec<Part>, Error> {
    let mut iter = iterate_multipart(source, boundary);
    let mut out = Vec::new();
    while let Some(part) = iter.next().await? {
        out.push(part);
    }
    Ok(out)
}

/// Options for [`get_readable_formdata_stream`].
pub struct FormDataStreamOptions<'a> {
    /// The request's `Content-Type` header value, e.g.
    /// `multipart/form-data; boundary=----abc123`. Its `boundary`
    /// parameter is used to scan the input.
    pub content_type: &'a str,
    pub source: Box<dyn ByteSource>,
    /// Boundary token to use for the *output* delimiters. Defaults to the
    /// input boundary when `None`.
    pub output_boundary: Option<String>,
    pub filter: Option<FilterFn>,
    pub transform: Option<TransformFn>,
}

/// Parses `options.content_type` for its `boundary` parameter, wires a
/// [`ReemitSource`] over `options.source`, and returns it alongside the
/// boundary token the caller should advertise for the *output* payload
/// (e.g. in a new `Content-Type` header).
pub fn get_readable_formdata_stream(
    options: FormDataStreamOptions<'_>,
) -> Result<(Box<dyn ByteSource>, String), Error> {
    let mime_type: mime::Mime = options
        .content_type
        .parse()
        .map_err(|e: mime::FromStrError| Error::malformed_header(e.to_string()))?;

    if mime_type.type_() != mime::MULTIPART {
        return Err(Error::malformed_header(format!(
            "not a multipart content type: {:?}",
            options.content_type
        )));
    }

    let input_boundary = mime_type
        .get_param("boundary")
        .ok_or_else(|| Error::malformed_header("multipart content type missing boundary param"))?
        .as_str()
        .to_string();

    let output_boundary = options.output_boundary.unwrap_or_else(|| input_boundary.clone());

    let parts = stream_multipart(options.source, &input_boundary);
    let reemit_options = ReemitOptions {
        boundary: output_boundary.clone(),
        filter: options.filter,
        transform: options.transform,
    };
    let reemitted = ReemitSource::new(parts, reemit_options);
    Ok((Box::new(reemitted), output_boundary))
}
