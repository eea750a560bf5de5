//! The re-emit pipeline: filter (sync) + transform (async) +
//! serialize, exposed as a [`ByteSource`] so a re-emitted payload is
//! itself a pull-based stream rather than one buffered blob.
//!
//! Filtering is synchronous because dropping a part never needs to wait
//! on anything; transforming is the pipeline's only suspension point,
//! matching the asymmetry called out where this is specified. A part a
//! filter drops, or a transform replaces with `None`, has its body
//! drained (not read into memory) so the underlying driver can still
//! advance past it.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use crate::multipart::{PartBody, PartIterator};
use crate::part::{Part, PartData};
use crate::serializer;
use crate::source::ByteSource;
use crate::Error;

/// What a filter callback decided about one part: whether to keep it, and
/// whether the whole pipeline should stop after disposing of it (keeping
/// or draining it per `keep`) — no further parts are pulled once `stop`
/// is set, though the closing delimiter is still written.
pub struct FilterOutcome {
    pub keep: bool,
    pub stop: bool,
}

/// What a transform callback decided about one part: a replacement part
/// (or `None` to drop it), and whether the whole pipeline should stop
/// emitting further parts after this one. When `stop` is set alongside
/// `part: Some(p)`, `p` is still serialized before the pipeline
/// terminates; only a `None` part is dropped outright.
pub struct TransformOutcome {
    pub part: Option<Part>,
    pub stop: bool,
}

pub type FilterFn = Box<dyn FnMut(&Part) -> FilterOutcome>;
type TransformFuture = Pin<Box<dyn Future<Output = Result<TransformOutcome, Error>>>>;
pub type TransformFn = Box<dyn FnMut(Part) -> TransformFuture>;

/// Configuration for one re-emit run.
pub struct ReemitOptions {
    /// Boundary token used for the *output* delimiters. May differ from
    /// the input payload's boundary.
    pub boundary: String,
    pub filter: Option<FilterFn>,
    pub transform: Option<TransformFn>,
}

enum BodySource {
    Lazy(PartBody),
    Eager(Option<Bytes>),
}

impl BodySource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            BodySource::Lazy(body) => body.next_chunk().await,
            BodySource::Eager(slot) => Ok(slot.take()),
        }
    }
}

/// Pull-based re-emitted byte stream. Drives a [`PartIterator`] through
/// the configured filter/transform and serializes each surviving part
/// with a fresh boundary delimiter.
pub struct ReemitSource {
    parts: PartIterator,
    filter: Option<FilterFn>,
    transform: Option<TransformFn>,
    boundary: String,
    pending: VecDeque<Bytes>,
    current_body: Option<BodySource>,
    stopped: bool,
    done: bool,
}

impl ReemitSource {
    pub fn new(parts: PartIterator, options: ReemitOptions) -> Self {
        ReemitSource {
            parts,
            filter: options.filter,
            transform: options.transform,
            boundary: options.boundary,
            pending: VecDeque::new(),
            current_body: None,
            stopped: false,
            done: false,
        }
    }

    async fn next_emittable_part(&mut self) -> Result<Option<Part>, Error> {
        loop {
            if self.stopped {
                return Ok(None);
            }

            let part = match self.parts.next_part().await? {
                Some(p) => p,
                None => return Ok(None),
            };

            if let Some(filter) = &mut self.filter {
                let outcome = filter(&part);
                if outcome.stop {
                    self.stopped = true;
                }
                if !outcome.keep {
                    part.drain_body().await?;
                    continue;
                }
            }

            if let Some(transform) = &mut self.transform {
                let outcome = transform(part).await?;
                if outcome.stop {
                    self.stopped = true;
                }
                match outcome.part {
                    // A transform's output is, by definition, a
                    // transformed part: mutated fixed fields win and
                    // header_lines is regenerated from them rather than
                    // serialized verbatim.
                    Some(mut p) => {
                        p.header_lines = None;
                        return Ok(Some(p));
                    }
                    None => continue,
                }
            }

            return Ok(Some(part));
        }
    }

    fn queue_part_framing(&mut self, part: Part) {
        self.pending
            .push_back(Bytes::from(format!("--{}\r\n", self.boundary)));
        for line in serializer::build_header_lines(&part) {
            self.pending.push_back(Bytes::from(format!("{}\r\n", line)));
        }
        self.pending.push_back(Bytes::from_static(b"\r\n"));
        self.current_body = Some(match part.data {
            PartData::Lazy(body) => BodySource::Lazy(body),
            PartData::Eager(bytes) => BodySource::Eager(Some(bytes)),
        });
    }
}

#[async_trait(?Send)]
impl ByteSource for ReemitSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Ok(Some(chunk));
            }

            if let Some(body) = &mut self.current_body {
                match body.next_chunk().await? {
                    Some(chunk) => return Ok(Some(chunk)),
                    None => {
                        self.current_body = None;
                        self.pending.push_back(Bytes::from_static(b"\r\n"));
                        continue;
                    }
                }
            }

            if self.done {
                return Ok(None);
            }

            match self.next_emittable_part().await? {
                Some(part) => self.queue_part_framing(part),
                None => {
                    self.pending
                        .push_back(Bytes::from(format!("--{}--", self.boundary)));
                    self.done = true;
                }
            }
        }
    }
}
