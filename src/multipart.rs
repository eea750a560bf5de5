//! The multipart state machine.
//!
//! `PROLOGUE -> HEADERS -> BODY -> (HEADERS | TERMINATED)`, driven by one
//! [`StreamSearch`] configured with the needle `"--" || boundary`. This
//! module owns the single-threaded cooperative [`Driver`] that both the
//! part iterator and each part's lazy body handle pull through: there is
//! exactly one byte source reader, and it's read linearly.
//!
//! Cross-referential lifetimes are modeled with a single owner — the
//! `Driver`, behind `Rc<RefCell<_>>` — and handles that carry a
//! `generation` counter instead of a borrow. Once the driver advances
//! past the part a handle was issued for, that handle's `generation` no
//! longer matches and it reports itself done, so an abandoned body
//! iterator fails safe instead of reading another part's bytes.

use bytes::Bytes;
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::bytes_util;
use crate::header_parse::{self, TransferEncoding};
use crate::part::{Part, PartData};
use crate::source::ByteSource;
use crate::stream_search::{StreamSearch, Token};
use crate::Error;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prologue,
    Headers,
    Body,
    Terminated,
}

/// Tracks the "hold the last CRLF back" rule for body bytes: every
/// completed CRLF match is forwarded only once a non-CRLF token (or
/// another CRLF) follows it, so the CRLF immediately preceding the next
/// boundary is never forwarded at all.
struct BodyCrlfFilter {
    pending_crlf: bool,
}

impl BodyCrlfFilter {
    fn new() -> Self {
        BodyCrlfFilter { pending_crlf: false }
    }

    fn apply(&mut self, tokens: Vec<Token>) -> Vec<Bytes> {
        let mut out = Vec::with_capacity(tokens.len());
        for tok in tokens {
            match tok {
                Token::Data(bytes) => {
                    if self.pending_crlf {
                        out.push(Bytes::from_static(CRLF));
                        self.pending_crlf = false;
                    }
                    out.push(bytes);
                }
                Token::Match => {
                    if self.pending_crlf {
                        out.push(Bytes::from_static(CRLF));
                    }
                    self.pending_crlf = true;
                }
            }
        }
        out
    }
}

struct Driver {
    source: Box<dyn ByteSource>,
    boundary_scanner: StreamSearch,
    pending_tokens: VecDeque<Token>,
    source_eof: bool,
    state: State,
    /// Bumped every time a part's body finishes (boundary match while in
    /// `Body`). A [`PartBody`] whose `generation` no longer matches is
    /// stale and reports itself exhausted.
    generation: u64,
    body_scanner: Option<StreamSearch>,
    body_filter: Option<BodyCrlfFilter>,
    body_pending: VecDeque<Bytes>,
}

impl Driver {
    fn new(source: Box<dyn ByteSource>, boundary: &str) -> Self {
        let needle = format!("--{}", boundary);
        Driver {
            source,
            boundary_scanner: StreamSearch::new(Bytes::copy_from_slice(needle.as_bytes())),
            pending_tokens: VecDeque::new(),
            source_eof: false,
            state: State::Prologue,
            generation: 0,
            body_scanner: None,
            body_filter: None,
            body_pending: VecDeque::new(),
        }
    }

    /// Pulls the next token from the boundary scanner, fetching more
    /// chunks from the byte source as needed. `None` is EOF.
    async fn next_outer_token(&mut self) -> Result<Option<Token>, Error> {
        loop {
            if let Some(tok) = self.pending_tokens.pop_front() {
                return Ok(Some(tok));
            }
            if self.source_eof {
                return Ok(None);
            }
            match self.source.next_chunk().await? {
                Some(chunk) => {
                    let toks = self.boundary_scanner.feed(chunk);
                    self.pending_tokens.extend(toks);
                }
                None => {
                    self.source_eof = true;
                    let residual = self.boundary_scanner.end();
                    if !residual.is_empty() {
                        self.pending_tokens.push_back(Token::Data(residual));
                    }
                }
            }
        }
    }

    /// Pulls the next body chunk for the part identified by `generation`.
    /// Returns `Ok(None)` both for "body genuinely ended" and for "this
    /// handle is stale" — callers distinguish the two by checking the
    /// generation themselves if they care (the public [`PartBody`] does).
    async fn pull_body_chunk(&mut self, generation: u64) -> Result<Option<Bytes>, Error> {
        loop {
            if self.generation != generation {
                return Ok(None);
            }
            if let Some(chunk) = self.body_pending.pop_front() {
                return Ok(Some(chunk));
            }
            match self.next_outer_token().await? {
                None => {
                    return Err(Error::malformed_framing(
                        "source ended before the closing boundary delimiter",
                    ));
                }
                Some(Token::Data(bytes)) => {
                    let toks = self
                        .body_scanner
                        .as_mut()
                        .expect("body scanner present while in Body state")
                        .feed(bytes);
                    let out = self
                        .body_filter
                        .as_mut()
                        .expect("body filter present while in Body state")
                        .apply(toks);
                    self.body_pending.extend(out);
                }
                Some(Token::Match) => {
                    let mut scanner = self.body_scanner.take().expect("body scanner present");
                    self.body_filter = None; // any pending CRLF is discarded, not forwarded
                    let residual = scanner.end();
                    self.state = State::Headers;
                    self.generation += 1;
                    trace!("part body finished, generation -> {}", self.generation);
                    return if residual.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some(residual))
                    };
                }
            }
        }
    }
}

/// Handle to one part's lazy body. Single consumer, non-restartable: once
/// the enclosing [`PartIterator`] advances past this part, every call
/// here returns `Ok(None)` as if the body had ended.
pub struct PartBody {
    driver: Rc<RefCell<Driver>>,
    generation: u64,
    done: bool,
}

impl PartBody {
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        if self.done {
            return Ok(None);
        }
        let mut driver = self.driver.borrow_mut();
        let result = driver.pull_body_chunk(self.generation).await;
        drop(driver);
        match &result {
            Ok(None) | Err(_) => self.done = true,
            Ok(Some(_)) => {}
        }
        result
    }
}

/// Drains whatever's left of a stale body without exposing it, so the
/// driver can move on to the next header block. Used internally by
/// [`PartIterator::next_part`] when a caller abandons a part early.
async fn drain_stale_body(driver: &Rc<RefCell<Driver>>) -> Result<(), Error> {
    loop {
        let (in_body, generation) = {
            let d = driver.borrow();
            (d.state == State::Body, d.generation)
        };
        if !in_body {
            return Ok(());
        }
        let mut d = driver.borrow_mut();
        let chunk = d.pull_body_chunk(generation).await?;
        drop(d);
        if chunk.is_none() {
            // Either the body just ended (state flipped inside
            // pull_body_chunk) or this generation was already stale;
            // either way the loop condition re-checks `state` next pass.
        }
    }
}

/// Part iterator: pulls one [`Part`] at a time with a lazy body, in input
/// order.
pub struct PartIterator {
    driver: Rc<RefCell<Driver>>,
}

impl PartIterator {
    pub fn new(source: Box<dyn ByteSource>, boundary: &str) -> Self {
        PartIterator {
            driver: Rc::new(RefCell::new(Driver::new(source, boundary))),
        }
    }

    /// Pulls the next part, or `None` once the closing delimiter has been
    /// seen. Draining a previous part's unfinished body happens here if
    /// the caller abandoned it.
    pub async fn next_part(&mut self) -> Result<Option<Part>, Error> {
        drain_stale_body(&self.driver).await?;

        let state = self.driver.borrow().state;
        if state == State::Prologue {
            self.skip_prologue().await?;
        }

        if self.driver.borrow().state == State::Terminated {
            return Ok(None);
        }

        self.read_headers().await
    }

    async fn skip_prologue(&mut self) -> Result<(), Error> {
        loop {
            let tok = {
                let mut d = self.driver.borrow_mut();
                d.next_outer_token().await?
            };
            match tok {
                None => {
                    return Err(Error::malformed_framing(
                        "source ended before any boundary delimiter",
                    ));
                }
                Some(Token::Match) => {
                    self.driver.borrow_mut().state = State::Headers;
                    return Ok(());
                }
                Some(Token::Data(_)) => continue, // preamble, discarded
            }
        }
    }

    async fn read_headers(&mut self) -> Result<Option<Part>, Error> {
        let mut header_scanner = StreamSearch::new(Bytes::from_static(CRLF));
        let mut raw_lines: Vec<Bytes> = Vec::new();
        let mut body_prelude: Vec<Token> = Vec::new();
        let mut found_blank_line = false;
        let mut first_token = true;
        let mut last_was_match = false;

        'read: loop {
            let tok = {
                let mut d = self.driver.borrow_mut();
                d.next_outer_token().await?
            };
            match tok {
                None => {
                    return Err(Error::malformed_framing(
                        "source ended in the middle of a header block",
                    ));
                }
                Some(Token::Match) => {
                    return Err(Error::malformed_framing(
                        "empty part: two boundary delimiters with nothing between them",
                    ));
                }
                Some(Token::Data(bytes)) => {
                    if first_token {
                        first_token = false;
                        if bytes.len() >= 2 && &bytes[0..2] == b"--" {
                            debug!("closing delimiter found, terminating");
                            self.driver.borrow_mut().state = State::Terminated;
                            return Ok(None);
                        }
                    }

                    for tok in header_scanner.feed(bytes) {
                        if found_blank_line {
                            body_prelude.push(tok);
                            continue;
                        }
                        match tok {
                            Token::Data(line) => {
                                raw_lines.push(line);
                                last_was_match = false;
                            }
                            Token::Match => {
                                if last_was_match {
                                    found_blank_line = true;
                                } else {
                                    last_was_match = true;
                                }
                            }
                        }
                    }

                    if found_blank_line {
                        break 'read;
                    }
                }
            }
        }

        let header_lines: Vec<String> = raw_lines
            .iter()
            .map(|b| bytes_util::bytes_to_string(b))
            .collect();

        let part = parse_header_lines(&header_lines)?;

        let mut filter = BodyCrlfFilter::new();
        let initial = filter.apply(body_prelude);
        let generation = {
            let mut d = self.driver.borrow_mut();
            d.body_scanner = Some(header_scanner);
            d.body_filter = Some(filter);
            d.body_pending = initial.into_iter().collect();
            d.state = State::Body;
            d.generation
        };

        let body = PartBody {
            driver: self.driver.clone(),
            generation,
            done: false,
        };

        Ok(Some(Part {
            name: part.name,
            filename: part.filename,
            content_type: part.content_type,
            content_length: part.content_length,
            content_transfer_encoding: part.content_transfer_encoding,
            header_lines: Some(header_lines),
            extra_headers: part.extra_headers,
            data: PartData::Lazy(body),
        }))
    }
}

struct ParsedHeaders {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    content_length: Option<String>,
    content_transfer_encoding: Option<TransferEncoding>,
    extra_headers: std::collections::BTreeMap<String, String>,
}

fn parse_header_lines(lines: &[String]) -> Result<ParsedHeaders, Error> {
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    let mut content_length = None;
    let mut content_transfer_encoding = None;
    let mut extra_headers = std::collections::BTreeMap::new();

    for line in lines {
        let (header_name, value) = header_parse::split_header_line(line)?;
        match header_name.to_ascii_lowercase().as_str() {
            "content-disposition" => {
                let (n, f) = header_parse::parse_content_disposition(value)?;
                name = Some(n);
                filename = f;
            }
            "content-type" => content_type = Some(value.to_string()),
            "content-length" => content_length = Some(value.to_string()),
            "content-transfer-encoding" => {
                content_transfer_encoding = TransferEncoding::parse(value);
            }
            other => {
                extra_headers.insert(other.to_string(), value.to_string());
            }
        }
    }

    let name = name.ok_or_else(|| Error::malformed_header("missing Content-Disposition header"))?;

    Ok(ParsedHeaders {
        name,
        filename,
        content_type,
        content_length,
        content_transfer_encoding,
        extra_headers,
    })
}
