use std::{error::Error as StdError, fmt};

/// Errors surfaced by the parser, the re-emit pipeline, and the byte
/// source adapters.
///
/// Parser-internal errors terminate the part iterator; any body iterator
/// that was mid-pull transitions to an error state and surfaces the same
/// error on its next poll. The re-emit pipeline forwards any of these to
/// its output source as a stream error.
#[derive(Debug)]
pub enum Error {
    /// EOF before the closing delimiter, or an empty header block between
    /// two boundary matches.
    MalformedFraming(String),
    /// A header line without `:`, a missing/invalid `Content-Disposition`,
    /// or a mismatched-quote parameter value.
    MalformedHeader(String),
    /// The upstream byte source errored.
    SourceError(Box<dyn StdError + 'static>),
    /// The caller's `filter` or `transform` callback errored.
    TransformError(Box<dyn StdError + 'static>),
}

impl Error {
    pub fn malformed_framing<S: Into<String>>(msg: S) -> Self {
        Error::MalformedFraming(msg.into())
    }

    pub fn malformed_header<S: Into<String>>(msg: S) -> Self {
        Error::MalformedHeader(msg.into())
    }

    pub fn source_error<E: StdError + 'static>(err: E) -> Self {
        Error::SourceError(Box::new(err))
    }

    pub fn transform_error<E: StdError + 'static>(err: E) -> Self {
        Error::TransformError(Box::new(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedFraming(msg) => write!(f, "malformed multipart framing: {}", msg),
            Error::MalformedHeader(msg) => write!(f, "malformed part header: {}", msg),
            Error::SourceError(e) => write!(f, "byte source error: {}", e),
            Error::TransformError(e) => write!(f, "filter/transform error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SourceError(e) => Some(e.as_ref()),
            Error::TransformError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
