//! Layered error types: protocol/transport/codec/logic/conversion kinds,
//! plus the WAMP-level [`CallError`] surfaced to call/invocation handlers.

use std::fmt;

use crate::message::{ErrorType, Message, Reason};

/// A `Result` alias for session/peer-level operations.
pub type WampResult<T> = Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    #[inline]
    pub fn get_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WAMP error: {}", self.kind.description())
    }
}

impl std::error::Error for Error {}

/// Error categories per the taxonomy: Protocol, Transport, Codec, WAMP-level,
/// Logic (reported via `panic!`, not represented here), Conversion.
#[derive(Debug)]
pub enum ErrorKind {
    /// Arity/direction violation, unexpected reply type, duplicate request id.
    Protocol(&'static str),
    Transport(TransportError),
    Codec(CodecError),
    /// A pending request was abandoned by session teardown.
    SessionEnded,
    /// The peer was asked to use a codec id it doesn't recognise.
    UnsupportedCodec(u8),
    InvalidState(&'static str),
    Timeout,
    InvalidMessageType(Message),
    ErrorReason(ErrorType, u64, Reason),
    /// The router sent ABORT instead of WELCOME while establishing a session.
    Aborted(Reason),
}

impl ErrorKind {
    pub fn description(&self) -> String {
        match *self {
            ErrorKind::Protocol(s) => s.to_string(),
            ErrorKind::Transport(ref e) => e.to_string(),
            ErrorKind::Codec(ref e) => e.to_string(),
            ErrorKind::SessionEnded => "session ended before the request completed".to_string(),
            ErrorKind::UnsupportedCodec(id) => format!("unsupported codec id {}", id),
            ErrorKind::InvalidState(s) => s.to_string(),
            ErrorKind::Timeout => "request timed out".to_string(),
            ErrorKind::InvalidMessageType(ref m) => format!("invalid message type: {:?}", m),
            ErrorKind::ErrorReason(_, _, ref r) => r.to_string(),
            ErrorKind::Aborted(ref r) => format!("router aborted: {}", r),
        }
    }
}

/// Failures originating in the byte-framed transport the [`crate::peer::Peer`]
/// is given; see `SPEC_FULL.md` §6.1.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    ConnectRefused,
    Disconnected,
    WriteFailed(String),
    PayloadSizeExceeded { limit: usize, actual: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TransportError::ConnectRefused => write!(f, "connection refused"),
            TransportError::Disconnected => write!(f, "transport disconnected"),
            TransportError::WriteFailed(ref s) => write!(f, "write failed: {}", s),
            TransportError::PayloadSizeExceeded { limit, actual } => write!(
                f,
                "payload of {} bytes exceeds the transport's {}-byte limit",
                actual, limit
            ),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors raised while encoding a [`crate::value::Value`]/[`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderError {
    Unsupported(&'static str),
    Io(String),
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EncoderError::Unsupported(s) => write!(f, "unsupported value: {}", s),
            EncoderError::Io(ref s) => write!(f, "I/O error: {}", s),
        }
    }
}

impl std::error::Error for EncoderError {}

/// Errors raised while decoding bytes into a [`crate::value::Value`]/[`Message`],
/// per SPEC_FULL.md §4.2.5.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderError {
    EmptyInput,
    UnexpectedEnd,
    BadUtf8,
    BadBase64Length,
    BadBase64Char,
    BadBase64Padding,
    MaxDepth,
    NonStringKey,
    DuplicateKey,
    BadType,
    Unsupported,
    Syntax(String),
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecoderError::EmptyInput => write!(f, "empty input"),
            DecoderError::UnexpectedEnd => write!(f, "unexpected end of input"),
            DecoderError::BadUtf8 => write!(f, "invalid UTF-8"),
            DecoderError::BadBase64Length => write!(f, "invalid base64 length"),
            DecoderError::BadBase64Char => write!(f, "invalid base64 character"),
            DecoderError::BadBase64Padding => write!(f, "invalid base64 padding"),
            DecoderError::MaxDepth => write!(f, "maximum nesting depth exceeded"),
            DecoderError::NonStringKey => write!(f, "object keys must be strings"),
            DecoderError::DuplicateKey => write!(f, "duplicate object key"),
            DecoderError::BadType => write!(f, "unexpected value type"),
            DecoderError::Unsupported => write!(f, "unsupported encoding feature"),
            DecoderError::Syntax(ref s) => write!(f, "syntax error: {}", s),
        }
    }
}

impl std::error::Error for DecoderError {}

/// Union of encode/decode failures, as seen by [`crate::peer::Peer`].
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    Encode(EncoderError),
    Decode(DecoderError),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CodecError::Encode(ref e) => write!(f, "{}", e),
            CodecError::Decode(ref e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<EncoderError> for CodecError {
    fn from(e: EncoderError) -> CodecError {
        CodecError::Encode(e)
    }
}

impl From<DecoderError> for CodecError {
    fn from(e: DecoderError) -> CodecError {
        CodecError::Decode(e)
    }
}

/// A single segment in a [`ConversionError`]'s descent path, e.g.
/// `for array index 3` or `for object member "foo"`.
#[derive(Debug, Clone, Default)]
pub struct Breadcrumb(pub Vec<String>);

impl Breadcrumb {
    pub fn push(&mut self, segment: String) {
        self.0.push(segment);
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.0.iter().rev() {
            write!(f, " for {}", segment)?;
        }
        Ok(())
    }
}

/// Raised by [`crate::value::FromValue`] conversions; carries a breadcrumb
/// of the recursive descent that led to the failing element.
#[derive(Debug, Clone)]
pub struct ConversionError {
    pub message: String,
    pub breadcrumb: Breadcrumb,
}

impl ConversionError {
    pub fn new(message: &str, breadcrumb: Breadcrumb) -> ConversionError {
        ConversionError {
            message: message.to_string(),
            breadcrumb,
        }
    }

    /// Adds a descent segment and returns `self`, for chaining with `map_err`.
    pub fn push(mut self, segment: String) -> ConversionError {
        self.breadcrumb.push(segment);
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.message, self.breadcrumb)
    }
}

impl std::error::Error for ConversionError {}

/// Raised by [`crate::unpack::unpack`] when a positional argument list
/// doesn't match a handler's parameter list.
#[derive(Debug, Clone)]
pub enum UnpackError {
    Arity { expected: usize, got: usize },
    Conversion(ConversionError),
}

impl fmt::Display for UnpackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            UnpackError::Arity { expected, got } => {
                write!(f, "expected {} positional arguments, got {}", expected, got)
            }
            UnpackError::Conversion(ref e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for UnpackError {}

impl From<ConversionError> for UnpackError {
    fn from(e: ConversionError) -> UnpackError {
        UnpackError::Conversion(e)
    }
}
