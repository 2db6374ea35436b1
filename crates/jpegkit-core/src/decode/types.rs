//! Core types for image decoding.

use thiserror::Error;

use crate::bridge::Recoverable;
use crate::codec::CodecError;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream has no recognisable JPEG header.
    #[error("Invalid or unsupported image format: {0}")]
    InvalidFormat(String),

    /// The codec gave up part-way through the stream.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// Out of memory while allocating pixel or scanline storage.
    #[error("Out of memory during decoding")]
    OutOfMemory,

    /// I/O error while opening the source.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl DecodeError {
    /// Whether the codec reported this failure mid-stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::CorruptedFile(_))
    }
}

impl From<CodecError> for DecodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidHeader(message) => DecodeError::InvalidFormat(message),
            CodecError::OutOfMemory(_) => DecodeError::OutOfMemory,
            CodecError::Fatal(message) => DecodeError::CorruptedFile(message),
            CodecError::Io(e) => DecodeError::CorruptedFile(e.to_string()),
        }
    }
}

impl Recoverable for DecodeError {
    fn diagnostic(&self) -> Option<&str> {
        match self {
            DecodeError::CorruptedFile(message) => Some(message.as_str()),
            _ => None,
        }
    }

    fn from_panic(message: String) -> Self {
        DecodeError::CorruptedFile(message)
    }
}
