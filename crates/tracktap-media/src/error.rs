//! Error types for tracktap-media.

use std::io;
use thiserror::Error;

/// Result type for tracktap-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tracktap-media operations.
///
/// None of these escape [`extract_tracks`](crate::extract_tracks); walkers use
/// them to unwind to the nearest scope that can keep partial results.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a header or payload.
    #[error("Unexpected end of stream while reading {0}")]
    UnexpectedEnd(&'static str),

    /// Malformed EBML structure.
    #[error("Invalid EBML: {0}")]
    InvalidEbml(String),

    /// Malformed MP4 box structure.
    #[error("Invalid MP4: {0}")]
    InvalidMp4(String),

    /// A declared size does not fit in the enclosing scope.
    #[error("Declared size {size} exceeds remaining {remaining} bytes")]
    SizeOverflow { size: u64, remaining: u64 },
}

impl Error {
    /// Create an invalid EBML error.
    pub fn invalid_ebml(msg: impl Into<String>) -> Self {
        Self::InvalidEbml(msg.into())
    }

    /// Create an invalid MP4 error.
    pub fn invalid_mp4(msg: impl Into<String>) -> Self {
        Self::InvalidMp4(msg.into())
    }

    /// Map `UnexpectedEof` I/O errors to [`Error::UnexpectedEnd`].
    pub(crate) fn from_io(err: io::Error, what: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEnd(what)
        } else {
            Self::Io(err)
        }
    }
}
