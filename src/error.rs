use thiserror::Error;

/// Errors from the data source layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Offset {offset} is beyond the end of the source ({len} bytes)")]
    InvalidOffset { offset: u64, len: u64 },

    #[error("Source is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, Error>;
