//! Forward-only byte cursor shared by the container walkers.

use std::io::{self, Read};

use crate::{Error, Result};

/// Largest leaf payload the walkers will buffer (names, headers).
pub const MAX_PAYLOAD_SIZE: u64 = 64 * 1024;

/// Forward-only reader that tracks how many bytes it has consumed.
///
/// The underlying stream cannot seek; skipping reads and discards.
pub struct StreamCursor<R> {
    reader: R,
    position: u64,
}

impl<R: Read> StreamCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read one byte, or `None` at a clean end of stream.
    pub fn read_u8_or_eof(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.position += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        self.read_u8_or_eof()?.ok_or(Error::UnexpectedEnd(what))
    }

    pub fn read_exact(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| Error::from_io(e, what))?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read a payload of `len` bytes into memory.
    ///
    /// Payloads above [`MAX_PAYLOAD_SIZE`] are skipped and `None` returned.
    pub fn read_payload(&mut self, len: u64, what: &'static str) -> Result<Option<Vec<u8>>> {
        if len > MAX_PAYLOAD_SIZE {
            self.skip(len, what)?;
            return Ok(None);
        }
        let mut data = vec![0u8; len as usize];
        self.read_exact(&mut data, what)?;
        Ok(Some(data))
    }

    /// Discard `len` bytes without materializing them.
    pub fn skip(&mut self, len: u64, what: &'static str) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let copied = io::copy(&mut (&mut self.reader).take(len), &mut io::sink())?;
        self.position += copied;
        if copied < len {
            return Err(Error::UnexpectedEnd(what));
        }
        Ok(())
    }

    /// Discard everything up to absolute position `end`.
    pub fn skip_to(&mut self, end: u64, what: &'static str) -> Result<()> {
        let remaining = end.saturating_sub(self.position);
        self.skip(remaining, what)
    }
}
