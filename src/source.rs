//! Byte-offset addressable data sources and the extraction tee.
//!
//! A [`DataSource`] is what the playback path reads media bytes from. A
//! [`TeeSource`] wraps one and, whenever the stream is opened from its first
//! byte, mirrors everything the playback path reads into a track extraction
//! session. The playback path's bytes are never altered.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::bridge::BridgeWriter;
use crate::extraction::TrackExtraction;
use crate::{Error, Result};

/// Sequential reader over a media resource, addressable by byte offset.
///
/// # Blocking Behavior
///
/// `read()` may block while data is downloading. Sources are driven from a
/// plain thread (or `spawn_blocking`), never from an async task.
pub trait DataSource: Send {
    /// Open the resource for reading from `offset`.
    ///
    /// Returns the number of bytes remaining from `offset` when known.
    /// Opening an already-open source reopens it at the new offset.
    fn open(&mut self, offset: u64) -> Result<Option<u64>>;

    /// Read into `buf`, returning the number of bytes read; 0 at end of
    /// stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the resource. Idempotent.
    fn close(&mut self) -> Result<()>;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn open(&mut self, offset: u64) -> Result<Option<u64>> {
        (**self).open(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Local file source.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn open(&mut self, offset: u64) -> Result<Option<u64>> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if offset > len {
            return Err(Error::InvalidOffset { offset, len });
        }
        file.seek(SeekFrom::Start(offset))?;
        self.file = Some(file);
        Ok(Some(len - offset))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        Ok(file.read(buf)?)
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}

/// In-memory source over already-downloaded bytes.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    position: Option<usize>,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: None,
        }
    }
}

impl DataSource for MemorySource {
    fn open(&mut self, offset: u64) -> Result<Option<u64>> {
        let len = self.data.len() as u64;
        if offset > len {
            return Err(Error::InvalidOffset { offset, len });
        }
        self.position = Some(offset as usize);
        Ok(Some(len - offset))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let position = self.position.as_mut().ok_or(Error::NotOpen)?;
        let remaining = &self.data[*position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        *position += n;
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.position = None;
        Ok(())
    }
}

/// Data source wrapper that tees a stream opened at byte 0 into a track
/// extraction session.
pub struct TeeSource<S> {
    upstream: S,
    extraction: Arc<TrackExtraction>,
    writer: Option<BridgeWriter>,
}

impl<S: DataSource> TeeSource<S> {
    pub fn new(upstream: S, extraction: Arc<TrackExtraction>) -> Self {
        Self {
            upstream,
            extraction,
            writer: None,
        }
    }

    /// Whether reads are currently mirrored into a session.
    pub fn is_teeing(&self) -> bool {
        self.writer.is_some()
    }

    pub fn extraction(&self) -> &Arc<TrackExtraction> {
        &self.extraction
    }

    fn stop_teeing(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.close();
        }
    }
}

impl<S: DataSource> DataSource for TeeSource<S> {
    fn open(&mut self, offset: u64) -> Result<Option<u64>> {
        if self.writer.take().is_some() {
            // Reopened before end of stream: the partial session is abandoned
            self.extraction.cancel();
        }
        let len = self.upstream.open(offset)?;

        if offset == 0 {
            self.writer = self.extraction.begin();
        } else {
            trace!(offset, "Opened mid-stream, not teeing");
        }
        Ok(len)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self.upstream.read(buf) {
            Ok(n) => n,
            Err(e) => {
                self.stop_teeing();
                return Err(e);
            }
        };

        let keep_teeing = match &self.writer {
            None => return Ok(n),
            Some(_) if n == 0 => {
                debug!("Upstream ended, closing extraction input");
                false
            }
            Some(writer) => writer.offer(&buf[..n]),
        };
        if !keep_teeing {
            trace!("Extraction tee stopped");
            self.stop_teeing();
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.stop_teeing();
        self.upstream.close()
    }
}
