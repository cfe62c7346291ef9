//! Forward-only MP4 reader with atom parsing.

use std::io::Read;
use std::ops::ControlFlow;

use tracing::{debug, trace};

use super::atoms::{self, AtomHeader, AtomType};
use crate::cursor::StreamCursor;
use crate::track::{ParseResult, TrackKind, TrackRecord};
use crate::{Error, Result};

/// Smallest possible atom header.
const MIN_HEADER_SIZE: u64 = 8;

/// Fields gathered while walking one `trak`.
#[derive(Debug, Default)]
struct TrakFields {
    track_id: Option<u32>,
    kind: TrackKind,
    language: Option<String>,
    name: Option<String>,
}

impl TrakFields {
    fn into_record(self) -> Option<TrackRecord> {
        let track_id = self.track_id?;
        Some(TrackRecord {
            track_id: track_id as u64,
            name: self.name,
            language: self.language,
            kind: self.kind,
        })
    }
}

/// MP4 reader over a non-seekable stream.
///
/// Every scope ends with the cursor at the end of the atom it walked, so
/// siblings stay aligned even when a child scan stops early.
pub struct Mp4Reader<'a, R> {
    cursor: &'a mut StreamCursor<R>,
}

impl<'a, R: Read> Mp4Reader<'a, R> {
    /// Create a new MP4 reader.
    pub fn new(cursor: &'a mut StreamCursor<R>) -> Self {
        Self { cursor }
    }

    /// Walk top-level atoms until `moov` and collect its tracks.
    pub fn parse(&mut self, result: &mut ParseResult) -> Result<()> {
        let mut found_moov = false;

        self.scan(None, |reader, header, end| {
            if header.atom_type != AtomType::MOOV {
                trace!(atom = %header.atom_type, "Skipping top-level atom");
                return Ok(ControlFlow::Continue(()));
            }
            found_moov = true;
            reader.parse_moov(end, result)?;
            Ok(ControlFlow::Break(()))
        })?;

        if !found_moov {
            debug!("Stream ended without moov");
        }
        Ok(())
    }

    /// Read one atom header, or `None` at a clean end of stream.
    pub fn read_header(&mut self) -> Result<Option<AtomHeader>> {
        let Some(first) = self.cursor.read_u8_or_eof()? else {
            return Ok(None);
        };
        let mut rest = [0u8; 7];
        self.cursor.read_exact(&mut rest, "atom header")?;

        let size = u32::from_be_bytes([first, rest[0], rest[1], rest[2]]) as u64;
        let atom_type = AtomType::from_bytes([rest[3], rest[4], rest[5], rest[6]]);

        let body_size = match size {
            0 => None,
            1 => {
                // 64-bit extended size
                let mut ext = [0u8; 8];
                self.cursor.read_exact(&mut ext, "extended atom size")?;
                let size = u64::from_be_bytes(ext);
                let body = size.checked_sub(16).ok_or_else(|| {
                    Error::invalid_mp4(format!("atom {} extended size {} < 16", atom_type, size))
                })?;
                Some(body)
            }
            size if size < MIN_HEADER_SIZE => {
                return Err(Error::invalid_mp4(format!(
                    "atom {} size {} < 8",
                    atom_type, size
                )));
            }
            size => Some(size - MIN_HEADER_SIZE),
        };

        Ok(Some(AtomHeader {
            atom_type,
            body_size,
        }))
    }

    /// Visit child atoms up to `end` (`None` = end of stream).
    ///
    /// The scan stops at a malformed header or at a child whose declared size
    /// does not fit in what is left of the parent. The cursor is moved to the
    /// end of each child after `visit` returns.
    fn scan<F>(&mut self, end: Option<u64>, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self, &AtomHeader, Option<u64>) -> Result<ControlFlow<()>>,
    {
        loop {
            if let Some(end) = end {
                if end.saturating_sub(self.cursor.position()) < MIN_HEADER_SIZE {
                    return Ok(());
                }
            }

            let header = match self.read_header() {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(()),
                Err(Error::InvalidMp4(msg)) => {
                    debug!(%msg, "Malformed atom header, ending scan");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let child_end = match header.body_size {
                None => end,
                Some(size) => {
                    let child_end = self.cursor.position().saturating_add(size);
                    if end.is_some_and(|end| child_end > end) {
                        debug!(
                            atom = %header.atom_type,
                            size,
                            "Atom exceeds its parent, ending scan"
                        );
                        return Ok(());
                    }
                    Some(child_end)
                }
            };

            let flow = visit(&mut *self, &header, child_end)?;

            match child_end {
                Some(child_end) => self.cursor.skip_to(child_end, "atom body")?,
                None => return Ok(()),
            }
            if flow.is_break() {
                return Ok(());
            }
        }
    }

    /// Read a leaf atom body into memory.
    fn read_leaf(&mut self, end: Option<u64>) -> Result<Option<Vec<u8>>> {
        let Some(end) = end else {
            return Ok(None);
        };
        let len = end.saturating_sub(self.cursor.position());
        self.cursor.read_payload(len, "atom body")
    }

    /// Parse moov atom.
    fn parse_moov(&mut self, end: Option<u64>, result: &mut ParseResult) -> Result<()> {
        self.scan(end, |reader, header, end| {
            if header.atom_type == AtomType::TRAK {
                match reader.parse_trak(end)? {
                    Some(record) => {
                        trace!(track_id = record.track_id, kind = %record.kind, "Found MP4 track");
                        result.insert(record);
                    }
                    None => trace!("trak without tkhd track id"),
                }
            }
            Ok(ControlFlow::Continue(()))
        })
    }

    /// Parse trak (track) atom.
    fn parse_trak(&mut self, end: Option<u64>) -> Result<Option<TrackRecord>> {
        let mut fields = TrakFields::default();

        self.scan(end, |reader, header, end| {
            match header.atom_type {
                AtomType::TKHD => {
                    if let Some(data) = reader.read_leaf(end)? {
                        fields.track_id = atoms::parse_tkhd(&data);
                    }
                }
                AtomType::MDIA => reader.parse_mdia(end, &mut fields)?,
                AtomType::UDTA => reader.parse_udta(end, &mut fields)?,
                _ => {}
            }
            Ok(ControlFlow::Continue(()))
        })?;

        Ok(fields.into_record())
    }

    /// Parse mdia (media) atom.
    fn parse_mdia(&mut self, end: Option<u64>, fields: &mut TrakFields) -> Result<()> {
        self.scan(end, |reader, header, end| {
            match header.atom_type {
                AtomType::MDHD => {
                    if let Some(data) = reader.read_leaf(end)? {
                        fields.language = atoms::parse_mdhd_language(&data);
                    }
                }
                AtomType::HDLR => {
                    if let Some(data) = reader.read_leaf(end)? {
                        fields.kind = atoms::parse_hdlr(&data)
                            .map(TrackKind::from_handler)
                            .unwrap_or_default();
                    }
                }
                _ => {}
            }
            Ok(ControlFlow::Continue(()))
        })
    }

    /// Parse udta (user data) atom for a track name.
    fn parse_udta(&mut self, end: Option<u64>, fields: &mut TrakFields) -> Result<()> {
        self.scan(end, |reader, header, end| {
            if header.atom_type != AtomType::NAME {
                return Ok(ControlFlow::Continue(()));
            }
            if let Some(data) = reader.read_leaf(end)? {
                fields.name = atoms::parse_name(&data);
            }
            Ok(ControlFlow::Break(()))
        })
    }
}
