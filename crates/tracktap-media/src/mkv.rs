//! Matroska track walker.
//!
//! Walks `EBML header -> Segment -> Tracks -> TrackEntry` on a forward-only
//! stream, skipping every other element by its declared size.

use std::io::Read;

use tracing::{debug, trace};

use crate::cursor::StreamCursor;
use crate::ebml::{self, ids, ElementHeader};
use crate::track::{ParseResult, TrackKind, TrackRecord};
use crate::{Error, Result};

/// How many bytes of declared Segment child sizes to scan for `Tracks`.
///
/// Header bytes are not counted, so this is a soft bound.
pub const TRACKS_SEARCH_BUDGET: u64 = 512 * 1024;

/// Walk a Matroska stream and collect its tracks into `result`.
///
/// Records collected before an error are left in `result`.
pub fn walk<R: Read>(cursor: &mut StreamCursor<R>, result: &mut ParseResult) -> Result<()> {
    let header = ebml::read_element_header(cursor)?.ok_or(Error::UnexpectedEnd("EBML header"))?;
    if header.id != ids::EBML {
        return Err(Error::invalid_ebml(format!(
            "expected EBML header, found element {:#X}",
            header.id
        )));
    }
    cursor.skip(known_size(&header)?, "EBML header")?;

    let segment = loop {
        let Some(element) = ebml::read_element_header(cursor)? else {
            debug!("Stream ended before Segment");
            return Ok(());
        };
        if element.id == ids::SEGMENT {
            break element;
        }
        trace!(id = element.id, "Skipping top-level element");
        cursor.skip(known_size(&element)?, "top-level element")?;
    };

    let segment_end = segment.size.map(|size| cursor.position() + size);
    let Some(tracks_size) = find_tracks(cursor, segment_end)? else {
        return Ok(());
    };

    walk_tracks(cursor, tracks_size, result)
}

/// Payload size of an element that must be skippable.
fn known_size(header: &ElementHeader) -> Result<u64> {
    header.size.ok_or_else(|| {
        Error::invalid_ebml(format!("element {:#X} has unknown size", header.id))
    })
}

/// Size checked against the bytes left in the enclosing element.
fn bounded_size<R: Read>(cursor: &StreamCursor<R>, header: &ElementHeader, end: u64) -> Result<u64> {
    let size = known_size(header)?;
    let remaining = end.saturating_sub(cursor.position());
    if size > remaining {
        return Err(Error::SizeOverflow { size, remaining });
    }
    Ok(size)
}

/// Scan Segment children for `Tracks`, returning its payload size.
fn find_tracks<R: Read>(cursor: &mut StreamCursor<R>, segment_end: Option<u64>) -> Result<Option<u64>> {
    let mut scanned = 0u64;

    while scanned < TRACKS_SEARCH_BUDGET {
        if segment_end.is_some_and(|end| cursor.position() >= end) {
            debug!("Segment ended without Tracks");
            return Ok(None);
        }
        let Some(element) = ebml::read_element_header(cursor)? else {
            debug!("Stream ended before Tracks");
            return Ok(None);
        };
        let size = known_size(&element)?;
        if element.id == ids::TRACKS {
            return Ok(Some(size));
        }
        trace!(id = element.id, size, "Skipping Segment child");
        cursor.skip(size, "Segment child")?;
        scanned = scanned.saturating_add(size);
    }

    debug!(scanned, "Tracks not found within search budget");
    Ok(None)
}

/// Iterate `TrackEntry` children of `Tracks`.
///
/// A broken entry ends enumeration; earlier entries are kept.
fn walk_tracks<R: Read>(cursor: &mut StreamCursor<R>, size: u64, result: &mut ParseResult) -> Result<()> {
    let end = cursor.position() + size;

    while cursor.position() < end {
        let Some(element) = ebml::read_element_header(cursor)? else {
            break;
        };
        let size = bounded_size(cursor, &element, end)?;

        if element.id != ids::TRACK_ENTRY {
            cursor.skip(size, "Tracks child")?;
            continue;
        }

        match read_track_entry(cursor, size) {
            Ok(Some(record)) => {
                trace!(track_id = record.track_id, kind = %record.kind, "Found Matroska track");
                result.insert(record);
            }
            Ok(None) => trace!("TrackEntry without TrackNumber"),
            Err(e) => {
                debug!(error = %e, found = result.len(), "Stopping at malformed TrackEntry");
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Read one `TrackEntry`; `None` if it has no `TrackNumber`.
fn read_track_entry<R: Read>(cursor: &mut StreamCursor<R>, size: u64) -> Result<Option<TrackRecord>> {
    let end = cursor.position() + size;
    let mut track_number = None;
    let mut name = None;
    let mut language = None;
    let mut kind = TrackKind::Unknown;

    while cursor.position() < end {
        let element = ebml::read_element_header(cursor)?.ok_or(Error::UnexpectedEnd("TrackEntry"))?;
        let size = bounded_size(cursor, &element, end)?;

        match element.id {
            ids::TRACK_NUMBER => track_number = ebml::read_uint(cursor, size)?,
            ids::TRACK_UID => {
                let uid = ebml::read_uint(cursor, size)?;
                trace!(?uid, "TrackUID");
            }
            ids::NAME => name = ebml::read_string(cursor, size)?,
            ids::LANGUAGE => {
                language = ebml::read_string(cursor, size)?.filter(|l| is_plausible_language(l))
            }
            ids::TRACK_TYPE => {
                kind = ebml::read_uint(cursor, size)?
                    .map(TrackKind::from_matroska)
                    .unwrap_or_default()
            }
            _ => cursor.skip(size, "TrackEntry child")?,
        }
    }

    Ok(track_number.map(|track_id| TrackRecord {
        track_id,
        name,
        language,
        kind,
    }))
}

/// Language codes are short ASCII tags (`eng`, `pt-BR`).
fn is_plausible_language(language: &str) -> bool {
    language.len() <= 35
        && language
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use std::io::Cursor;

    /// Encode an element with a 1-byte or 8-byte size.
    fn element(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let id_bytes = id.to_be_bytes();
        let skip = id_bytes.iter().position(|&b| b != 0).unwrap_or(3);
        buf.put_slice(&id_bytes[skip..]);
        if payload.len() < 0x7F {
            buf.put_u8(0x80 | payload.len() as u8);
        } else {
            buf.put_u8(0x01);
            buf.put_slice(&(payload.len() as u64).to_be_bytes()[1..]);
        }
        buf.put_slice(payload);
        buf.to_vec()
    }

    fn track_entry(number: u8, track_type: u8, name: Option<&str>, language: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(element(ids::TRACK_NUMBER, &[number]));
        body.extend(element(ids::TRACK_UID, &[0x12, 0x34, 0x56, 0x78]));
        body.extend(element(ids::TRACK_TYPE, &[track_type]));
        if let Some(name) = name {
            body.extend(element(ids::NAME, name.as_bytes()));
        }
        if let Some(language) = language {
            body.extend(element(ids::LANGUAGE, language.as_bytes()));
        }
        element(ids::TRACK_ENTRY, &body)
    }

    fn matroska(segment_children: &[Vec<u8>]) -> Vec<u8> {
        let mut data = element(ids::EBML, &element(0x4282, b"matroska"));
        data.extend(element(ids::SEGMENT, &segment_children.concat()));
        data
    }

    fn walk_bytes(data: Vec<u8>) -> (Result<()>, ParseResult) {
        let mut cursor = StreamCursor::new(Cursor::new(data));
        let mut result = ParseResult::new();
        let outcome = walk(&mut cursor, &mut result);
        (outcome, result)
    }

    #[test]
    fn test_single_video_track() {
        let tracks = element(ids::TRACKS, &track_entry(1, 1, None, None));
        let (outcome, result) = walk_bytes(matroska(&[tracks]));

        assert!(outcome.is_ok());
        assert_eq!(result.len(), 1);
        let track = result.get(1).unwrap();
        assert_eq!(track.kind, TrackKind::Video);
        assert_eq!(track.name, None);
        assert_eq!(track.language_tag(), "und");
    }

    #[test]
    fn test_track_types_and_labels() {
        let entries = [
            track_entry(1, 1, Some("Main"), Some("eng")),
            track_entry(2, 2, Some("Commentary"), Some("ger")),
            track_entry(3, 17, Some("Forced"), Some("fre")),
            track_entry(4, 18, None, None),
        ]
        .concat();
        let (outcome, result) = walk_bytes(matroska(&[element(ids::TRACKS, &entries)]));

        assert!(outcome.is_ok());
        assert_eq!(result.track_ids().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(result.get(1).unwrap().kind, TrackKind::Video);
        assert_eq!(result.get(2).unwrap().kind, TrackKind::Audio);
        assert_eq!(result.get(2).unwrap().name.as_deref(), Some("Commentary"));
        assert_eq!(result.get(2).unwrap().language.as_deref(), Some("ger"));
        assert_eq!(result.get(3).unwrap().kind, TrackKind::Subtitle);
        assert_eq!(result.get(4).unwrap().kind, TrackKind::Unknown);
    }

    #[test]
    fn test_skips_elements_before_tracks() {
        let seek_head = element(0x114D_9B74, &[0u8; 40]);
        let info = element(0x1549_A966, &[0u8; 300]);
        let tracks = element(ids::TRACKS, &track_entry(7, 2, None, None));
        let (_, result) = walk_bytes(matroska(&[seek_head, info, tracks]));

        assert_eq!(result.get(7).unwrap().kind, TrackKind::Audio);
    }

    #[test]
    fn test_garbled_language_fails_soft() {
        let mut body = Vec::new();
        body.extend(element(ids::TRACK_NUMBER, &[1]));
        body.extend(element(ids::LANGUAGE, &[0xC3, 0x28]));
        body.extend(element(ids::NAME, &[0xFF]));
        let tracks = element(ids::TRACKS, &element(ids::TRACK_ENTRY, &body));
        let (_, result) = walk_bytes(matroska(&[tracks]));

        let track = result.get(1).unwrap();
        assert_eq!(track.language, None);
        assert_eq!(track.name, None);
    }

    #[test]
    fn test_malformed_entry_keeps_earlier_tracks() {
        let good = track_entry(1, 1, None, None);
        // Child claims 0x10 bytes inside a 3-byte entry.
        let bad = element(ids::TRACK_ENTRY, &[0xD7, 0x90, 0x01]);
        let later = track_entry(3, 2, None, None);
        let tracks = element(ids::TRACKS, &[good, bad, later].concat());
        let (outcome, result) = walk_bytes(matroska(&[tracks]));

        assert!(outcome.is_ok());
        assert_eq!(result.len(), 1);
        assert!(result.get(1).is_some());
        assert!(result.get(3).is_none());
    }

    #[test]
    fn test_truncated_stream_keeps_collected_tracks() {
        let entries = [track_entry(1, 1, None, None), track_entry(2, 2, None, None)].concat();
        let mut data = matroska(&[element(ids::TRACKS, &entries)]);
        data.truncate(data.len() - 4);
        let (_, result) = walk_bytes(data);

        assert_eq!(result.len(), 1);
        assert_eq!(result.get(1).unwrap().kind, TrackKind::Video);
    }

    #[test]
    fn test_tracks_beyond_search_budget_not_found() {
        let filler = element(0xEC, &vec![0u8; (TRACKS_SEARCH_BUDGET + 16) as usize]);
        let tracks = element(ids::TRACKS, &track_entry(1, 1, None, None));
        let (outcome, result) = walk_bytes(matroska(&[filler, tracks]));

        assert!(outcome.is_ok());
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_size_segment() {
        let mut data = element(ids::EBML, &[]);
        data.extend([0x18, 0x53, 0x80, 0x67, 0xFF]);
        data.extend(element(ids::TRACKS, &track_entry(5, 17, Some("Signs"), None)));
        let (_, result) = walk_bytes(data);

        assert_eq!(result.get(5).unwrap().name.as_deref(), Some("Signs"));
    }

    #[test]
    fn test_missing_ebml_header_is_error() {
        let (outcome, result) = walk_bytes(element(ids::SEGMENT, &[]));
        assert!(matches!(outcome, Err(Error::InvalidEbml(_))));
        assert!(result.is_empty());
    }

    #[test]
    fn test_entry_without_number_is_ignored() {
        let entry = element(ids::TRACK_ENTRY, &element(ids::TRACK_TYPE, &[1]));
        let tracks = element(ids::TRACKS, &[entry, track_entry(2, 2, None, None)].concat());
        let (_, result) = walk_bytes(matroska(&[tracks]));

        assert_eq!(result.track_ids().collect::<Vec<_>>(), vec![2]);
    }
}
