//! EBML variable-length integer and element header decoding.
//!
//! An EBML stream is a tree of elements, each introduced by a variable-length
//! ID and a variable-length payload size. The position of the first set bit
//! in the leading byte gives the encoded length (1-8 bytes).

use std::io::Read;

use crate::cursor::StreamCursor;
use crate::{Error, Result};

/// Element IDs, written with their length marker bits as in the Matroska
/// schema.
pub mod ids {
    pub const EBML: u32 = 0x1A45_DFA3;
    pub const SEGMENT: u32 = 0x1853_8067;
    pub const TRACKS: u32 = 0x1654_AE6B;
    pub const TRACK_ENTRY: u32 = 0xAE;
    pub const TRACK_NUMBER: u32 = 0xD7;
    pub const TRACK_UID: u32 = 0x73C5;
    pub const NAME: u32 = 0x536E;
    pub const LANGUAGE: u32 = 0x22_B59C;
    pub const TRACK_TYPE: u32 = 0x83;
}

/// The 4-byte EBML header signature that starts every Matroska/WebM file.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Longest element ID this decoder accepts.
const MAX_ID_LENGTH: u32 = 4;

/// Decoded element header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    /// Element ID including marker bits.
    pub id: u32,
    /// Payload size, `None` when the size is the reserved "unknown" value.
    pub size: Option<u64>,
    /// Encoded length of ID plus size.
    pub header_len: u64,
}

/// Length in bytes of a vint whose first byte is `first`, or `None` for the
/// invalid all-zero marker.
fn vint_length(first: u8) -> Option<u32> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() + 1)
    }
}

/// Read a vint, returning `(value, length)`.
///
/// With `keep_marker` the length marker bit stays in the value (element IDs);
/// otherwise it is masked off (sizes and plain integers).
fn read_vint<R: Read>(
    cursor: &mut StreamCursor<R>,
    first: u8,
    keep_marker: bool,
    max_len: u32,
) -> Result<(u64, u32)> {
    let len = vint_length(first)
        .ok_or_else(|| Error::invalid_ebml("vint with no length marker"))?;
    if len > max_len {
        return Err(Error::invalid_ebml(format!(
            "vint length {} exceeds {}",
            len, max_len
        )));
    }

    let mut value = if keep_marker {
        first as u64
    } else {
        (first as u64) & (0xFF >> len)
    };
    for _ in 1..len {
        let byte = cursor.read_u8("EBML vint")?;
        value = (value << 8) | byte as u64;
    }
    Ok((value, len))
}

/// Decode a size vint, mapping the all-ones value to `None` (unknown size).
fn read_size<R: Read>(cursor: &mut StreamCursor<R>) -> Result<(Option<u64>, u32)> {
    let first = cursor.read_u8("EBML element size")?;
    let (value, len) = read_vint(cursor, first, false, 8)?;
    let all_ones = (1u64 << (7 * len)) - 1;
    if value == all_ones {
        Ok((None, len))
    } else {
        Ok((Some(value), len))
    }
}

/// Read the next element header.
///
/// Returns `None` when the stream ends cleanly before the first ID byte.
pub fn read_element_header<R: Read>(cursor: &mut StreamCursor<R>) -> Result<Option<ElementHeader>> {
    let Some(first) = cursor.read_u8_or_eof()? else {
        return Ok(None);
    };
    let (id, id_len) = read_vint(cursor, first, true, MAX_ID_LENGTH)?;
    let (size, size_len) = read_size(cursor)?;

    Ok(Some(ElementHeader {
        id: id as u32,
        size,
        header_len: (id_len + size_len) as u64,
    }))
}

/// Read an unsigned integer payload of `size` bytes, big-endian.
///
/// Payloads wider than 8 bytes are skipped and yield `None`.
pub fn read_uint<R: Read>(cursor: &mut StreamCursor<R>, size: u64) -> Result<Option<u64>> {
    if size > 8 {
        cursor.skip(size, "EBML integer")?;
        return Ok(None);
    }
    let mut value = 0u64;
    for _ in 0..size {
        value = (value << 8) | cursor.read_u8("EBML integer")? as u64;
    }
    Ok(Some(value))
}

/// Read a string payload of `size` bytes.
///
/// Trailing NUL padding is trimmed. Invalid UTF-8, empty strings and
/// oversized payloads yield `None`.
pub fn read_string<R: Read>(cursor: &mut StreamCursor<R>, size: u64) -> Result<Option<String>> {
    let Some(data) = cursor.read_payload(size, "EBML string")? else {
        return Ok(None);
    };
    Ok(decode_text(&data))
}

/// Decode UTF-8 text with trailing NULs removed; `None` if empty or invalid.
pub(crate) fn decode_text(data: &[u8]) -> Option<String> {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text = std::str::from_utf8(&data[..end]).ok()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
