//! MP4 atom headers and leaf atom payloads.

use bytes::Buf;

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const MOOV: Self = Self(*b"moov");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const UDTA: Self = Self(*b"udta");
    pub const NAME: Self = Self(*b"name");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed atom header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomHeader {
    /// Atom type code.
    pub atom_type: AtomType,
    /// Body size, `None` when the atom extends to the end of its parent
    /// (declared size 0).
    pub body_size: Option<u64>,
}

/// Track id from a `tkhd` payload.
pub fn parse_tkhd(mut data: &[u8]) -> Option<u32> {
    if data.remaining() < 4 {
        return None;
    }
    let version = data.get_u8();
    data.advance(3);

    // creation + modification time
    let timestamps = if version == 1 { 16 } else { 8 };
    if data.remaining() < timestamps + 4 {
        return None;
    }
    data.advance(timestamps);
    Some(data.get_u32())
}

/// Language code from an `mdhd` payload.
pub fn parse_mdhd_language(mut data: &[u8]) -> Option<String> {
    if data.remaining() < 4 {
        return None;
    }
    let version = data.get_u8();
    data.advance(3);

    // creation, modification, timescale, duration
    let fields = if version == 1 { 8 + 8 + 4 + 8 } else { 4 + 4 + 4 + 4 };
    if data.remaining() < fields + 2 {
        return None;
    }
    data.advance(fields);
    decode_language(data.get_u16())
}

/// Handler type from an `hdlr` payload.
pub fn parse_hdlr(mut data: &[u8]) -> Option<[u8; 4]> {
    // version/flags + pre_defined
    if data.remaining() < 12 {
        return None;
    }
    data.advance(8);
    let mut handler = [0u8; 4];
    data.copy_to_slice(&mut handler);
    Some(handler)
}

/// Decode a packed ISO-639-2/T language code: three 5-bit letters, each
/// stored as `letter - 0x60`.
pub fn decode_language(code: u16) -> Option<String> {
    let letters = [(code >> 10) & 0x1F, (code >> 5) & 0x1F, code & 0x1F]
        .map(|c| (c as u8).wrapping_add(0x60));
    if letters.iter().all(u8::is_ascii_lowercase) {
        Some(letters.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Pack a three-letter lowercase language code.
pub fn encode_language(language: &str) -> Option<u16> {
    let bytes = language.as_bytes();
    if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_lowercase) {
        return None;
    }
    Some(
        bytes
            .iter()
            .fold(0u16, |code, &b| (code << 5) | (b - 0x60) as u16),
    )
}

/// Track name from a `udta/name` payload.
///
/// Writers disagree on framing: some prepend full-box version/flags, some a
/// packed language code, some both, some neither. Both prefixes are
/// detected heuristically and skipped; the rest is UTF-8 text. When the
/// text after a presumed language prefix is not valid UTF-8, the two bytes
/// were the start of the name and are kept.
pub fn parse_name(data: &[u8]) -> Option<String> {
    let mut text = data;
    if has_full_box_prefix(text) {
        text = &text[4..];
    }
    if has_language_prefix(text) {
        if let Some(name) = crate::ebml::decode_text(&text[2..]) {
            return Some(name);
        }
    }
    crate::ebml::decode_text(text)
}

/// Version 0 with flags that are not printable text.
fn has_full_box_prefix(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0 && data[1..4].iter().all(|&b| b < 0x20)
}

/// A packed language whose bytes are not both printable ASCII.
fn has_language_prefix(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let printable = |b: u8| (0x20..0x7F).contains(&b);
    let code = u16::from_be_bytes([data[0], data[1]]);
    code & 0x8000 == 0
        && decode_language(code).is_some()
        && !(printable(data[0]) && printable(data[1]))
}
