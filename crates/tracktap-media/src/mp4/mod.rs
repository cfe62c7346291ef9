//! MP4 (ISO-BMFF) container walking.
//!
//! Only the track identity path is followed:
//! `moov -> trak -> {tkhd, mdia -> {mdhd, hdlr}, udta -> name}`.
//! Everything else, including any `mdat` ahead of `moov`, is skipped.

mod atoms;
mod reader;

pub use atoms::{
    decode_language, encode_language, parse_hdlr, parse_mdhd_language, parse_name, parse_tkhd,
    AtomHeader, AtomType,
};
pub use reader::Mp4Reader;

use std::io::Read;

use crate::cursor::StreamCursor;
use crate::track::ParseResult;
use crate::Result;

/// Walk an MP4 stream and collect its tracks into `result`.
///
/// Records collected before an error are left in `result`.
pub fn walk<R: Read>(cursor: &mut StreamCursor<R>, result: &mut ParseResult) -> Result<()> {
    Mp4Reader::new(cursor).parse(result)
}
