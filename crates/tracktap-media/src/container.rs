//! Container format detection and walker dispatch.

use std::io::{self, Cursor, Read};

use tracing::debug;

use crate::cursor::StreamCursor;
use crate::ebml::EBML_MAGIC;
use crate::track::ParseResult;
use crate::{mkv, mp4};

/// Number of leading bytes inspected to detect the container.
pub const SNIFF_LEN: usize = 8;

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Matroska (.mkv, .webm)
    Matroska,
    /// MPEG-4 Part 14 (.mp4, .m4v, .mov)
    Mp4,
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Matroska => write!(f, "Matroska"),
            Container::Mp4 => write!(f, "MP4"),
        }
    }
}

/// Detect container format from the first bytes of a stream.
pub fn detect_container(prefix: &[u8]) -> Option<Container> {
    // EBML starts with 0x1A 0x45 0xDF 0xA3
    if prefix.len() >= 4 && prefix[..4] == EBML_MAGIC {
        return Some(Container::Matroska);
    }

    // ftyp box type at offset 4
    if prefix.len() >= 8 && &prefix[4..8] == b"ftyp" {
        return Some(Container::Mp4);
    }

    None
}

/// Reader that replays a sniffed prefix before the rest of the stream.
pub type Rewound<R> = io::Chain<Cursor<Vec<u8>>, R>;

/// Peek up to [`SNIFF_LEN`] bytes and detect the container.
///
/// The returned reader yields the peeked bytes again, followed by the rest of
/// `reader`, so the walker sees the stream from its first byte.
pub fn sniff<R: Read>(mut reader: R) -> io::Result<(Option<Container>, Rewound<R>)> {
    let mut prefix = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let prefix = prefix[..filled].to_vec();
    let container = detect_container(&prefix);
    Ok((container, Cursor::new(prefix).chain(reader)))
}

/// Detect the container and extract its tracks.
///
/// Never fails: an unrecognized stream yields an empty result and any error
/// during sniffing or walking yields whatever tracks were found before it.
pub fn extract_tracks<R: Read>(reader: R) -> ParseResult {
    let (container, rewound) = match sniff(reader) {
        Ok(sniffed) => sniffed,
        Err(e) => {
            debug!(error = %e, "Failed to sniff container");
            return ParseResult::new();
        }
    };

    let Some(container) = container else {
        debug!("Unrecognized container");
        return ParseResult::new();
    };

    // The walkers read headers a few bytes at a time
    let mut cursor = StreamCursor::new(io::BufReader::new(rewound));
    let mut result = ParseResult::new();
    let outcome = match container {
        Container::Matroska => mkv::walk(&mut cursor, &mut result),
        Container::Mp4 => mp4::walk(&mut cursor, &mut result),
    };

    match outcome {
        Ok(()) => debug!(
            %container,
            tracks = result.len(),
            bytes = cursor.position(),
            "Track extraction finished"
        ),
        Err(e) => debug!(
            %container,
            error = %e,
            tracks = result.len(),
            bytes = cursor.position(),
            "Track extraction stopped early"
        ),
    }

    result
}
