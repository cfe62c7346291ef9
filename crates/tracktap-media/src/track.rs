//! Track metadata records produced by the container walkers.

use std::fmt;

/// Language tag reported when a track carries none.
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// Media kind of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    #[default]
    Unknown,
}

impl TrackKind {
    /// Map a Matroska `TrackType` value.
    pub fn from_matroska(track_type: u64) -> Self {
        match track_type {
            1 => Self::Video,
            2 => Self::Audio,
            17 => Self::Subtitle,
            _ => Self::Unknown,
        }
    }

    /// Map an MP4 `hdlr` handler type.
    pub fn from_handler(handler: [u8; 4]) -> Self {
        match &handler {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            b"sbtl" | b"text" | b"clcp" => Self::Subtitle,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Subtitle => write!(f, "subtitle"),
            TrackKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identity and label metadata for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackRecord {
    /// Container track id (Matroska `TrackNumber`, MP4 `tkhd` track id).
    pub track_id: u64,
    /// Human readable track name.
    pub name: Option<String>,
    /// Language code as stored in the container.
    pub language: Option<String>,
    /// Media kind.
    pub kind: TrackKind,
}

impl TrackRecord {
    /// Create a record with no labels.
    pub fn new(track_id: u64, kind: TrackKind) -> Self {
        Self {
            track_id,
            name: None,
            language: None,
            kind,
        }
    }

    /// Language code, or `"und"` when the container has none.
    pub fn language_tag(&self) -> &str {
        self.language.as_deref().unwrap_or(UNDETERMINED_LANGUAGE)
    }
}

/// Tracks found in one stream, keyed by track id, in discovery order.
///
/// Built once by a walker and handed to the caller by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(transparent))]
pub struct ParseResult {
    tracks: Vec<TrackRecord>,
}

impl ParseResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A later record with the same id replaces the earlier
    /// one but keeps its position.
    pub(crate) fn insert(&mut self, record: TrackRecord) {
        match self
            .tracks
            .iter_mut()
            .find(|t| t.track_id == record.track_id)
        {
            Some(existing) => *existing = record,
            None => self.tracks.push(record),
        }
    }

    /// Look up a track by id.
    pub fn get(&self, track_id: u64) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterate tracks in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, TrackRecord> {
        self.tracks.iter()
    }

    /// Track ids in discovery order.
    pub fn track_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.tracks.iter().map(|t| t.track_id)
    }
}

impl IntoIterator for ParseResult {
    type Item = TrackRecord;
    type IntoIter = std::vec::IntoIter<TrackRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseResult {
    type Item = &'a TrackRecord;
    type IntoIter = std::slice::Iter<'a, TrackRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

impl FromIterator<TrackRecord> for ParseResult {
    fn from_iter<I: IntoIterator<Item = TrackRecord>>(iter: I) -> Self {
        let mut result = ParseResult::new();
        for record in iter {
            result.insert(record);
        }
        result
    }
}
